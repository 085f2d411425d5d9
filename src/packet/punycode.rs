//! RFC 3492 PunyCode transcoding for internationalized domain labels.
//!
//! This is the Bootstring transform with the PunyCode parameter set: base
//! 36, tmin 1, tmax 26, skew 38, damp 700, initial bias 72, initial code
//! point 0x80, delimiter `-`. Digits are always emitted lowercase; the
//! decoder accepts both cases.
//!
//! The message codec applies this transform to individual labels carrying
//! the `xn--` prefix. Pure-ASCII labels are written verbatim and never pass
//! through here.

use super::Error;

const BASE: u32 = 36;
const TMIN: u32 = 1;
const TMAX: u32 = 26;
const SKEW: u32 = 38;
const DAMP: u32 = 700;
const INITIAL_BIAS: u32 = 72;
const INITIAL_N: u32 = 0x80;
const DELIMITER: u8 = b'-';

/// The standard bias adaptation function (RFC 3492 §6.1).
fn adapt_bias(delta: u32, num_points: u32, first_time: bool) -> u32 {
    // Intermediate values can exceed u32 for adversarial deltas.
    let mut delta = u64::from(delta) / if first_time { u64::from(DAMP) } else { 2 };
    delta += delta / u64::from(num_points);

    let mut k = 0;
    while delta > u64::from((BASE - TMIN) * TMAX / 2) {
        delta /= u64::from(BASE - TMIN);
        k += BASE;
    }
    k + (u64::from(BASE - TMIN + 1) * delta / (delta + u64::from(SKEW))) as u32
}

/// `clamp(k - bias, TMIN, TMAX)` without unsigned underflow.
fn threshold(k: u32, bias: u32) -> u32 {
    if k <= bias + TMIN {
        TMIN
    } else if k >= bias + TMAX {
        TMAX
    } else {
        k - bias
    }
}

fn digit_char(digit: u32) -> char {
    debug_assert!(digit < BASE);
    if digit < 26 {
        (b'a' + digit as u8) as char
    } else {
        (b'0' + (digit - 26) as u8) as char
    }
}

fn digit_value(c: u8) -> Option<u32> {
    match c {
        b'a'..=b'z' => Some(u32::from(c - b'a')),
        b'A'..=b'Z' => Some(u32::from(c - b'A')),
        b'0'..=b'9' => Some(u32::from(c - b'0') + 26),
        _ => None,
    }
}

/// Encodes a Unicode label into its PunyCode ASCII form.
///
/// Basic (ASCII) code points are copied to the output in their original
/// order; the delimiter separating them from the encoded extension is only
/// written when both parts are non-empty, so pure-ASCII input is returned
/// unchanged.
pub fn encode(input: &str) -> Result<String, Error> {
    let mut out = String::new();

    let mut handled: u32 = 0;
    let mut total: u32 = 0;
    for c in input.chars() {
        total += 1;
        if c.is_ascii() {
            out.push(c);
            handled += 1;
        }
    }

    if handled > 0 && handled < total {
        out.push(DELIMITER as char);
    }

    let mut n = INITIAL_N;
    let mut delta: u32 = 0;
    let mut bias = INITIAL_BIAS;
    let mut first_time = true;

    while handled < total {
        // The smallest code point that has not been handled yet.
        let Some(m) = input
            .chars()
            .map(|c| c as u32)
            .filter(|&c| c >= n)
            .min()
        else {
            // Unreachable while `handled < total`: every unhandled code
            // point is at least `n`.
            break;
        };

        delta = (m - n)
            .checked_mul(handled + 1)
            .and_then(|d| delta.checked_add(d))
            .ok_or(Error::Overflow)?;
        n = m;

        for c in input.chars() {
            let c = c as u32;
            if c < n {
                delta = delta.checked_add(1).ok_or(Error::Overflow)?;
            }
            if c == n {
                let mut q = delta;
                let mut k = BASE;
                loop {
                    let t = threshold(k, bias);
                    if q < t {
                        break;
                    }
                    out.push(digit_char(t + (q - t) % (BASE - t)));
                    q = (q - t) / (BASE - t);
                    k += BASE;
                }
                out.push(digit_char(q));

                bias = adapt_bias(delta, handled + 1, first_time);
                first_time = false;
                delta = 0;
                handled += 1;
            }
        }

        delta = delta.checked_add(1).ok_or(Error::Overflow)?;
        n += 1;
    }

    Ok(out)
}

/// Decodes a PunyCode ASCII label back into Unicode.
///
/// The part before the last delimiter is copied verbatim; the rest is a
/// sequence of variable-length deltas, each of which yields one code point
/// *inserted* at a computed position (PunyCode output order is
/// position-dependent, not append-only).
pub fn decode(ascii: &[u8]) -> Result<String, Error> {
    let mut out: Vec<char> = Vec::new();

    let mut rest = match ascii.iter().rposition(|&b| b == DELIMITER) {
        Some(idx) => {
            for &b in &ascii[..idx] {
                if !b.is_ascii() {
                    return Err(Error::InvalidInput);
                }
                out.push(b as char);
            }
            &ascii[idx + 1..]
        }
        None => ascii,
    };

    let mut n = INITIAL_N;
    let mut i: u32 = 0;
    let mut bias = INITIAL_BIAS;

    while !rest.is_empty() {
        let old_i = i;
        let mut w: u32 = 1;
        let mut k = BASE;
        loop {
            let Some((&c, tail)) = rest.split_first() else {
                return Err(Error::Incomplete);
            };
            rest = tail;

            let digit = digit_value(c).ok_or(Error::InvalidInput)?;
            i = digit
                .checked_mul(w)
                .and_then(|d| i.checked_add(d))
                .ok_or(Error::Overflow)?;

            let t = threshold(k, bias);
            if digit < t {
                break;
            }
            w = w.checked_mul(BASE - t).ok_or(Error::Overflow)?;
            k += BASE;
        }

        let len = out.len() as u32 + 1;
        bias = adapt_bias(i - old_i, len, old_i == 0);
        n = n.checked_add(i / len).ok_or(Error::Overflow)?;
        i %= len;

        let c = char::from_u32(n).ok_or(Error::InvalidInput)?;
        if c.is_ascii() {
            // The extension must never encode a basic code point.
            return Err(Error::InvalidInput);
        }
        out.insert(i as usize, c);
        i += 1;
    }

    Ok(out.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sample strings from RFC 3492 §7.1.
    const ARABIC: &str = "ليهمابتكلموشعربي؟";
    const CHINESE_SIMPLIFIED: &str = "他们为什么不说中文";
    const CHINESE_TRADITIONAL: &str = "他們爲什麽不說中文";
    const CZECH: &str = "Pro\u{10D}prost\u{11B}nemluv\u{ED}\u{10D}esky";

    #[test]
    fn encode_ascii_passthrough() {
        assert_eq!(encode("").unwrap(), "");
        assert_eq!(encode("abc").unwrap(), "abc");
        assert_eq!(encode("0123456789").unwrap(), "0123456789");
    }

    #[test]
    fn encode_sample_strings() {
        assert_eq!(encode(ARABIC).unwrap(), "egbpdaj6bu4bxfgehfvwxn");
        assert_eq!(encode(CHINESE_SIMPLIFIED).unwrap(), "ihqwcrb4cv8a8dqg056pqjye");
        assert_eq!(
            encode(CHINESE_TRADITIONAL).unwrap(),
            "ihqwctvzc91f659drss3x8bo0yb"
        );
        assert_eq!(encode(CZECH).unwrap(), "Proprostnemluvesky-uyb24dma41a");
    }

    #[test]
    fn decode_inverts_encoding() {
        assert_eq!(decode(b"").unwrap(), "");
        for s in [ARABIC, CHINESE_SIMPLIFIED, CHINESE_TRADITIONAL, CZECH] {
            assert_eq!(decode(encode(s).unwrap().as_bytes()).unwrap(), s);
        }
    }

    #[test]
    fn decode_accepts_uppercase_digits() {
        assert_eq!(decode(b"EGBPDAJ6BU4BXFGEHFVWXN").unwrap(), ARABIC);
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert_eq!(decode(b"!!!"), Err(Error::InvalidInput));
        assert_eq!(decode(b"abc-?"), Err(Error::InvalidInput));
        // 'z' = 35 is never below the first threshold, so the delta never
        // terminates.
        assert_eq!(decode(b"z"), Err(Error::Incomplete));
        assert_eq!(decode(b"9999999999"), Err(Error::Overflow));
    }
}
