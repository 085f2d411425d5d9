//! Command-line DNS lookup over UDP, TCP, or DNS-over-HTTPS.
//!
//! ```text
//! nslookup [--tcp | --https] <server> <name> [type]
//! ```
//!
//! The server is an IP or socket address (port 53 assumed), or a URL when
//! `--https` is given. The record type defaults to `ALL`.

use std::{
    io,
    net::{IpAddr, SocketAddr},
    process::ExitCode,
};

use wiredns::{
    client::{DohMethod, HttpsClient, TcpClient, UdpClient},
    packet::{
        message::{Message, Query},
        RCode, Type,
    },
    DNS_PORT,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Transport {
    Udp,
    Tcp,
    Https,
}

const USAGE: &str = "usage: nslookup [--tcp | --https] <server> <name> [type]";

fn main() -> ExitCode {
    env_logger::init();

    let mut transport = Transport::Udp;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--tcp" => transport = Transport::Tcp,
            "--https" => transport = Transport::Https,
            "--help" | "-h" => {
                println!("{}", USAGE);
                return ExitCode::SUCCESS;
            }
            _ => positional.push(arg),
        }
    }

    let (server, name, rtype) = match positional.as_slice() {
        [server, name] => (server.clone(), name.clone(), Type::ALL),
        [server, name, ty] => match ty.parse::<Type>() {
            Ok(rtype) => (server.clone(), name.clone(), rtype),
            Err(_) => {
                eprintln!("unknown record type: {}", ty);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let query = Message::query(std::process::id() as u16, Query::new(name, rtype));
    let result = match transport {
        Transport::Udp => {
            server_addr(&server).and_then(|addr| UdpClient::new(addr)?.query(&query))
        }
        Transport::Tcp => server_addr(&server).and_then(|addr| TcpClient::new(addr).query(&query)),
        Transport::Https => HttpsClient::new(server).query(&query, DohMethod::Post),
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            eprintln!("query failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if response.rcode != RCode::NO_ERROR {
        eprintln!("server returned {}", response.rcode);
    }

    let mut count = 0;
    for record in response.records() {
        println!("{}", record);
        count += 1;
    }
    if count == 0 {
        println!("no records returned");
    }
    ExitCode::SUCCESS
}

fn server_addr(s: &str) -> io::Result<SocketAddr> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}
