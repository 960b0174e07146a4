// `host:port` parsing and resolution.
//
// The split happens on the *last* colon, so hostnames and IPv4 literals are
// unambiguous. A bare bracketless IPv6 literal works only if the resolver
// accepts the host part as written.

use std::net::{SocketAddr, ToSocketAddrs};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("port not specified in {0:?}")]
    MissingPort(String),

    #[error("invalid port number: {0:?}")]
    InvalidPort(String),

    #[error("unable to resolve address: {0}")]
    Unresolvable(String),
}

/// Split `host:port` on the last colon.
pub fn split_host_port(spec: &str) -> Result<(&str, u16), AddrError> {
    let (host, port) = spec
        .rsplit_once(':')
        .ok_or_else(|| AddrError::MissingPort(spec.to_string()))?;
    let port = port
        .parse()
        .map_err(|_| AddrError::InvalidPort(port.to_string()))?;
    Ok((host, port))
}

/// Resolve `host:port` to the first address the system resolver returns.
pub fn resolve(spec: &str) -> Result<SocketAddr, AddrError> {
    let (host, port) = split_host_port(spec)?;
    (host, port)
        .to_socket_addrs()
        .map_err(|_| AddrError::Unresolvable(spec.to_string()))?
        .next()
        .ok_or_else(|| AddrError::Unresolvable(spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_ipv4_literal() {
        assert_eq!(split_host_port("10.0.0.1:8080"), Ok(("10.0.0.1", 8080)));
    }

    #[test]
    fn splits_hostname() {
        assert_eq!(split_host_port("example.com:80"), Ok(("example.com", 80)));
    }

    #[test]
    fn splits_on_the_last_colon() {
        assert_eq!(split_host_port("::1:9000"), Ok(("::1", 9000)));
    }

    #[test]
    fn missing_port_is_an_error() {
        assert!(matches!(
            split_host_port("example.com"),
            Err(AddrError::MissingPort(_))
        ));
    }

    #[test]
    fn non_numeric_port_is_an_error() {
        assert!(matches!(
            split_host_port("example.com:http"),
            Err(AddrError::InvalidPort(_))
        ));
    }

    #[test]
    fn overflowing_port_is_an_error() {
        assert!(matches!(
            split_host_port("example.com:70000"),
            Err(AddrError::InvalidPort(_))
        ));
    }

    #[test]
    fn resolves_loopback() {
        let addr = resolve("127.0.0.1:4242").unwrap();
        assert_eq!(addr.port(), 4242);
        assert!(addr.ip().is_loopback());
    }
}
