use std::fmt::Display;
use std::str::FromStr;

use anyhow::format_err;

pub const DEFAULT_PORT: Port = 6379;

pub type Port = u16;
pub type Hostname = String;

/// A host/port pair, printable as `host:port` for `TcpStream::connect`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding(pub Hostname, pub Port);

impl Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

impl FromStr for Binding {
    type Err = anyhow::Error;

    /// Parses the `--replicaof "HOST PORT"` form; a bare host defaults the port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut seq = s.split(' ');
        let host = seq
            .next()
            .filter(|h| !h.is_empty())
            .ok_or(format_err!("invalid binding: {}", s))?;
        let port = match seq.next() {
            Some(port) => port.parse::<Port>()?,
            None => DEFAULT_PORT,
        };
        Ok(Binding(host.to_string(), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let binding = "localhost 6380".parse::<Binding>().unwrap();
        assert_eq!(binding, Binding("localhost".to_string(), 6380));
        assert_eq!(binding.to_string(), "localhost:6380");
    }

    #[test]
    fn bare_host_gets_default_port() {
        let binding = "127.0.0.1".parse::<Binding>().unwrap();
        assert_eq!(binding.1, DEFAULT_PORT);
    }

    #[test]
    fn rejects_bad_port() {
        assert!("localhost abc".parse::<Binding>().is_err());
    }
}
