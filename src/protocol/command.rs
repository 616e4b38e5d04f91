use std::fmt::Display;
use std::str::FromStr;

use anyhow::{bail, Result};
use bytes::Bytes;

use crate::protocol::resp::RESP;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PING,
    ECHO,
    // storage commands
    SET,
    GET,
    DEL,
    INCR,
    TYPE,
    KEYS,
    // list commands
    RPUSH,
    LPUSH,
    LPOP,
    BLPOP,
    LRANGE,
    LLEN,
    // stream commands
    XADD,
    XRANGE,
    XREAD,
    // transactions
    MULTI,
    EXEC,
    DISCARD,
    // replication and admin commands
    INFO,
    REPLCONF,
    REPLICAOF,
    PSYNC,
    CONFIG,
    SAVE,
}

impl Command {
    /// Commands fanned out to replicas after local execution. This is the
    /// propagation set, not the full set of mutating commands: INCR mutates
    /// but is not replicated, and BLPOP is rewritten to LPOP on the way out
    /// (see `replication::propagation_for`).
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::SET
                | Command::DEL
                | Command::RPUSH
                | Command::LPUSH
                | Command::LPOP
                | Command::BLPOP
                | Command::XADD
        )
    }

    /// Splits a decoded request array into its command token (as sent, for
    /// error reporting) and its arguments as opaque bytes.
    pub fn split_request(message: &RESP) -> Result<(String, Vec<Bytes>)> {
        let items = match message {
            RESP::Array(items) if !items.is_empty() => items,
            _ => bail!("not a command array: {}", message),
        };
        let name = match &items[0] {
            RESP::Bulk(token) => String::from_utf8_lossy(token).to_string(),
            other => bail!("command token must be a bulk string: {}", other),
        };
        let mut params = Vec::with_capacity(items.len() - 1);
        for item in &items[1..] {
            match item {
                RESP::Bulk(arg) => params.push(arg.clone()),
                other => bail!("command arguments must be bulk strings: {}", other),
            }
        }
        Ok((name, params))
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Command, Self::Err> {
        match input.to_ascii_uppercase().as_str() {
            "PING" => Ok(Command::PING),
            "ECHO" => Ok(Command::ECHO),
            "SET" => Ok(Command::SET),
            "GET" => Ok(Command::GET),
            "DEL" => Ok(Command::DEL),
            "INCR" => Ok(Command::INCR),
            "TYPE" => Ok(Command::TYPE),
            "KEYS" => Ok(Command::KEYS),
            "RPUSH" => Ok(Command::RPUSH),
            "LPUSH" => Ok(Command::LPUSH),
            "LPOP" => Ok(Command::LPOP),
            "BLPOP" => Ok(Command::BLPOP),
            "LRANGE" => Ok(Command::LRANGE),
            "LLEN" => Ok(Command::LLEN),
            "XADD" => Ok(Command::XADD),
            "XRANGE" => Ok(Command::XRANGE),
            "XREAD" => Ok(Command::XREAD),
            "MULTI" => Ok(Command::MULTI),
            "EXEC" => Ok(Command::EXEC),
            "DISCARD" => Ok(Command::DISCARD),
            "INFO" => Ok(Command::INFO),
            "REPLCONF" => Ok(Command::REPLCONF),
            "REPLICAOF" => Ok(Command::REPLICAOF),
            "PSYNC" => Ok(Command::PSYNC),
            "CONFIG" => Ok(Command::CONFIG),
            "SAVE" => Ok(Command::SAVE),
            _ => bail!("unknown command: {}", input),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::PING => "PING",
            Command::ECHO => "ECHO",
            Command::SET => "SET",
            Command::GET => "GET",
            Command::DEL => "DEL",
            Command::INCR => "INCR",
            Command::TYPE => "TYPE",
            Command::KEYS => "KEYS",
            Command::RPUSH => "RPUSH",
            Command::LPUSH => "LPUSH",
            Command::LPOP => "LPOP",
            Command::BLPOP => "BLPOP",
            Command::LRANGE => "LRANGE",
            Command::LLEN => "LLEN",
            Command::XADD => "XADD",
            Command::XRANGE => "XRANGE",
            Command::XREAD => "XREAD",
            Command::MULTI => "MULTI",
            Command::EXEC => "EXEC",
            Command::DISCARD => "DISCARD",
            Command::INFO => "INFO",
            Command::REPLCONF => "REPLCONF",
            Command::REPLICAOF => "REPLICAOF",
            Command::PSYNC => "PSYNC",
            Command::CONFIG => "CONFIG",
            Command::SAVE => "SAVE",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_token_is_case_insensitive() {
        assert_eq!("blpop".parse::<Command>().unwrap(), Command::BLPOP);
        assert_eq!("XAdd".parse::<Command>().unwrap(), Command::XADD);
        assert!("FLUSHALL".parse::<Command>().is_err());
    }

    #[test]
    fn splits_token_and_opaque_args() {
        let message = RESP::command(&["set", "k", "v"]);
        let (name, params) = Command::split_request(&message).unwrap();
        assert_eq!(name, "set");
        assert_eq!(params, vec![Bytes::from_static(b"k"), Bytes::from_static(b"v")]);
    }

    #[test]
    fn rejects_non_array_requests() {
        assert!(Command::split_request(&RESP::Int(1)).is_err());
        assert!(Command::split_request(&RESP::Array(vec![RESP::Int(1)])).is_err());
    }

    #[test]
    fn propagation_set_matches_the_write_commands() {
        for write in [
            Command::SET,
            Command::DEL,
            Command::RPUSH,
            Command::LPUSH,
            Command::LPOP,
            Command::BLPOP,
            Command::XADD,
        ] {
            assert!(write.is_write());
        }
        assert!(!Command::INCR.is_write());
        assert!(!Command::GET.is_write());
        assert!(!Command::MULTI.is_write());
    }
}
