use std::net::TcpStream;

use anyhow::{bail, Result};

use crate::io::net::Binding;
use crate::protocol::resp::{RespConnection, RESP};

/// The replica's connection to its master: handshake steps plus the
/// replication stream reader.
pub struct MasterLink {
    connection: RespConnection,
}

impl MasterLink {
    pub fn connect(master: &Binding) -> Result<Self> {
        let stream = TcpStream::connect(master.to_string())?;
        println!("connected to master {}", master);
        Ok(Self { connection: RespConnection::new(stream)? })
    }

    /// Step one of the handshake. Any single-line reply is accepted.
    pub fn ping(&mut self) -> Result<()> {
        self.connection.send_message(&RESP::command(&["PING"]))?;
        match self.connection.read_message()? {
            Some(RESP::String(_)) => Ok(()),
            other => bail!("master did not answer PING: {:?}", other),
        }
    }

    pub fn replconf(&mut self, args: &[&str]) -> Result<()> {
        let mut tokens = vec!["REPLCONF"];
        tokens.extend_from_slice(args);
        self.connection.send_message(&RESP::command(&tokens))?;
        match self.connection.read_message()? {
            Some(RESP::String(reply)) if reply.eq_ignore_ascii_case("OK") => Ok(()),
            other => bail!("REPLCONF {:?} rejected: {:?}", args, other),
        }
    }

    /// PSYNC ? -1: expects the FULLRESYNC line, then the counted RDB payload
    /// (no trailing CRLF), which is returned for the caller to dispose of.
    pub fn psync(&mut self) -> Result<Vec<u8>> {
        self.connection
            .send_message(&RESP::command(&["PSYNC", "?", "-1"]))?;
        match self.connection.read_message()? {
            Some(RESP::String(reply)) if reply.to_uppercase().starts_with("FULLRESYNC ") => {
                println!("master answered: {}", reply);
                self.connection.read_rdb_payload()
            }
            other => bail!("PSYNC rejected: {:?}", other),
        }
    }

    /// Next propagated command from the master; None when the link closes.
    pub fn read_command(&mut self) -> Result<Option<RESP>> {
        match self.connection.read_message()? {
            Some(message @ RESP::Array(_)) => Ok(Some(message)),
            Some(other) => bail!("replication stream must carry arrays, got {}", other),
            None => Ok(None),
        }
    }
}
