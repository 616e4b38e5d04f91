use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Result};
use bytes::Bytes;

use crate::error::ClientError;
use crate::protocol::command::Command;
use crate::protocol::resp::{RespConnection, RESP};
use crate::redis::RedisServer;
use crate::replication;
use crate::txn::TxnState;

/// Accept loop: one named worker thread per connection, each holding a clone
/// of the shared server handle.
pub fn serve(server: RedisServer, listener: TcpListener) -> Result<()> {
    println!("listening on {}", listener.local_addr()?);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "?".to_string());
                let server = server.clone();
                thread::Builder::new()
                    .name(format!("client-{}", peer))
                    .spawn(move || {
                        if let Err(err) = ClientConnection::new(server).handle(stream) {
                            println!("connection {} closed: {:#}", peer, err);
                        }
                    })?;
            }
            Err(err) => println!("accept failed: {}", err),
        }
    }
    Ok(())
}

/// Per-client worker: decode one request, run it through the transaction
/// buffer and the command engine, reply, repeat until EOF.
pub struct ClientConnection {
    server: RedisServer,
    txn: TxnState,
}

impl ClientConnection {
    pub fn new(server: RedisServer) -> Self {
        Self { server, txn: TxnState::new() }
    }

    pub fn handle(mut self, stream: TcpStream) -> Result<()> {
        let mut connection = RespConnection::new(stream)?;
        loop {
            let message = match connection.read_message()? {
                Some(message) => message,
                None => {
                    println!("client {} disconnected", connection.peer());
                    return Ok(());
                }
            };
            let (name, params) = Command::split_request(&message)?;
            let command = match name.parse::<Command>() {
                Ok(command) => command,
                Err(_) => {
                    let err = ClientError::UnknownCommand(name);
                    connection.send_message(&RESP::Error(format!("ERR {}", err)))?;
                    continue;
                }
            };

            // inside MULTI everything except the transaction verbs is queued
            if self.txn.is_active()
                && !matches!(command, Command::MULTI | Command::EXEC | Command::DISCARD)
            {
                self.txn.push(command, params);
                connection.send_message(&RESP::String("QUEUED".to_string()))?;
                continue;
            }

            let reply = match command {
                Command::MULTI => state_reply(self.txn.begin()),
                Command::DISCARD => state_reply(self.txn.discard()),
                Command::EXEC => match self.txn.take() {
                    Ok(queued) => RESP::Array(
                        queued
                            .into_iter()
                            .map(|(command, params)| self.run(command, &params, false))
                            .collect(),
                    ),
                    Err(err) => RESP::Error(format!("ERR {}", err)),
                },
                Command::PSYNC => {
                    // this connection stops being a client and becomes a
                    // replication feed; the loop below never hands it back
                    return self.serve_replica(&mut connection, &params);
                }
                _ => self.run(command, &params, true),
            };
            connection.send_message(&reply)?;
        }
    }

    /// Executes one command and, on a master, fans the write out to the
    /// replica feeds. Errors become RESP errors here; only I/O failures
    /// propagate out and tear the connection down.
    fn run(&self, command: Command, params: &[Bytes], allow_block: bool) -> RESP {
        if command.is_write() && !self.server.is_master() {
            return RESP::Error(
                "READONLY You can't write against a read only replica.".to_string(),
            );
        }
        match self.server.execute(command, params, allow_block) {
            Ok(reply) => {
                if self.server.is_master() {
                    if let Some(record) = replication::propagation_for(command, params, &reply) {
                        self.server.replicas.propagate(&record);
                    }
                }
                reply
            }
            Err(err) => RESP::Error(format!("ERR {}", err)),
        }
    }

    /// PSYNC ? -1: FULLRESYNC header, RDB bulk (no trailing CRLF), then this
    /// thread drains the registry channel into the socket until the replica
    /// goes away.
    fn serve_replica(&self, connection: &mut RespConnection, params: &[Bytes]) -> Result<()> {
        let known_replid = match params {
            [replid, offset] => {
                (&replid[..] == b"?" && &offset[..] == b"-1")
                    || replid[..] == *self.server.master_replid.as_bytes()
            }
            _ => false,
        };
        if !known_replid {
            bail!("unsupported PSYNC request");
        }

        let header = RESP::String(format!(
            "FULLRESYNC {} {}",
            self.server.master_replid,
            self.server.replicas.offset()
        ));
        let snapshot = RESP::File(self.server.rdb_snapshot());
        connection.send_messages(&[&header, &snapshot])?;

        let (sender, receiver) = mpsc::channel();
        self.server
            .replicas
            .register(connection.peer().to_string(), sender);
        println!("{} completed PSYNC, now a replication feed", connection.peer());

        for message in receiver {
            connection.send_message(&message)?;
        }
        Ok(())
    }
}

fn state_reply(result: Result<(), ClientError>) -> RESP {
    match result {
        Ok(()) => RESP::String("OK".to_string()),
        Err(err) => RESP::Error(format!("ERR {}", err)),
    }
}
