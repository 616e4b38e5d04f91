use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ClientError;
use crate::io::net::Binding;
use crate::protocol::command::Command;
use crate::protocol::rdb::{self, RdbRecord};
use crate::protocol::resp::RESP;
use crate::replication::ReplicaRegistry;
use crate::store::{
    now_ms, ListStore, ListWaiter, StreamEntry, StreamEntryId, StreamStore, StringStore,
};

/// SAVE writes to the working directory, not `--dir`.
pub const SAVE_FILENAME: &str = "dump.rdb";

/// The shared server state: one instance per process, cloned into every
/// connection worker. The stores and the replica registry live behind `Arc`
/// so a clone is just a handle.
#[derive(Clone)]
pub struct RedisServer {
    pub binding: Binding,
    strings: Arc<StringStore>,
    lists: Arc<ListStore>,
    streams: Arc<StreamStore>,
    pub replicas: Arc<ReplicaRegistry>,
    master_role: Arc<AtomicBool>,
    pub master_replid: String,
    pub db_dir: String,
    pub db_filename: String,
}

impl RedisServer {
    pub fn new(binding: Binding, is_master: bool, db_dir: String, db_filename: String) -> Self {
        // 40 hex chars, fixed for the master's lifetime
        let master_replid = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let server = RedisServer {
            binding,
            strings: Arc::new(StringStore::new()),
            lists: Arc::new(ListStore::new()),
            streams: Arc::new(StreamStore::new()),
            replicas: Arc::new(ReplicaRegistry::new()),
            master_role: Arc::new(AtomicBool::new(is_master)),
            master_replid: master_replid[..40].to_string(),
            db_dir,
            db_filename,
        };
        server.load_snapshot();
        server
    }

    pub fn is_master(&self) -> bool {
        self.master_role.load(Ordering::Relaxed)
    }

    /// REPLICAOF NO ONE. The only role change supported.
    pub fn promote_to_master(&self) {
        self.master_role.store(true, Ordering::Relaxed);
    }

    /// Serialized live string keyspace, for the PSYNC transfer.
    pub fn rdb_snapshot(&self) -> Vec<u8> {
        rdb::serialize(&self.snapshot_records())
    }

    fn snapshot_records(&self) -> Vec<RdbRecord> {
        self.strings
            .snapshot()
            .into_iter()
            .map(|(key, value, expires_at_ms)| RdbRecord { key, value, expires_at_ms })
            .collect()
    }

    /// Best-effort load of `<dir>/<dbfilename>`; a bad or missing snapshot
    /// logs and leaves the store empty.
    fn load_snapshot(&self) {
        let path = Path::new(&self.db_dir).join(&self.db_filename);
        if !path.exists() {
            println!("no snapshot to load at {:?}", path);
            return;
        }
        match rdb::load_file(&path) {
            Ok(records) => {
                println!("loaded {} keys from {:?}", records.len(), path);
                for record in records {
                    self.strings.set(record.key, record.value, record.expires_at_ms);
                }
            }
            Err(err) => println!("failed to load snapshot {:?}: {:#}", path, err),
        }
    }

    /// Runs one command against the stores and shapes the reply.
    ///
    /// MULTI/EXEC/DISCARD and PSYNC never reach this: they need per-connection
    /// state and live in the connection handler. `allow_block` is false for
    /// queued (EXEC) and replicated commands, degrading BLPOP and
    /// XREAD BLOCK to their immediate forms.
    pub fn execute(&self, command: Command, params: &[Bytes], allow_block: bool) -> Result<RESP> {
        match (command, params) {
            (Command::PING, []) => Ok(RESP::String("PONG".to_string())),
            (Command::ECHO, [message]) => Ok(RESP::Bulk(message.clone())),

            (Command::SET, [key, value]) => {
                self.strings.set(key.clone(), value.clone(), None);
                Ok(RESP::String("OK".to_string()))
            }
            (Command::SET, [key, value, option, expiry]) if token_eq(option, "PX") => {
                let px = utf8_or(expiry, ClientError::InvalidExpireTime)?
                    .parse::<i64>()
                    .map_err(|_| ClientError::InvalidExpireTime)?;
                if px <= 0 {
                    return Err(ClientError::InvalidExpireTime.into());
                }
                self.strings
                    .set(key.clone(), value.clone(), Some(now_ms() + px as u64));
                Ok(RESP::String("OK".to_string()))
            }
            (Command::SET, [_, _, _, _]) => bail!("syntax error"),

            (Command::GET, [key]) => Ok(self.strings.get(key).map_or(RESP::Null, RESP::Bulk)),

            (Command::DEL, keys) if !keys.is_empty() => {
                let mut deleted = 0;
                for key in keys {
                    let removed = self.strings.remove(key)
                        | self.lists.remove(key)
                        | self.streams.remove(key);
                    deleted += removed as i64;
                }
                Ok(RESP::Int(deleted))
            }

            (Command::INCR, [key]) => Ok(RESP::Int(self.strings.incr(key)?)),

            (Command::TYPE, [key]) => {
                let kind = if self.strings.exists(key) {
                    "string"
                } else if self.lists.exists(key) {
                    "list"
                } else if self.streams.exists(key) {
                    "stream"
                } else {
                    "none"
                };
                Ok(RESP::String(kind.to_string()))
            }

            (Command::KEYS, [pattern]) => {
                if &pattern[..] != b"*" {
                    bail!("only the * pattern is supported");
                }
                Ok(RESP::Array(
                    self.strings.keys().into_iter().map(RESP::Bulk).collect(),
                ))
            }

            (Command::RPUSH, [key, elements @ ..]) if !elements.is_empty() => {
                Ok(RESP::Int(self.lists.rpush(key, elements) as i64))
            }
            (Command::LPUSH, [key, elements @ ..]) if !elements.is_empty() => {
                Ok(RESP::Int(self.lists.lpush(key, elements) as i64))
            }

            (Command::LPOP, [key]) => {
                Ok(self
                    .lists
                    .lpop(key, 1)
                    .pop()
                    .map_or(RESP::Null, RESP::Bulk))
            }
            (Command::LPOP, [key, count]) => {
                let count = utf8_or(count, ClientError::NotAnInteger)?
                    .parse::<i64>()
                    .map_err(|_| ClientError::NotAnInteger)?;
                if count < 0 {
                    return Err(ClientError::NotPositive.into());
                }
                Ok(RESP::Array(
                    self.lists
                        .lpop(key, count as usize)
                        .into_iter()
                        .map(RESP::Bulk)
                        .collect(),
                ))
            }

            (Command::LRANGE, [key, start, end]) => {
                let start = parse_index(start)?;
                let end = parse_index(end)?;
                Ok(RESP::Array(
                    self.lists
                        .lrange(key, start, end)
                        .into_iter()
                        .map(RESP::Bulk)
                        .collect(),
                ))
            }

            (Command::LLEN, [key]) => Ok(RESP::Int(self.lists.llen(key) as i64)),

            (Command::BLPOP, [key, timeout]) => self.blpop(key, timeout, allow_block),

            (Command::XADD, [key, id, field_values @ ..])
                if !field_values.is_empty() && field_values.len() % 2 == 0 =>
            {
                let fields = field_values
                    .chunks_exact(2)
                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                    .collect();
                let assigned = self.streams.add(key, utf8_or(id, ClientError::BadStreamId)?, fields)?;
                Ok(RESP::bulk(assigned.to_string()))
            }

            (Command::XRANGE, [key, start, end]) => {
                let start = StreamEntryId::parse_range_start(utf8_or(start, ClientError::BadStreamId)?)?;
                let end = StreamEntryId::parse_range_end(utf8_or(end, ClientError::BadStreamId)?)?;
                Ok(RESP::Array(
                    self.streams
                        .range(key, start, end)
                        .iter()
                        .map(entry_to_resp)
                        .collect(),
                ))
            }

            (Command::XREAD, params) if !params.is_empty() => self.xread(params, allow_block),

            (Command::INFO, sections) if sections.len() <= 1 => {
                if let [section] = sections {
                    if !token_eq(section, "replication") {
                        bail!("unknown INFO section {}", String::from_utf8_lossy(section));
                    }
                }
                Ok(RESP::bulk(self.replication_info()))
            }

            // any REPLCONF subcommand is acknowledged
            (Command::REPLCONF, _) => Ok(RESP::String("OK".to_string())),

            (Command::REPLICAOF, [host, port]) => {
                if token_eq(host, "NO") && token_eq(port, "ONE") {
                    self.promote_to_master();
                    println!("role switched to master");
                    Ok(RESP::String("OK".to_string()))
                } else {
                    bail!("only REPLICAOF NO ONE is supported")
                }
            }

            (Command::CONFIG, [sub, name]) if token_eq(sub, "GET") => {
                let value = match utf8(name)?.to_ascii_lowercase().as_str() {
                    "dir" => self.db_dir.clone(),
                    "dbfilename" => self.db_filename.clone(),
                    _ => String::new(),
                };
                Ok(RESP::Array(vec![RESP::Bulk(name.clone()), RESP::bulk(value)]))
            }

            (Command::SAVE, []) => {
                rdb::save_to_file(Path::new(SAVE_FILENAME), &self.snapshot_records())?;
                Ok(RESP::String("OK".to_string()))
            }

            (Command::MULTI | Command::EXEC | Command::DISCARD | Command::PSYNC, _) => {
                bail!("{} is handled by the connection layer", command)
            }

            _ => Err(ClientError::WrongArity(command.to_string().to_lowercase()).into()),
        }
    }

    fn replication_info(&self) -> String {
        let mut info = String::new();
        if self.is_master() {
            info.push_str("role:master\r\n");
            info.push_str(&format!("master_replid:{}\r\n", self.master_replid));
            info.push_str(&format!("master_repl_offset:{}\r\n", self.replicas.offset()));
        } else {
            info.push_str("role:slave\r\n");
        }
        info
    }

    /// BLPOP: pop now, or park on the key's FIFO queue until a push or the
    /// deadline. Whichever of the wake and timeout paths removes the waiter
    /// owns the reply.
    fn blpop(&self, key: &Bytes, timeout: &Bytes, allow_block: bool) -> Result<RESP> {
        let seconds = utf8_or(timeout, ClientError::TimeoutNotFloat)?
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite())
            .ok_or(ClientError::TimeoutNotFloat)?;
        if seconds < 0.0 {
            return Err(ClientError::NegativeTimeout.into());
        }
        let deadline = Instant::now() + Duration::from_millis((seconds * 1000.0) as u64);
        loop {
            if let Some(element) = self.lists.lpop(key, 1).pop() {
                return Ok(RESP::Array(vec![RESP::Bulk(key.clone()), RESP::Bulk(element)]));
            }
            if !allow_block {
                return Ok(RESP::Null);
            }
            let (sender, receiver) = mpsc::channel();
            let waiter_id = self.lists.next_waiter_id();
            if !self.lists.block_waiter(key, ListWaiter { id: waiter_id, sender }) {
                // an element arrived between the pop and the registration
                continue;
            }
            let delivered = if seconds == 0.0 {
                receiver.recv().ok()
            } else {
                match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(pair) => Some(pair),
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if self.lists.unblock_waiter(key, waiter_id) {
                            None
                        } else {
                            // the wake path got there first; its delivery is
                            // in flight
                            receiver.recv().ok()
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => None,
                }
            };
            return Ok(match delivered {
                Some((key, element)) => {
                    RESP::Array(vec![RESP::Bulk(key), RESP::Bulk(element)])
                }
                None => RESP::Null,
            });
        }
    }

    /// XREAD [BLOCK ms] STREAMS k… id…
    fn xread(&self, params: &[Bytes], allow_block: bool) -> Result<RESP> {
        let streams_at = position_token(params, "STREAMS")
            .ok_or_else(|| ClientError::WrongArity("xread".to_string()))?;
        // options live before STREAMS; everything after is keys then ids
        let options = &params[..streams_at];
        let block_ms = match position_token(options, "BLOCK") {
            Some(at) => {
                let value = options
                    .get(at + 1)
                    .ok_or_else(|| ClientError::WrongArity("xread".to_string()))?;
                let ms = utf8_or(value, ClientError::TimeoutNotFloat)?
                    .parse::<i64>()
                    .map_err(|_| ClientError::TimeoutNotFloat)?;
                if ms < 0 {
                    return Err(ClientError::NegativeTimeout.into());
                }
                Some(ms as u64)
            }
            None => None,
        };
        let spec = &params[streams_at + 1..];
        if spec.is_empty() || spec.len() % 2 != 0 {
            return Err(ClientError::WrongArity("xread".to_string()).into());
        }
        let (keys, ids) = spec.split_at(spec.len() / 2);
        let mut pairs = Vec::with_capacity(keys.len());
        for (key, id) in keys.iter().zip(ids) {
            // $ means: only entries appended from now on
            let after = if &id[..] == b"$" {
                self.streams.last_id(key).unwrap_or(StreamEntryId::MIN)
            } else {
                StreamEntryId::parse(utf8_or(id, ClientError::BadStreamId)?)?
            };
            pairs.push((key.clone(), after));
        }

        if let Some(reply) = self.xread_reply(&pairs) {
            return Ok(reply);
        }
        let Some(block_ms) = block_ms else {
            return Ok(RESP::Null);
        };
        if !allow_block {
            return Ok(RESP::Null);
        }

        let deadline = Instant::now() + Duration::from_millis(block_ms);
        let (sender, receiver) = mpsc::channel();
        let Some(waiter_id) = self.streams.register_waiter(pairs.clone(), sender) else {
            // data arrived between the first read and the registration
            return Ok(self.xread_reply(&pairs).unwrap_or(RESP::Null));
        };
        let woken = if block_ms == 0 {
            receiver.recv().is_ok()
        } else {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(()) => true,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.streams.deregister_waiter(waiter_id) {
                        false
                    } else {
                        receiver.recv().is_ok()
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => false,
            }
        };
        if woken {
            Ok(self.xread_reply(&pairs).unwrap_or(RESP::Null))
        } else {
            Ok(RESP::Null)
        }
    }

    /// Per-stream blocks in command order; None when every stream is empty
    /// past its cursor.
    fn xread_reply(&self, pairs: &[(Bytes, StreamEntryId)]) -> Option<RESP> {
        let mut blocks = vec![];
        for (key, after) in pairs {
            let entries = self.streams.entries_after(key, *after);
            if entries.is_empty() {
                continue;
            }
            blocks.push(RESP::Array(vec![
                RESP::Bulk(key.clone()),
                RESP::Array(entries.iter().map(entry_to_resp).collect()),
            ]));
        }
        if blocks.is_empty() {
            None
        } else {
            Some(RESP::Array(blocks))
        }
    }
}

/// `[id, [field, value, …]]`, the XRANGE/XREAD entry shape.
fn entry_to_resp(entry: &StreamEntry) -> RESP {
    let mut flat = Vec::with_capacity(entry.fields.len() * 2);
    for (field, value) in &entry.fields {
        flat.push(RESP::Bulk(field.clone()));
        flat.push(RESP::Bulk(value.clone()));
    }
    RESP::Array(vec![RESP::bulk(entry.id.to_string()), RESP::Array(flat)])
}

fn token_eq(arg: &Bytes, token: &str) -> bool {
    arg.eq_ignore_ascii_case(token.as_bytes())
}

fn position_token(params: &[Bytes], token: &str) -> Option<usize> {
    params.iter().position(|p| token_eq(p, token))
}

fn utf8(arg: &Bytes) -> Result<&str> {
    std::str::from_utf8(arg).map_err(|_| anyhow::format_err!("argument is not valid UTF-8"))
}

/// UTF-8 with a command-specific client error for garbage input, so e.g. a
/// binary stream ID still reports the stream-ID message.
fn utf8_or(arg: &Bytes, err: ClientError) -> Result<&str, ClientError> {
    std::str::from_utf8(arg).map_err(|_| err)
}

fn parse_index(arg: &Bytes) -> Result<i64> {
    Ok(utf8_or(arg, ClientError::NotAnInteger)?
        .parse::<i64>()
        .map_err(|_| ClientError::NotAnInteger)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> RedisServer {
        RedisServer::new(
            Binding("127.0.0.1".to_string(), 0),
            true,
            "/tmp".to_string(),
            "missing.rdb".to_string(),
        )
    }

    fn run(server: &RedisServer, command: Command, params: &[&str]) -> Result<RESP> {
        let params: Vec<Bytes> = params
            .iter()
            .map(|p| Bytes::copy_from_slice(p.as_bytes()))
            .collect();
        server.execute(command, &params, false)
    }

    fn client_error(result: Result<RESP>) -> ClientError {
        result.unwrap_err().downcast::<ClientError>().unwrap()
    }

    #[test]
    fn ping_echo() {
        let server = server();
        assert_eq!(
            run(&server, Command::PING, &[]).unwrap(),
            RESP::String("PONG".to_string())
        );
        assert_eq!(
            run(&server, Command::ECHO, &["hey"]).unwrap(),
            RESP::bulk("hey")
        );
    }

    #[test]
    fn set_get_del_round_trip() {
        let server = server();
        assert_eq!(
            run(&server, Command::SET, &["k", "v"]).unwrap(),
            RESP::String("OK".to_string())
        );
        assert_eq!(run(&server, Command::GET, &["k"]).unwrap(), RESP::bulk("v"));
        assert_eq!(run(&server, Command::DEL, &["k", "nope"]).unwrap(), RESP::Int(1));
        assert_eq!(run(&server, Command::GET, &["k"]).unwrap(), RESP::Null);
    }

    #[test]
    fn set_rejects_bad_expiry() {
        let server = server();
        assert_eq!(
            client_error(run(&server, Command::SET, &["k", "v", "PX", "abc"])),
            ClientError::InvalidExpireTime
        );
        assert_eq!(
            client_error(run(&server, Command::SET, &["k", "v", "PX", "0"])),
            ClientError::InvalidExpireTime
        );
    }

    #[test]
    fn arity_errors_name_the_command() {
        let server = server();
        assert_eq!(
            client_error(run(&server, Command::GET, &[])),
            ClientError::WrongArity("get".to_string())
        );
        assert_eq!(
            client_error(run(&server, Command::XADD, &["s", "1-1", "odd"])),
            ClientError::WrongArity("xadd".to_string())
        );
    }

    #[test]
    fn type_consults_stores_in_order() {
        let server = server();
        run(&server, Command::SET, &["str", "v"]).unwrap();
        run(&server, Command::RPUSH, &["lst", "a"]).unwrap();
        run(&server, Command::XADD, &["stm", "1-1", "f", "v"]).unwrap();
        for (key, kind) in [("str", "string"), ("lst", "list"), ("stm", "stream"), ("no", "none")] {
            assert_eq!(
                run(&server, Command::TYPE, &[key]).unwrap(),
                RESP::String(kind.to_string())
            );
        }
    }

    #[test]
    fn lpop_with_count_returns_an_array() {
        let server = server();
        run(&server, Command::RPUSH, &["L", "a", "b", "c"]).unwrap();
        assert_eq!(run(&server, Command::LPOP, &["L"]).unwrap(), RESP::bulk("a"));
        assert_eq!(
            run(&server, Command::LPOP, &["L", "5"]).unwrap(),
            RESP::Array(vec![RESP::bulk("b"), RESP::bulk("c")])
        );
        assert_eq!(run(&server, Command::LPOP, &["L"]).unwrap(), RESP::Null);
        assert_eq!(
            run(&server, Command::LPOP, &["L", "2"]).unwrap(),
            RESP::Array(vec![])
        );
        assert_eq!(
            client_error(run(&server, Command::LPOP, &["L", "-1"])),
            ClientError::NotPositive
        );
    }

    #[test]
    fn blpop_without_blocking_falls_back_to_null() {
        let server = server();
        assert_eq!(
            run(&server, Command::BLPOP, &["L", "0"]).unwrap(),
            RESP::Null
        );
        run(&server, Command::RPUSH, &["L", "x"]).unwrap();
        assert_eq!(
            run(&server, Command::BLPOP, &["L", "0"]).unwrap(),
            RESP::Array(vec![RESP::bulk("L"), RESP::bulk("x")])
        );
        assert_eq!(
            client_error(run(&server, Command::BLPOP, &["L", "-1"])),
            ClientError::NegativeTimeout
        );
        assert_eq!(
            client_error(run(&server, Command::BLPOP, &["L", "abc"])),
            ClientError::TimeoutNotFloat
        );
    }

    #[test]
    fn xadd_and_xrange_shapes() {
        let server = server();
        assert_eq!(
            run(&server, Command::XADD, &["s", "1-1", "a", "1", "b", "2"]).unwrap(),
            RESP::bulk("1-1")
        );
        let reply = run(&server, Command::XRANGE, &["s", "-", "+"]).unwrap();
        assert_eq!(
            reply,
            RESP::Array(vec![RESP::Array(vec![
                RESP::bulk("1-1"),
                RESP::Array(vec![
                    RESP::bulk("a"),
                    RESP::bulk("1"),
                    RESP::bulk("b"),
                    RESP::bulk("2"),
                ]),
            ])])
        );
    }

    #[test]
    fn xread_is_strictly_after_and_keeps_command_order() {
        let server = server();
        run(&server, Command::XADD, &["s1", "1-1", "f", "v"]).unwrap();
        run(&server, Command::XADD, &["s2", "2-2", "g", "w"]).unwrap();
        let reply = run(
            &server,
            Command::XREAD,
            &["STREAMS", "s1", "s2", "0-0", "2-2"],
        )
        .unwrap();
        // s2 has nothing after 2-2, so only s1 shows up
        assert_eq!(
            reply,
            RESP::Array(vec![RESP::Array(vec![
                RESP::bulk("s1"),
                RESP::Array(vec![RESP::Array(vec![
                    RESP::bulk("1-1"),
                    RESP::Array(vec![RESP::bulk("f"), RESP::bulk("v")]),
                ])]),
            ])])
        );
        assert_eq!(
            run(&server, Command::XREAD, &["STREAMS", "s1", "1-1"]).unwrap(),
            RESP::Null
        );
    }

    #[test]
    fn info_shape_depends_on_role() {
        let master = server();
        match run(&master, Command::INFO, &["replication"]).unwrap() {
            RESP::Bulk(info) => {
                let info = String::from_utf8(info.to_vec()).unwrap();
                assert!(info.contains("role:master\r\n"));
                assert!(info.contains(&format!("master_replid:{}\r\n", master.master_replid)));
                assert!(info.contains("master_repl_offset:0\r\n"));
                assert_eq!(master.master_replid.len(), 40);
            }
            other => panic!("INFO returned {:?}", other),
        }

        let replica = RedisServer::new(
            Binding("127.0.0.1".to_string(), 0),
            false,
            "/tmp".to_string(),
            "missing.rdb".to_string(),
        );
        assert_eq!(
            run(&replica, Command::INFO, &["replication"]).unwrap(),
            RESP::bulk("role:slave\r\n")
        );
        run(&replica, Command::REPLICAOF, &["NO", "ONE"]).unwrap();
        assert!(replica.is_master());
    }

    #[test]
    fn config_get_returns_empty_for_unknown_names() {
        let server = server();
        assert_eq!(
            run(&server, Command::CONFIG, &["GET", "dir"]).unwrap(),
            RESP::Array(vec![RESP::bulk("dir"), RESP::bulk("/tmp")])
        );
        assert_eq!(
            run(&server, Command::CONFIG, &["GET", "maxmemory"]).unwrap(),
            RESP::Array(vec![RESP::bulk("maxmemory"), RESP::bulk("")])
        );
    }

    #[test]
    fn keys_lists_only_string_keys() {
        let server = server();
        run(&server, Command::SET, &["k1", "v"]).unwrap();
        run(&server, Command::RPUSH, &["L", "a"]).unwrap();
        match run(&server, Command::KEYS, &["*"]).unwrap() {
            RESP::Array(keys) => assert_eq!(keys, vec![RESP::bulk("k1")]),
            other => panic!("KEYS returned {:?}", other),
        }
        assert!(run(&server, Command::KEYS, &["k*"]).is_err());
    }
}
