use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::RwLock;

use bytes::Bytes;

use crate::protocol::command::Command;
use crate::protocol::resp::{self, RESP};

struct ReplicaSink {
    peer: String,
    sender: Sender<RESP>,
}

/// Process-wide registry of replica feeds, in PSYNC completion order. The
/// sink is a channel: the thread that owns the replica's socket drains it,
/// so no foreign thread ever writes to the socket directly.
#[derive(Default)]
pub struct ReplicaRegistry {
    sinks: RwLock<Vec<ReplicaSink>>,
    offset: AtomicUsize,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer: String, sender: Sender<RESP>) {
        let mut sinks = self.sinks.write().unwrap();
        sinks.push(ReplicaSink { peer, sender });
        println!("replica registered, {} feeds active", sinks.len());
    }

    pub fn count(&self) -> usize {
        self.sinks.read().unwrap().len()
    }

    /// Bytes of write traffic propagated so far; reported as
    /// `master_repl_offset`.
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Relaxed)
    }

    /// Best-effort fan-out of one executed write. A sink whose connection
    /// thread is gone fails its send; it is logged and kept registered.
    pub fn propagate(&self, message: &RESP) {
        let sinks = self.sinks.read().unwrap();
        if sinks.is_empty() {
            return;
        }
        println!("propagating {} to {} replicas", message, sinks.len());
        for sink in sinks.iter() {
            if sink.sender.send(message.clone()).is_err() {
                println!("replica {} is not taking writes", sink.peer);
            }
        }
        self.offset
            .fetch_add(resp::encode(message).len(), Ordering::Relaxed);
    }
}

/// What, if anything, goes out to replicas for one executed command.
/// Most writes go out verbatim. Two are rewritten so the replica applies
/// the same mutation the master performed:
/// - BLPOP becomes the `LPOP <key>` it amounted to, and only once an
///   element was actually delivered;
/// - XADD carries the assigned ID instead of a `*` spec, so replicas do not
///   generate their own.
pub fn propagation_for(command: Command, params: &[Bytes], reply: &RESP) -> Option<RESP> {
    match command {
        Command::SET | Command::DEL | Command::RPUSH | Command::LPUSH | Command::LPOP => {
            Some(request_array(command, params))
        }
        Command::XADD => match reply {
            RESP::Bulk(assigned_id) => {
                let mut params = params.to_vec();
                params[1] = assigned_id.clone();
                Some(request_array(command, &params))
            }
            _ => None,
        },
        Command::BLPOP => match reply {
            RESP::Array(items) if items.len() == 2 => Some(RESP::Array(vec![
                RESP::bulk("LPOP"),
                items[0].clone(),
            ])),
            _ => None,
        },
        _ => None,
    }
}

fn request_array(command: Command, params: &[Bytes]) -> RESP {
    let mut items = Vec::with_capacity(params.len() + 1);
    items.push(RESP::bulk(command.to_string()));
    items.extend(params.iter().map(|p| RESP::Bulk(p.clone())));
    RESP::Array(items)
}
