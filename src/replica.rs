use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::client::MasterLink;
use crate::io::net::Binding;
use crate::protocol::command::Command;
use crate::redis::RedisServer;

/// Spawns the replica worker: handshake with the master, then apply the
/// propagated write stream. The link retries with a delay until the role is
/// switched away with REPLICAOF NO ONE.
pub fn start_replication(server: RedisServer, master: Binding) -> Result<()> {
    let thread_name = format!("replica-of-{}", master);
    thread::Builder::new().name(thread_name).spawn(move || {
        while !server.is_master() {
            if let Err(err) = sync_with_master(&server, &master) {
                println!("replication link to {} failed: {:#}", master, err);
            }
            thread::sleep(Duration::from_secs(2));
        }
        println!("promoted to master, replication worker stopping");
    })?;
    Ok(())
}

fn sync_with_master(server: &RedisServer, master: &Binding) -> Result<()> {
    let mut link = MasterLink::connect(master)?;
    link.ping()?;
    link.replconf(&["listening-port", &server.binding.1.to_string()])?;
    link.replconf(&["capa", "psync2"])?;
    let snapshot = link.psync()?;
    // the transfer is consumed to keep the stream framed; this replica
    // starts empty and converges through the write stream
    println!("discarded {} byte master snapshot", snapshot.len());

    // apply-only loop: no replies go back to the master
    loop {
        let message = match link.read_command()? {
            Some(message) => message,
            None => bail!("master closed the replication link"),
        };
        let (name, params) = Command::split_request(&message)?;
        let command = match name.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                println!("ignoring unknown replicated command {}", name);
                continue;
            }
        };
        match server.execute(command, &params, false) {
            Ok(reply) => println!("applied {} from master: {}", command, reply),
            Err(err) => println!("replicated {} failed: {:#}", command, err),
        }
    }
}
