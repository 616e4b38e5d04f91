use std::net::TcpListener;

use anyhow::{bail, Context, Result};

use miniredis::args::{named_option, named_option_list};
use miniredis::connection;
use miniredis::io::net::{Binding, Port, DEFAULT_PORT};
use miniredis::redis::RedisServer;
use miniredis::replica;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let port = named_option::<Port>(&args, "--port")?.unwrap_or(DEFAULT_PORT);
    let db_dir = named_option::<String>(&args, "--dir")?.unwrap_or_else(|| "/tmp".to_string());
    let db_filename =
        named_option::<String>(&args, "--dbfilename")?.unwrap_or_else(|| "dump.rdb".to_string());
    let replica_of = replica_of_option(&args)?;

    let binding = Binding("127.0.0.1".to_string(), port);
    let server = RedisServer::new(binding.clone(), replica_of.is_none(), db_dir, db_filename);

    if let Some(master) = replica_of {
        println!("starting as a replica of {}", master);
        replica::start_replication(server.clone(), master)?;
    }

    let listener = TcpListener::bind(binding.to_string())
        .with_context(|| format!("failed to bind {}", binding))?;
    connection::serve(server, listener)
}

/// `--replicaof "HOST PORT"` or `--replicaof HOST PORT`.
fn replica_of_option(args: &[String]) -> Result<Option<Binding>> {
    let Some(tail) = named_option_list(args, "--replicaof") else {
        return Ok(None);
    };
    match tail {
        [] => bail!("--replicaof requires a host and port"),
        [host_port, ..] if host_port.contains(' ') => Ok(Some(host_port.parse()?)),
        [host, port, ..] if !port.starts_with("--") => {
            Ok(Some(format!("{} {}", host, port).parse()?))
        }
        [host, ..] => Ok(Some(host.parse()?)),
    }
}
