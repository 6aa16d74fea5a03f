//! # A Minimal RESP v2 Command-Line Client

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use log::info;
use redis_wire::cli::{Args, Request};
use redis_wire::cmd::Command;
use redis_wire::conn::{Connection, SessionConfig};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let command = match args.request {
        Request::Ping => Command::ping(),
        Request::Echo { message } => Command::echo(Bytes::from(message)),
        Request::Get { key } => Command::get(Bytes::from(key)),
        Request::Set { key, value } => Command::set(Bytes::from(key), Bytes::from(value)),
        Request::Del { key } => Command::del(Bytes::from(key)),
        Request::Exists { key } => Command::exists(Bytes::from(key)),
        Request::Incr { key } => Command::incr(Bytes::from(key)),
        Request::Getname => Command::client_getname(),
    };

    info!("connecting to {}", args.addr);
    let transport = TcpStream::connect(&args.addr).await?;
    let mut conn = Connection::with_config(transport, SessionConfig::from_env());

    conn.send(&command).await?;
    let response = conn.receive().await?;
    println!("{response}");

    conn.send_end_of_stream().await?;
    Ok(())
}
