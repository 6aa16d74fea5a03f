//! # The Command-Line Arguments

use crate::constants::LOCAL_SOCKET_ADDR_STR;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "redis-wire")]
#[command(author, version, about = "Minimal RESP v2 client", long_about = None)]
pub struct Args {
    /// The server address
    #[arg(short, long, default_value = LOCAL_SOCKET_ADDR_STR)]
    pub addr: String,

    #[command(subcommand)]
    pub request: Request,
}

#[derive(Debug, Subcommand)]
pub enum Request {
    /// Check that the server is alive
    Ping,
    /// Echo a message back
    Echo { message: String },
    /// Fetch the value of a key
    Get { key: String },
    /// Store a value under a key
    Set { key: String, value: String },
    /// Delete a key
    Del { key: String },
    /// Check whether a key exists
    Exists { key: String },
    /// Increment the integer value of a key
    Incr { key: String },
    /// Report the connection name
    Getname,
}
