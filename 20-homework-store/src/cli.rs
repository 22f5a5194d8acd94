use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the homework backend, accepting one request per TCP connection.
    Serve(ServeArgs),
    /// Periodically ping a backend and log when it stops answering.
    Probe(ProbeArgs),
    /// Send a single request to a backend and print the JSON response.
    Request(RequestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address the backend should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:8090")]
    pub listen: SocketAddr,

    /// How long a client may take to deliver its request, in milliseconds.
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout_ms: u64,

    /// Start without the default assignments.
    #[arg(long)]
    pub empty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Address of the backend to probe.
    #[arg(long, default_value = "127.0.0.1:8090")]
    pub backend: SocketAddr,

    /// Time between probes, in milliseconds.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// How long each probe waits for a reply, in milliseconds.
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Address of the backend to talk to.
    #[arg(long, default_value = "127.0.0.1:8090")]
    pub backend: SocketAddr,

    /// How long to wait for the reply, in milliseconds.
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub action: RequestAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RequestAction {
    /// List every assignment, deleted ones included.
    List,
    /// Show one assignment.
    Get { id: i64 },
    /// Add an assignment.
    Create { name: String, desc: String },
    /// Replace name and description, counting one submission.
    Edit { id: i64, name: String, desc: String },
    /// Mark an assignment as deleted.
    Delete { id: i64 },
    /// Check that the backend is answering.
    Ping,
}
