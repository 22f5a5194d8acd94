use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use homework_store::{
    cli::{Cli, Command, ProbeArgs, RequestAction, RequestArgs, ServeArgs},
    client::BackendClient,
    dispatcher::Dispatcher,
    probe,
    protocol::{Operation, Request},
    record::Homework,
    server::Server,
    store::HomeworkStore,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await?,
        Command::Probe(args) => run_probe(args).await,
        Command::Request(args) => send_request(args).await?,
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let store = if args.empty {
        HomeworkStore::new()
    } else {
        HomeworkStore::seeded()
    };

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("couldn't bind {}", args.listen))?;
    let server = Server::new(listener, Dispatcher::new(Arc::new(store)))
        .with_read_timeout(Duration::from_millis(args.read_timeout_ms));
    let addr = server.local_addr()?;
    info!("backend listening on {}", addr);

    if let Err(err) = server.run_until_ctrl_c().await {
        warn!("backend exited with error: {err:?}");
        return Err(err);
    }
    Ok(())
}

async fn run_probe(args: ProbeArgs) {
    let client =
        BackendClient::new(args.backend).with_timeout(Duration::from_millis(args.timeout_ms));
    info!(backend = %args.backend, interval_ms = args.interval_ms, "probing backend");

    let failures = probe::run_probe(
        client,
        Duration::from_millis(args.interval_ms),
        async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        },
    )
    .await;
    info!(failures, "probe stopped");
}

async fn send_request(args: RequestArgs) -> Result<()> {
    let client =
        BackendClient::new(args.backend).with_timeout(Duration::from_millis(args.timeout_ms));
    let request = match args.action {
        RequestAction::List => Request::new(Operation::ListAll),
        RequestAction::Get { id } => Request::new(Operation::ReadOne).with_id(id),
        RequestAction::Create { name, desc } => {
            Request::new(Operation::Create).with_homework(Homework::new(name, desc))
        }
        RequestAction::Edit { id, name, desc } => Request::new(Operation::Edit)
            .with_id(id)
            .with_homework(Homework::new(name, desc)),
        RequestAction::Delete { id } => Request::new(Operation::Delete).with_id(id),
        RequestAction::Ping => Request::new(Operation::HealthCheck),
    };

    let response = client
        .send(&request)
        .await
        .with_context(|| format!("{} request to {} failed", request.operation, args.backend))?;
    println!("{}", serde_json::to_string(&response)?);

    if !response.success {
        anyhow::bail!(
            "backend rejected request: {}",
            response.err_message.unwrap_or_default()
        );
    }
    Ok(())
}
