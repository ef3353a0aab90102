//! [src/main.rs]
//! APARATO: PUNTO DE ENTRADA DEL BINARIO
//! RESPONSABILIDAD: Analiza la CLI, ejecuta el escaneo inicial y levanta el servidor.

use clap::Parser;
use entroscan::prelude::*;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing("entroscan");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            error!("failed to build async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let config = Configuration::from_cli(&cli);
    info!(target = %cli.target.display(), mode = ?config.mode, size = config.block_size, "starting initial scan");

    let target = cli.target.clone();
    let config_for_scan = config.clone();
    let bootstrap = tokio::task::spawn_blocking(move || AppState::bootstrap(target, config_for_scan)).await;

    let state = match bootstrap {
        Ok(Ok(state)) => state,
        Ok(Err(err)) => {
            error!("initial scan failed: {err}");
            return ExitCode::FAILURE;
        }
        Err(join_err) => {
            error!("initial scan panicked: {join_err}");
            return ExitCode::FAILURE;
        }
    };

    let router = build_router(state);
    let bind_address = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), config.port);

    let listener = match tokio::net::TcpListener::bind(bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {bind_address}: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!("entroscan listening on http://{bind_address}");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(err) = serve_result {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("SIGINT received, shutting down"),
        Err(err) => error!("failed to listen for SIGINT: {err}"),
    }
}
