mod app;
mod cli;
mod prompter;
mod registry;
mod state_file;
mod state_watcher;

use std::process::ExitCode;

use desklet_config::DeskletConfig;
use desklet_manager::CreateOptions;
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A bare level applies to desklet crates only; anything else is passed
/// through as a filter directive.
fn log_directive(arg: Option<&str>, config: Option<&DeskletConfig>) -> String {
    match arg {
        Some(level) if LEVELS.contains(&level.to_ascii_lowercase().as_str()) => {
            format!("desklet={}", level.to_ascii_lowercase())
        }
        Some(directive) => directive.to_string(),
        None => config
            .map(|c| c.logging.level.directive())
            .unwrap_or_else(|| "desklet=info".to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let loaded = match &args.config {
        Some(path) => desklet_config::load_config_from(path),
        None => desklet_config::load_config(),
    };

    let directive = log_directive(args.log_level.as_deref(), loaded.as_ref().ok());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("desklet=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    tracing::info!("Desklet v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        DeskletConfig::default()
    });

    let app = match app::DeskletApp::new(config, args.surface_specs()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("desklet: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    let result = match args.command() {
        Command::Run => {
            app.run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
            })
            .await
        }
        Command::ListWidgets => app.list_widgets(&mut stdout).await,
        Command::List => app.list(&mut stdout).await,
        Command::Add {
            widget_id,
            monitor,
            x,
            y,
        } => {
            let options = CreateOptions {
                monitor,
                x,
                y,
                config: None,
            };
            app.add(&widget_id, options).await.map(|id| println!("{id}"))
        }
        Command::Remove { instance_id } => app.remove(&instance_id).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("desklet: {e}");
            ExitCode::FAILURE
        }
    }
}
