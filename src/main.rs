use clap::Parser;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use decision_maker::cli::handlers;
use decision_maker::cli::{Cli, Commands};
use decision_maker::core::Navigation;
use decision_maker::utils::tui_writer::TuiWriter;
use decision_maker::{Config, Result};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("decision_maker=info"))
}

// The chat screen owns the terminal, so its logs go to the log pane (and optionally a file).
fn init_chat_tracing(writer: TuiWriter, logfile: Option<&Path>) -> Result<()> {
    let file_layer = match logfile {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (tui_writer, log_rx) = TuiWriter::new();
    match &cli.command {
        Commands::Chat { logfile, .. } => init_chat_tracing(tui_writer, logfile.as_deref())?,
        _ => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init(),
    }

    let mut config = Config::load()?;
    if let Some(url) = &cli.url {
        config.dialogue.base_url = url.trim_end_matches('/').to_string();
    }
    let default_tool = config.dialogue.default_tool;

    match cli.command {
        Commands::Serve { port, flows_dir } => handlers::serve(config, port, flows_dir).await,
        Commands::Chat {
            tool, axis, query, ..
        } => {
            let navigation = match query {
                Some(query) => Navigation::from_query(&query, default_tool),
                None => Navigation::new(tool.unwrap_or(default_tool), axis.as_deref()),
            };
            handlers::chat(config, navigation, log_rx).await
        }
        Commands::Tools => handlers::list_tools(),
        Commands::Flows => handlers::list_flows(config).await,
        Commands::Flow { flow_id } => handlers::walk_flow(config, flow_id).await,
        Commands::Ask {
            message,
            tool,
            axis,
        } => {
            let navigation = Navigation::new(tool.unwrap_or(default_tool), axis.as_deref());
            handlers::ask(config, navigation, message).await
        }
        Commands::Config => handlers::print_config(&config),
    }
}
