use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Tool;

#[derive(Parser, Debug)]
#[command(name = "decision-maker")]
#[command(about = "Guided dialogues for making and reviewing decisions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Dialogue service base URL (overrides config and DECISION_DIALOGUE_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the development dialogue service
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory of extra *.toml flows
        #[arg(long)]
        flows_dir: Option<PathBuf>,
    },
    /// Open the chat interface
    Chat {
        /// Tool to start on, e.g. decision-exploration
        #[arg(short, long)]
        tool: Option<Tool>,
        /// Axis to start on, e.g. work_model
        #[arg(short, long)]
        axis: Option<String>,
        /// Navigation query string such as "tool=debrief&axis=team_type"
        #[arg(long, conflicts_with_all = ["tool", "axis"])]
        query: Option<String>,
        /// Path to write logs to file (in addition to the log pane)
        #[arg(long)]
        logfile: Option<PathBuf>,
    },
    /// List the decision tools
    Tools,
    /// List flows known to the dialogue service
    Flows,
    /// Walk through a guided flow on the terminal
    Flow {
        /// Flow id, e.g. how_fast
        flow_id: String,
    },
    /// Send one message and print the conversation
    Ask {
        message: String,
        #[arg(short, long)]
        tool: Option<Tool>,
        #[arg(short, long)]
        axis: Option<String>,
    },
    /// Print the effective configuration
    Config,
}
