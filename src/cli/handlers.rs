use anyhow::{anyhow, bail};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{ChatTui, DialogueClient};
use crate::core::{FlowRequest, FlowStep, Navigation, Role, Stage, Tool};
use crate::dialogue::DialogueHandle;
use crate::server::{start_dialogue_server, AppState};
use crate::utils::tui_writer::LogEntry;
use crate::{Config, Result};

pub async fn serve(mut config: Config, port: Option<u16>, flows_dir: Option<PathBuf>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if flows_dir.is_some() {
        config.server.flows_dir = flows_dir;
    }

    let state = AppState::from_config(&config.server)?;
    start_dialogue_server(config.server.port, state).await
}

fn dialogue_handle(config: &Config, navigation: Navigation) -> Result<(DialogueClient, DialogueHandle)> {
    let client = DialogueClient::from_config(config)?;
    let handle = DialogueHandle::new(Arc::new(client.clone()), navigation);
    Ok((client, handle))
}

pub async fn chat(
    config: Config,
    navigation: Navigation,
    log_rx: tokio::sync::mpsc::UnboundedReceiver<LogEntry>,
) -> Result<()> {
    tracing::info!(
        "Opening chat on ?{} against {}",
        navigation.to_query(),
        config.dialogue.base_url
    );
    let (client, handle) = dialogue_handle(&config, navigation)?;
    if !client.is_server_running().await {
        tracing::warn!(
            "Dialogue service at {} is not responding; run 'decision-maker serve' or set --url",
            client.base_url()
        );
    }

    let mut tui = ChatTui::new(handle).await?;
    tui.run(log_rx).await
}

pub fn list_tools() -> Result<()> {
    for stage in [Stage::Pre, Stage::Post] {
        println!("{}", stage.label());
        for tool in Tool::for_stage(stage) {
            let flow = tool.profile().flow_id.unwrap_or("-");
            println!("  {:<22} {:<22} flow: {}", tool.slug(), tool.label(), flow);
        }
    }
    Ok(())
}

pub async fn list_flows(config: Config) -> Result<()> {
    let client = DialogueClient::from_config(&config)?;
    let health = client
        .health()
        .await
        .map_err(|e| anyhow!("Dialogue service at {} unavailable: {}", client.base_url(), e))?;

    if health.flows.is_empty() {
        println!("No flows available");
    }
    for flow in health.flows {
        println!("{}", flow);
    }
    Ok(())
}

/// Numbers are sent as numbers so flow expressions can compare them.
fn answer_value(answer: &str) -> Value {
    let answer = answer.trim();
    match answer.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(answer.to_string()),
    }
}

pub async fn walk_flow(config: Config, flow_id: String) -> Result<()> {
    let client = DialogueClient::from_config(&config)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut request = FlowRequest {
        flow_id,
        node_id: None,
        answers: Default::default(),
    };

    loop {
        match client.flow_next(&request).await? {
            FlowStep::Ask {
                node_id,
                ask,
                awaiting,
            } => {
                println!("{}", ask.prompt);
                if let Some(helper) = &ask.helper_text {
                    println!("  ({})", helper);
                }
                let Some(line) = stdin.next_line().await? else {
                    bail!("Input closed before the flow finished");
                };
                request.answers.insert(awaiting, answer_value(&line));
                request.node_id = Some(node_id);
            }
            FlowStep::Goto { goto } => {
                tracing::debug!("Flow moved to {}", goto);
                request.node_id = Some(goto);
            }
            FlowStep::End { recommendation, .. } => {
                println!("\n{}", recommendation);
                return Ok(());
            }
            FlowStep::Error { error } => bail!("Flow failed: {}", error),
        }
    }
}

pub async fn ask(config: Config, navigation: Navigation, message: String) -> Result<()> {
    let (_client, handle) = dialogue_handle(&config, navigation)?;
    handle.idle().await?;
    if !handle.send(message).await? {
        bail!("Message was not sent");
    }
    handle.idle().await?;

    let snapshot = handle.snapshot().await?;
    for message in &snapshot.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        println!("{:>9}: {}", who, message.text);
    }
    if let Some(error) = snapshot.error {
        bail!(error);
    }
    Ok(())
}

pub fn print_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_prefers_numbers() {
        assert_eq!(answer_value(" 3 "), Value::from(3));
        assert_eq!(answer_value("yes"), Value::String("yes".to_string()));
    }
}
