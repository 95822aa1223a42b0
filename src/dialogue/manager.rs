use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::controller::{
    DialogueController, DialogueSnapshot, Outbound, RequestKind, Ticket,
};
use super::service::{DialogueError, DialogueService};
use crate::core::{Axis, DialogueReply, Navigation, Selection, SessionId};

const EVENT_CAPACITY: usize = 64;

/// Notifications for front ends rendering the dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    /// Something visible changed; fetch a fresh snapshot.
    Changed,
    /// The dialogue service sent a new axis catalogue.
    AxesUpdated(Vec<Axis>),
}

// Commands that can be sent to the DialogueActor
pub enum DialogueCommand {
    Navigate {
        navigation: Navigation,
        response_tx: oneshot::Sender<()>,
    },
    SetInput {
        text: String,
        response_tx: oneshot::Sender<()>,
    },
    Submit {
        response_tx: oneshot::Sender<bool>,
    },
    Save {
        response_tx: oneshot::Sender<Option<SessionId>>,
    },
    Select {
        selection: Selection,
        response_tx: oneshot::Sender<Selection>,
    },
    Delete {
        id: SessionId,
        response_tx: oneshot::Sender<bool>,
    },
    Rename {
        id: SessionId,
        title: String,
        response_tx: oneshot::Sender<bool>,
    },
    Snapshot {
        response_tx: oneshot::Sender<DialogueSnapshot>,
    },
    /// Resolves once no dialogue request is in flight.
    Idle {
        response_tx: oneshot::Sender<()>,
    },
}

struct Finished {
    ticket: Ticket,
    result: Result<DialogueReply, DialogueError>,
}

// Actor handle for driving a DialogueController from async code
#[derive(Clone)]
pub struct DialogueHandle {
    command_tx: mpsc::UnboundedSender<DialogueCommand>,
    events_tx: broadcast::Sender<DialogueEvent>,
}

// Owns the controller; runs in its own task
struct DialogueActor {
    controller: DialogueController,
    service: Arc<dyn DialogueService>,
    command_rx: mpsc::UnboundedReceiver<DialogueCommand>,
    finished_rx: mpsc::UnboundedReceiver<Finished>,
    finished_tx: mpsc::UnboundedSender<Finished>,
    events_tx: broadcast::Sender<DialogueEvent>,
    in_flight: usize,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl DialogueHandle {
    pub fn new(service: Arc<dyn DialogueService>, navigation: Navigation) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = DialogueActor {
            controller: DialogueController::new(navigation),
            service,
            command_rx,
            finished_rx,
            finished_tx,
            events_tx: events_tx.clone(),
            in_flight: 0,
            idle_waiters: Vec::new(),
        };

        tokio::spawn(actor.run());

        Self {
            command_tx,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialogueEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> DialogueCommand,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build(response_tx))
            .map_err(|_| anyhow!("Dialogue actor is not running"))?;
        response_rx
            .await
            .map_err(|_| anyhow!("Dialogue actor did not respond"))
    }

    pub async fn navigate(&self, navigation: Navigation) -> Result<()> {
        self.request(|response_tx| DialogueCommand::Navigate {
            navigation,
            response_tx,
        })
        .await
    }

    pub async fn set_input(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.request(|response_tx| DialogueCommand::SetInput { text, response_tx })
            .await
    }

    /// Sends whatever is in the input field. Returns false if nothing was sent.
    pub async fn submit(&self) -> Result<bool> {
        self.request(|response_tx| DialogueCommand::Submit { response_tx })
            .await
    }

    /// Shorthand for `set_input` followed by `submit`.
    pub async fn send(&self, text: impl Into<String>) -> Result<bool> {
        self.set_input(text).await?;
        self.submit().await
    }

    pub async fn save(&self) -> Result<Option<SessionId>> {
        self.request(|response_tx| DialogueCommand::Save { response_tx })
            .await
    }

    pub async fn select(&self, selection: Selection) -> Result<Selection> {
        self.request(|response_tx| DialogueCommand::Select {
            selection,
            response_tx,
        })
        .await
    }

    pub async fn delete(&self, id: SessionId) -> Result<bool> {
        self.request(|response_tx| DialogueCommand::Delete { id, response_tx })
            .await
    }

    pub async fn rename(&self, id: SessionId, title: impl Into<String>) -> Result<bool> {
        let title = title.into();
        self.request(|response_tx| DialogueCommand::Rename {
            id,
            title,
            response_tx,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<DialogueSnapshot> {
        self.request(|response_tx| DialogueCommand::Snapshot { response_tx })
            .await
    }

    pub async fn idle(&self) -> Result<()> {
        self.request(|response_tx| DialogueCommand::Idle { response_tx })
            .await
    }
}

impl DialogueActor {
    async fn run(mut self) {
        let opener = self.controller.ensure_opener();
        self.dispatch(opener);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("Dialogue handle dropped, shutting down");
                        break;
                    }
                },
                Some(finished) = self.finished_rx.recv() => {
                    self.handle_finished(finished);
                }
            }
        }
    }

    fn handle_command(&mut self, command: DialogueCommand) {
        match command {
            DialogueCommand::Navigate {
                navigation,
                response_tx,
            } => {
                let outbound = self.controller.navigate(navigation);
                self.dispatch(outbound);
                self.notify();
                let _ = response_tx.send(());
            }
            DialogueCommand::SetInput { text, response_tx } => {
                self.controller.set_input(text);
                let _ = response_tx.send(());
            }
            DialogueCommand::Submit { response_tx } => {
                let outbound = self.controller.submit();
                let sent = outbound.is_some();
                self.dispatch(outbound);
                if sent {
                    self.notify();
                }
                let _ = response_tx.send(sent);
            }
            DialogueCommand::Save { response_tx } => {
                let id = self.controller.save();
                if id.is_some() {
                    self.notify();
                }
                let _ = response_tx.send(id);
            }
            DialogueCommand::Select {
                selection,
                response_tx,
            } => {
                let (selected, outbound) = self.controller.select(selection);
                self.dispatch(outbound);
                self.notify();
                let _ = response_tx.send(selected);
            }
            DialogueCommand::Delete { id, response_tx } => {
                let (removed, outbound) = self.controller.delete(id);
                self.dispatch(outbound);
                if removed {
                    self.notify();
                }
                let _ = response_tx.send(removed);
            }
            DialogueCommand::Rename {
                id,
                title,
                response_tx,
            } => {
                let renamed = self.controller.rename(id, &title);
                if renamed {
                    self.notify();
                }
                let _ = response_tx.send(renamed);
            }
            DialogueCommand::Snapshot { response_tx } => {
                let _ = response_tx.send(self.controller.snapshot());
            }
            DialogueCommand::Idle { response_tx } => {
                if self.in_flight == 0 {
                    let _ = response_tx.send(());
                } else {
                    self.idle_waiters.push(response_tx);
                }
            }
        }
    }

    fn handle_finished(&mut self, finished: Finished) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let completion = self.controller.complete(finished.ticket, finished.result);
        if completion.applied {
            self.notify();
        }
        if let Some(axes) = completion.axes {
            let _ = self.events_tx.send(DialogueEvent::AxesUpdated(axes));
        }

        if self.in_flight == 0 {
            for waiter in self.idle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    /// Runs `outbound` against the service in the background.
    fn dispatch(&mut self, outbound: Option<Outbound>) {
        let Some(outbound) = outbound else {
            return;
        };

        self.in_flight += 1;
        let service = self.service.clone();
        let finished_tx = self.finished_tx.clone();
        tokio::spawn(async move {
            let Outbound {
                ticket,
                kind,
                request,
            } = outbound;
            let result = service.exchange(request).await;
            match (&result, kind) {
                (Err(e), RequestKind::Opener) => tracing::debug!("Opener request failed: {}", e),
                (Err(e), RequestKind::Turn) => tracing::debug!("Turn request failed: {}", e),
                _ => {}
            }
            let _ = finished_tx.send(Finished { ticket, result });
        });
    }

    fn notify(&self) {
        // No subscribers is fine
        let _ = self.events_tx.send(DialogueEvent::Changed);
    }
}
