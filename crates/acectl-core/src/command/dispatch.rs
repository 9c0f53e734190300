// ── Command dispatcher ──
//
// One round trip per command. Successful commands schedule a delayed
// reconciliation pull; the caller gets its outcome without waiting for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use acectl_api::AceClient;

use super::{Ack, AceCommand, CommandFailure, CommandOutcome, PendingCommand, interpret_response};
use crate::notice::Notice;

/// A status pull requested after a command settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub command: String,
}

/// Sends commands and reports their outcomes.
pub struct CommandDispatcher {
    client: Arc<AceClient>,
    notices: broadcast::Sender<Notice>,
    reconcile_tx: mpsc::UnboundedSender<ReconcileRequest>,
    reconcile_delay: Duration,
    slot_count: u8,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<AceClient>,
        notices: broadcast::Sender<Notice>,
        reconcile_tx: mpsc::UnboundedSender<ReconcileRequest>,
        reconcile_delay: Duration,
        slot_count: u8,
    ) -> Self {
        Self {
            client,
            notices,
            reconcile_tx,
            reconcile_delay,
            slot_count,
        }
    }

    pub fn slot_count(&self) -> u8 {
        self.slot_count
    }

    /// Validate, send and classify one command.
    ///
    /// Emits exactly one notice. A validation failure never touches the
    /// network.
    pub async fn dispatch(&self, command: &AceCommand) -> CommandOutcome {
        let pending = PendingCommand::new(command);

        if let Err(message) = command.validate(self.slot_count) {
            warn!(command = %command, %message, "command rejected before dispatch");
            self.notify(Notice::ValidationFailed {
                command: pending.name.clone(),
                message: message.clone(),
            });
            return CommandOutcome {
                command: pending,
                result: Err(CommandFailure::Validation(message)),
            };
        }

        debug!(command = %command, "dispatching");
        let result = match self.client.send_command(&command.to_request()).await {
            Ok(reply) => interpret_response(&reply),
            Err(e) => {
                warn!(command = %command, error = %e, "command request failed");
                Err(CommandFailure::Transport(e.to_string()))
            }
        };

        match result {
            Ok(Ack::Confirmed) => {
                info!(command = %pending.name, "command confirmed");
                self.notify(Notice::CommandSucceeded {
                    command: pending.name.clone(),
                });
                self.schedule_reconcile(&pending.name);
            }
            Ok(Ack::Sent) => {
                info!(command = %pending.name, "command sent without reply body");
                self.notify(Notice::CommandSent {
                    command: pending.name.clone(),
                });
                self.schedule_reconcile(&pending.name);
            }
            Err(ref failure) => {
                warn!(command = %pending.name, error = %failure, "command failed");
                self.notify(Notice::CommandFailed {
                    command: pending.name.clone(),
                    message: failure.message().to_owned(),
                });
            }
        }

        CommandOutcome {
            command: pending,
            result,
        }
    }

    fn schedule_reconcile(&self, command: &str) {
        let tx = self.reconcile_tx.clone();
        let delay = self.reconcile_delay;
        let request = ReconcileRequest {
            command: command.to_owned(),
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the engine stopped; nothing to reconcile.
            let _ = tx.send(request);
        });
    }

    pub(crate) fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}
