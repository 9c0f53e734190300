// ── Feed-assist coordinator ──
//
// The accessory assists at most one slot at a time. The active slot in
// the store changes only after the host confirmed the command.

use tracing::{info, warn};

use crate::command::{AceCommand, CommandDispatcher, CommandOutcome};
use crate::notice::Notice;
use crate::store::StatusStore;

/// Result of a feed-assist operation, which may span several commands.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedAssistOutcome {
    pub outcomes: Vec<CommandOutcome>,
    pub success: bool,
    /// Active slot after the operation.
    pub active_slot: Option<u8>,
}

/// Borrowing view over the dispatcher and store for one operation.
pub struct FeedAssistCoordinator<'a> {
    dispatcher: &'a CommandDispatcher,
    store: &'a StatusStore,
}

impl<'a> FeedAssistCoordinator<'a> {
    pub fn new(dispatcher: &'a CommandDispatcher, store: &'a StatusStore) -> Self {
        Self { dispatcher, store }
    }

    pub fn active_slot(&self) -> Option<u8> {
        self.store.snapshot().feed_assist.active_slot
    }

    /// Disable when `index` is active, otherwise move assist to `index`.
    pub async fn toggle(&self, index: u8) -> FeedAssistOutcome {
        if self.active_slot() == Some(index) {
            return self.disable(index).await;
        }
        self.enable(index).await
    }

    /// Move assist to `index`. A different active slot is released first;
    /// the enable is sent even if that release fails.
    pub async fn enable(&self, index: u8) -> FeedAssistOutcome {
        let mut outcomes = Vec::with_capacity(2);
        if let Some(previous) = self.active_slot().filter(|&p| p != index) {
            let released = self.send_disable(previous).await;
            if !released.is_success() {
                warn!(slot = previous, "could not release feed assist, enabling anyway");
            }
            outcomes.push(released);
        }

        let outcome = self
            .dispatcher
            .dispatch(&AceCommand::EnableFeedAssist { index })
            .await;
        let success = outcome.is_success();
        if success {
            self.store.set_active_feed_assist(Some(index));
            info!(slot = index, "feed assist enabled");
            self.dispatcher.notify(Notice::FeedAssistEnabled { index });
        }
        outcomes.push(outcome);
        self.finish(outcomes, success)
    }

    pub async fn disable(&self, index: u8) -> FeedAssistOutcome {
        let outcome = self.send_disable(index).await;
        let success = outcome.is_success();
        self.finish(vec![outcome], success)
    }

    async fn send_disable(&self, index: u8) -> CommandOutcome {
        let outcome = self
            .dispatcher
            .dispatch(&AceCommand::DisableFeedAssist { index })
            .await;
        if outcome.is_success() {
            self.store.set_active_feed_assist(None);
            info!(slot = index, "feed assist disabled");
            self.dispatcher.notify(Notice::FeedAssistDisabled { index });
        }
        outcome
    }

    /// Send a disable for every slot in order, whatever each one returns.
    /// Succeeds if any of them did.
    pub async fn disable_all(&self) -> FeedAssistOutcome {
        let mut outcomes = Vec::with_capacity(usize::from(self.dispatcher.slot_count()));
        for index in 0..self.dispatcher.slot_count() {
            outcomes.push(
                self.dispatcher
                    .dispatch(&AceCommand::DisableFeedAssist { index })
                    .await,
            );
        }

        let any_success = outcomes.iter().any(CommandOutcome::is_success);
        if any_success {
            self.store.set_active_feed_assist(None);
            self.dispatcher.notify(Notice::FeedAssistAllDisabled);
        } else {
            warn!("no slot accepted the feed assist disable");
            self.dispatcher.notify(Notice::FeedAssistAllDisableFailed);
        }
        self.finish(outcomes, any_success)
    }

    /// Tool change that records the tool for feed-assist inference.
    pub async fn change_tool(&self, tool: i32) -> CommandOutcome {
        let outcome = self.dispatcher.dispatch(&AceCommand::ChangeTool { tool }).await;
        if outcome.is_success() {
            self.store.set_commanded_tool(tool);
        }
        outcome
    }

    fn finish(&self, outcomes: Vec<CommandOutcome>, success: bool) -> FeedAssistOutcome {
        FeedAssistOutcome {
            outcomes,
            success,
            active_slot: self.active_slot(),
        }
    }
}
