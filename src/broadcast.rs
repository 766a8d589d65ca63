use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use teloxide::utils::markdown;

use crate::bot::commands::news_request;
use crate::bot::{AppState, Reply};
use crate::error::ProviderError;

/// Why a firing sent nothing.
#[derive(Debug)]
pub enum SkipReason {
    /// Another firing was still in progress.
    AlreadyFiring,
    NoSubscribers,
    Provider(ProviderError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum BroadcastOutcome {
    Sent(BroadcastReport),
    Skipped(SkipReason),
}

/// The daily news fan-out. Idle until [`BroadcastTask::fire`] is called;
/// the timer lives in [`crate::schedule`].
pub struct BroadcastTask {
    state: Arc<AppState>,
    firing: AtomicBool,
}

impl BroadcastTask {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            firing: AtomicBool::new(false),
        }
    }

    /// Generate one news summary and send it to every current subscriber.
    ///
    /// Never fails: provider errors skip the run, per-recipient delivery
    /// errors are logged and counted.
    pub async fn fire(&self) -> BroadcastOutcome {
        if self.firing.swap(true, Ordering::AcqRel) {
            tracing::warn!("Broadcast already in progress, skipping this firing");
            return BroadcastOutcome::Skipped(SkipReason::AlreadyFiring);
        }
        let outcome = {
            let _idle = ResetOnDrop(&self.firing);
            self.run().await
        };

        match &outcome {
            BroadcastOutcome::Sent(report) => tracing::info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                "📰 Daily broadcast finished"
            ),
            BroadcastOutcome::Skipped(SkipReason::Provider(e)) => {
                tracing::error!("Daily broadcast skipped, generation failed: {}", e)
            }
            BroadcastOutcome::Skipped(reason) => {
                tracing::info!("Daily broadcast skipped: {:?}", reason)
            }
        }
        outcome
    }

    async fn run(&self) -> BroadcastOutcome {
        let recipients: Vec<_> = self.state.subscribers.all().await.collect();
        if recipients.is_empty() {
            return BroadcastOutcome::Skipped(SkipReason::NoSubscribers);
        }

        let summary = match self.state.llm.generate(&news_request(&self.state)).await {
            Ok(text) => text,
            Err(e) => return BroadcastOutcome::Skipped(SkipReason::Provider(e)),
        };
        let message = format_broadcast(&summary);

        let mut report = BroadcastReport::default();
        for id in recipients {
            report.attempted += 1;
            match self.state.messenger.send(id.0, &message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Broadcast to {} failed: {}", id, e);
                }
            }
        }
        BroadcastOutcome::Sent(report)
    }
}

/// Returns the task to idle even if a firing unwinds.
struct ResetOnDrop<'a>(&'a AtomicBool);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `📰 *Today's News Update*:` header followed by the escaped summary.
pub fn format_broadcast(summary: &str) -> Reply {
    Reply::markdown(format!(
        "📰 {}:\n{}",
        markdown::bold(&markdown::escape("Today's News Update")),
        markdown::escape(summary)
    ))
}
