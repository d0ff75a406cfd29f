use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use super::events::SessionEvent;

/// Which timed window a countdown guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownKind {
    /// Time left to start recording after the question was read
    StartWindow,
    /// Time left to finish the spoken answer
    AnswerWindow,
}

/// Result of applying one tick
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Tick from a cancelled or replaced countdown
    Stale,
    Running(u64),
    Expired(CountdownKind),
}

/// Single-shot, cancellable, per-second countdown. At most one is live.
pub(crate) struct Countdown {
    next_id: u64,
    active: Option<ActiveCountdown>,
}

struct ActiveCountdown {
    id: u64,
    kind: CountdownKind,
    remaining: u64,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            active: None,
        }
    }

    /// Start a countdown of `secs` seconds, replacing any running one
    pub fn start(&mut self, kind: CountdownKind, secs: u64, events: mpsc::Sender<SessionEvent>) {
        self.cancel();

        // A zero-length window would never tick, so it would never expire
        let secs = secs.max(1);

        self.next_id += 1;
        let id = self.next_id;
        let period = Duration::from_secs(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            for _ in 0..secs {
                ticker.tick().await;
                if events.send(SessionEvent::Tick { countdown: id }).await.is_err() {
                    break;
                }
            }
        });

        debug!("Countdown {} started: {:?} {}s", id, kind, secs);

        self.active = Some(ActiveCountdown {
            id,
            kind,
            remaining: secs,
            task,
        });
    }

    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
            debug!("Countdown {} cancelled ({}s left)", active.id, active.remaining);
        }
    }

    pub fn tick(&mut self, id: u64) -> TickOutcome {
        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Stale;
        };
        if active.id != id {
            return TickOutcome::Stale;
        }

        active.remaining = active.remaining.saturating_sub(1);
        if active.remaining > 0 {
            return TickOutcome::Running(active.remaining);
        }

        let kind = active.kind;
        self.active = None;
        TickOutcome::Expired(kind)
    }

    pub fn kind(&self) -> Option<CountdownKind> {
        self.active.as_ref().map(|a| a.kind)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}
