//! Event scheduling for a live engine.
//!
//! Content edits are applied as soon as they arrive. Structural events are
//! debounced on the trailing edge, so a burst of renames becomes one rebuild,
//! and rebuilds are single-flight: anything structural that arrives while a
//! rebuild is running folds into one rerun afterwards.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::engine::{CountEngine, RefreshSummary, StructuralChange, UpdateOutcome};
use crate::error::VaultError;
use crate::vault::VaultSource;

/// Trailing-edge debounce timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// A debouncer that fires `window` after the last touch.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record an event, pushing the deadline out by a full window.
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// When the pending burst settles, if one is pending.
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a burst is waiting to fire.
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clear the pending burst, returning whether there was one.
    pub const fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

/// Single-flight guard for rebuilds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildGate {
    running: bool,
    rerun: bool,
}

impl RebuildGate {
    /// Ask to start a rebuild.
    ///
    /// Returns `true` when the caller should start one now. While a rebuild
    /// is running, the request is folded into a single trailing rerun.
    pub const fn request(&mut self) -> bool {
        if self.running {
            self.rerun = true;
            false
        } else {
            self.running = true;
            true
        }
    }

    /// Report that the running rebuild finished.
    ///
    /// Returns `true` when a rerun was requested meanwhile; the gate then
    /// stays held for it.
    pub const fn finish(&mut self) -> bool {
        if self.rerun {
            self.rerun = false;
            true
        } else {
            self.running = false;
            false
        }
    }

    /// Whether a rebuild is in flight.
    pub const fn is_running(&self) -> bool {
        self.running
    }
}

/// A change reported by whatever watches the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A note's content changed.
    Modified(String),
    /// The tree changed shape.
    Structural(StructuralChange),
    /// Recount everything, e.g. after the watcher lost events.
    Rescan,
}

/// Something the driver finished.
#[derive(Debug)]
pub enum Settled {
    /// A single note was recounted.
    File(UpdateOutcome),
    /// A rebuild completed.
    Rebuild(RefreshSummary),
    /// A rebuild could not list the vault.
    Failed(VaultError),
}

/// Drive `engine` from `events` until the channel closes.
///
/// `on_settled` sees the engine after each update or rebuild, which is the
/// place to persist or redisplay. A structural burst still pending when the
/// channel closes is flushed before returning.
pub async fn run<S, F>(
    engine: &mut CountEngine<S>,
    mut events: mpsc::Receiver<ChangeEvent>,
    window: Duration,
    mut on_settled: F,
) where
    S: VaultSource,
    F: FnMut(&CountEngine<S>, Settled),
{
    let mut debouncer = Debouncer::new(window);
    let mut gate = RebuildGate::default();
    let mut open = true;

    while open {
        let deadline = debouncer.deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(ChangeEvent::Modified(path)) => {
                    let outcome = engine.on_file_changed(&path).await;
                    on_settled(engine, Settled::File(outcome));
                }
                Some(ChangeEvent::Structural(change)) => {
                    tracing::debug!(?change, "structural change queued");
                    debouncer.touch();
                }
                Some(ChangeEvent::Rescan) => debouncer.touch(),
                None => open = false,
            },
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                debouncer.take();
                open = rebuild_cycle(engine, &mut events, &mut gate, &mut on_settled).await;
            }
        }
    }

    if debouncer.take() {
        rebuild_cycle(engine, &mut events, &mut gate, &mut on_settled).await;
    }
}

/// Run one rebuild plus any reruns requested while it was in flight.
///
/// Edits that arrive mid-scan are applied once the cycle is done. Returns
/// whether the event channel is still open.
async fn rebuild_cycle<S, F>(
    engine: &mut CountEngine<S>,
    events: &mut mpsc::Receiver<ChangeEvent>,
    gate: &mut RebuildGate,
    on_settled: &mut F,
) -> bool
where
    S: VaultSource,
    F: FnMut(&CountEngine<S>, Settled),
{
    let mut open = true;
    let mut deferred = BTreeSet::new();

    if !gate.request() {
        return open;
    }
    loop {
        let ticket = engine.begin_rebuild();
        let result = {
            let scan = engine.scan(ticket);
            tokio::pin!(scan);
            loop {
                tokio::select! {
                    biased;
                    result = &mut scan => break result,
                    event = events.recv(), if open => match event {
                        Some(ChangeEvent::Modified(path)) => {
                            deferred.insert(path);
                        }
                        Some(_) => {
                            gate.request();
                        }
                        None => open = false,
                    },
                }
            }
        };

        let settled = match result {
            Ok(rebuild) => Settled::Rebuild(engine.commit(rebuild)),
            Err(e) => {
                tracing::error!(error = %e, "rebuild failed");
                Settled::Failed(e)
            }
        };
        on_settled(engine, settled);

        if !gate.finish() {
            break;
        }
        tracing::debug!("rerunning rebuild requested mid-flight");
    }

    for path in deferred {
        let outcome = engine.on_file_changed(&path).await;
        on_settled(engine, Settled::File(outcome));
    }
    open
}
