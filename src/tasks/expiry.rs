//! Expiry Scheduler Task
//!
//! Background task holding at most one deadline per key and forwarding each
//! ticket to the engine once its deadline passes.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

// == Expiry Ticket ==
/// A request to re-check `key` once `deadline` has passed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpiryTicket {
    pub deadline: Instant,
    pub key: String,
}

// == Pending Deadlines ==
/// Deadlines ordered by time, one per key.
///
/// When a key is scheduled again the earlier of the two deadlines is kept.
/// Firing early is harmless because the engine re-arms live entries.
#[derive(Debug, Default)]
struct PendingDeadlines {
    queue: BTreeSet<(Instant, String)>,
    by_key: HashMap<String, Instant>,
}

impl PendingDeadlines {
    fn schedule(&mut self, ticket: ExpiryTicket) {
        match self.by_key.get(&ticket.key) {
            Some(&pending) if pending <= ticket.deadline => return,
            Some(&pending) => {
                self.queue.remove(&(pending, ticket.key.clone()));
            }
            None => {}
        }
        self.by_key.insert(ticket.key.clone(), ticket.deadline);
        self.queue.insert((ticket.deadline, ticket.key));
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.queue.first().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest ticket if it is due at `now`.
    fn pop_due(&mut self, now: Instant) -> Option<ExpiryTicket> {
        if self.next_deadline()? > now {
            return None;
        }
        let (deadline, key) = self.queue.pop_first()?;
        self.by_key.remove(&key);
        Some(ExpiryTicket { deadline, key })
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Spawns the scheduler loop.
///
/// The task waits for whichever comes first: a new ticket on `inbox` or the
/// earliest pending deadline. Due tickets are sent on `due`; the receiver
/// decides whether the entry expired or needs re-arming.
///
/// # Arguments
/// * `inbox` - Tickets issued by the engine
/// * `due` - Channel the eviction worker listens on
/// * `pending` - Gauge kept equal to the number of scheduled deadlines
///
/// # Returns
/// A JoinHandle for the task. It finishes on its own once every sender of
/// `inbox` is dropped or `due` has no receiver left.
pub fn spawn_expiry_scheduler(
    mut inbox: UnboundedReceiver<ExpiryTicket>,
    due: UnboundedSender<ExpiryTicket>,
    pending: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut deadlines = PendingDeadlines::default();
        debug!("Expiry scheduler started");

        loop {
            tokio::select! {
                received = inbox.recv() => match received {
                    Some(ticket) => deadlines.schedule(ticket),
                    None => break,
                },
                _ = wait_until(deadlines.next_deadline()) => {
                    let now = Instant::now();
                    while let Some(ticket) = deadlines.pop_due(now) {
                        if due.send(ticket).is_err() {
                            info!("Eviction worker gone, stopping expiry scheduler");
                            return;
                        }
                    }
                }
            }
            pending.store(deadlines.len(), Ordering::Relaxed);
        }

        debug!(
            "Expiry scheduler stopped with {} pending deadlines",
            deadlines.len()
        );
    })
}

/// Sleeps until `deadline`, or forever when nothing is scheduled.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
