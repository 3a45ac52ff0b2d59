mod coalesce;
mod store;

pub use coalesce::FlushOrigin;
pub use store::PoolStore;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::PoolConfig;
use crate::mailer::{MailGeneratorFactory, MailSender};
use crate::model::{Appointment, PendingChange, PoolKey, Session};
use crate::observability;

use store::appointment_groups;

/// Debouncing notification pool.
///
/// Calendar-mutation code calls [`enqueue`](Self::enqueue) /
/// [`fast_track`](Self::fast_track) / [`drop_pending`](Self::drop_pending)
/// synchronously inside the request that performs the mutation; only
/// [`sweep`](Self::sweep) (driven by [`run_sweeper`](crate::sweeper::run_sweeper))
/// and `fast_track` ever talk to the mail collaborators.
///
/// One mutex guards the whole store — enqueue, fast-track, drop and the
/// sweep are mutually exclusive, and the lock is held across collaborator
/// awaits. A slow sender therefore stalls all pool access for its duration;
/// with the expected low cardinality of concurrently pending appointments
/// that simplicity wins over per-key locking.
pub struct NotificationPool {
    inner: Mutex<PoolStore>,
    pub(crate) config: PoolConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) generators: Arc<dyn MailGeneratorFactory>,
    pub(crate) sender: Arc<dyn MailSender>,
}

impl NotificationPool {
    pub fn new(
        config: PoolConfig,
        generators: Arc<dyn MailGeneratorFactory>,
        sender: Arc<dyn MailSender>,
    ) -> Self {
        Self::with_clock(config, generators, sender, Arc::new(SystemClock))
    }

    /// Construction with an explicit time source, for deterministic tests.
    pub fn with_clock(
        config: PoolConfig,
        generators: Arc<dyn MailGeneratorFactory>,
        sender: Arc<dyn MailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Mutex::new(PoolStore::new()),
            config,
            clock,
            generators,
            sender,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Accumulate one change. Pure in-memory bookkeeping, no notification
    /// side effects, returns as soon as the lock is free.
    ///
    /// Repeated enqueues for the same (context, appointment, user) collapse
    /// into a single entry whose `before`/`after` pair spans the whole
    /// uncommitted window: the first call fixes `before`, every later call
    /// only replaces `after` and bumps the debounce clock.
    pub async fn enqueue(&self, before: Option<Appointment>, after: Appointment, session: Session) {
        let determining = before.as_ref().unwrap_or(&after);
        let key = PoolKey::new(session.context, determining.id, session.user);
        let now = self.clock.now_ms();

        let mut store = self.inner.lock().await;
        if let Some(existing) = store.get_mut(&key) {
            existing.absorb(after, now);
            metrics::counter!(observability::MERGED_TOTAL).increment(1);
        } else {
            store.put(key, PendingChange::new(before, after, session, now));
        }
        metrics::counter!(observability::ENQUEUED_TOTAL).increment(1);
        metrics::gauge!(observability::PENDING_ENTRIES).set(store.len() as f64);
    }

    /// Flush everything pending for one appointment right now, across all
    /// users, bypassing the freshness check. For code paths that know no
    /// further edits will coalesce (an explicit save-and-close) and want the
    /// notification out without waiting for the next sweep tick.
    ///
    /// Mail generation and sending run on the caller's task, under the lock.
    pub async fn fast_track(&self, appointment: &Appointment, session: &Session) {
        let now = self.clock.now_ms();
        let mut store = self.inner.lock().await;
        let entries = store.remove_all_for_appointment(session.context, appointment.id);
        if entries.is_empty() {
            return;
        }
        metrics::counter!(observability::FAST_TRACKED_TOTAL).increment(1);

        match self.flush_group(entries, FlushOrigin::Immediate, now).await {
            Ok(requeue) => {
                // Immediate flushes never defer, but re-insert defensively
                // should that ever change.
                for entry in requeue {
                    store.put(entry.key(), entry);
                }
            }
            Err(e) => {
                warn!(
                    context = session.context,
                    appointment = appointment.id,
                    "fast-track flush failed: {e}"
                );
                metrics::counter!(observability::MAIL_FAILURES_TOTAL).increment(1);
            }
        }
        metrics::gauge!(observability::PENDING_ENTRIES).set(store.len() as f64);
    }

    /// Discard everything pending for one appointment without notifying
    /// anyone. For outcomes that make the notification meaningless, e.g. the
    /// creation that produced the entries was rolled back.
    pub async fn drop_pending(&self, appointment: &Appointment, session: &Session) {
        let mut store = self.inner.lock().await;
        let removed = store.remove_all_for_appointment(session.context, appointment.id);
        if removed.is_empty() {
            return;
        }
        debug!(
            context = session.context,
            appointment = appointment.id,
            entries = removed.len(),
            "dropped pending changes without notification"
        );
        metrics::counter!(observability::DROPPED_TOTAL).increment(removed.len() as u64);
        metrics::gauge!(observability::PENDING_ENTRIES).set(store.len() as f64);
    }

    /// One periodic flush pass over the entire pool.
    ///
    /// The store is drained up front, so "the pool is cleared no matter what
    /// happens" holds by construction: entries the coalescer neither sends
    /// nor re-queues are gone (best-effort, at-most-once). Failure isolation
    /// is per group — one appointment's failure is logged and the remaining
    /// groups still flush within the same sweep.
    pub async fn sweep(&self) {
        let now = self.clock.now_ms();
        let mut store = self.inner.lock().await;
        if store.is_empty() {
            return;
        }

        let started = Instant::now();
        metrics::counter!(observability::SWEEPS_TOTAL).increment(1);

        let groups = appointment_groups(store.take_all());
        let mut requeue: Vec<PendingChange> = Vec::new();

        for ((context, appointment), entries) in groups {
            match self.flush_group(entries, FlushOrigin::Sweep, now).await {
                Ok(mut kept) => requeue.append(&mut kept),
                Err(e) => {
                    warn!(context, appointment, "sweep flush failed, entries lost: {e}");
                    metrics::counter!(observability::MAIL_FAILURES_TOTAL).increment(1);
                }
            }
        }

        // Timestamps survive the round trip — the debounce clock keeps
        // running from the entry's last merge, not from the sweep.
        for entry in requeue {
            store.put(entry.key(), entry);
        }

        metrics::gauge!(observability::PENDING_ENTRIES).set(store.len() as f64);
        metrics::histogram!(observability::SWEEP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
    }

    /// Number of entries currently pending.
    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
