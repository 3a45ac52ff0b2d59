use tracing::{debug, warn};

use crate::mailer::MailError;
use crate::model::{Appointment, Ms, PendingChange, Session, UserId};
use crate::observability;

use super::NotificationPool;

/// Where a flush request came from. The sweep applies the debounce freshness
/// check; immediate flushes (fast-track) bypass it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOrigin {
    Sweep,
    Immediate,
}

impl NotificationPool {
    /// Merge/notify one (context, appointment) group. Returns the entries to
    /// re-queue; an `Err` means the whole group failed before any recipient
    /// fan-out (generator construction) and its entries are lost.
    ///
    /// The freshness gate is deliberately asymmetric: a lone entry that was
    /// updated too recently gets another round to accumulate edits, but a
    /// multi-entry digest is always sent immediately, even when every member
    /// is equally fresh, and never re-queued.
    pub(super) async fn flush_group(
        &self,
        mut entries: Vec<PendingChange>,
        origin: FlushOrigin,
        now: Ms,
    ) -> Result<Vec<PendingChange>, MailError> {
        match entries.len() {
            0 => Ok(Vec::new()),
            1 => {
                let entry = entries.pop().expect("len checked");
                if origin == FlushOrigin::Sweep
                    && entry.idle_ms(now) < self.config.debounce_interval_ms
                {
                    debug!(
                        context = entry.session.context,
                        appointment = entry.after.id,
                        user = entry.session.user,
                        idle_ms = entry.idle_ms(now),
                        "entry too fresh, keeping another round"
                    );
                    metrics::counter!(observability::REQUEUED_TOTAL).increment(1);
                    return Ok(vec![entry]);
                }
                let PendingChange {
                    before,
                    after,
                    session,
                    on_behalf_of,
                    ..
                } = entry;
                self.notify(before, after, session, on_behalf_of, false).await?;
                Ok(Vec::new())
            }
            _ => {
                // Several users touched the appointment within one window.
                // Representative change: oldest `before`, newest `after`;
                // session/actor metadata from the first (organizer-first)
                // entry, with actor attribution suppressed in the mails.
                let before = entries
                    .iter()
                    .min_by_key(|e| e.first_seen_at)
                    .expect("non-empty")
                    .before
                    .clone();
                let after = entries
                    .iter()
                    .max_by_key(|e| e.last_updated_at)
                    .expect("non-empty")
                    .after
                    .clone();
                let meta = &entries[0];
                let (session, on_behalf_of) = (meta.session, meta.on_behalf_of);

                self.notify(before, after, session, on_behalf_of, true).await?;
                Ok(Vec::new())
            }
        }
    }

    /// Generate and send one notification batch: one mail per recipient.
    /// Compose and transport failures are caught per call, logged, counted
    /// and swallowed — a lost mail is cheaper than a stalled pool.
    async fn notify(
        &self,
        before: Option<Appointment>,
        after: Appointment,
        session: Session,
        on_behalf_of: UserId,
        merged_digest: bool,
    ) -> Result<(), MailError> {
        let mut generator = self
            .generators
            .create(before.as_ref(), &after, &session, on_behalf_of)
            .await?;
        if merged_digest {
            generator.suppress_actor_attribution();
        }

        let is_creation = before.is_none();
        for recipient in generator.recipients() {
            let composed = if is_creation {
                generator.create_mail_for(&recipient).await
            } else {
                generator.update_mail_for(&recipient).await
            };

            let mail = match composed {
                Ok(Some(mail)) => mail,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        context = session.context,
                        appointment = after.id,
                        recipient = %recipient.email,
                        "failed to compose notification: {e}"
                    );
                    metrics::counter!(observability::MAIL_FAILURES_TOTAL).increment(1);
                    continue;
                }
            };

            match self.sender.send_mail(mail, &session).await {
                Ok(()) => {
                    metrics::counter!(observability::MAILS_SENT_TOTAL).increment(1);
                }
                Err(e) => {
                    warn!(
                        context = session.context,
                        appointment = after.id,
                        recipient = %recipient.email,
                        "failed to send notification: {e}"
                    );
                    metrics::counter!(observability::MAIL_FAILURES_TOTAL).increment(1);
                }
            }
        }
        Ok(())
    }
}
