use serde::{Deserialize, Serialize};

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Calendar context (tenant) id.
pub type ContextId = i32;
/// Appointment object id, unique within a context.
pub type AppointmentId = i32;
/// Internal user id, unique within a context.
pub type UserId = i32;

/// Half-open interval `[start, end)` — the appointment's scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }
}

/// One participant of an appointment. External participants carry no user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: Option<UserId>,
    pub email: String,
}

impl Participant {
    pub fn internal(user: UserId, email: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            email: email.into(),
        }
    }

    pub fn external(email: impl Into<String>) -> Self {
        Self {
            user: None,
            email: email.into(),
        }
    }
}

/// Immutable snapshot of an appointment at one point in time.
///
/// `principal` is the user the mutation was performed for — it differs from
/// the acting user when the change goes through a shared or delegated folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub context: ContextId,
    pub organizer: UserId,
    pub principal: UserId,
    pub title: Option<String>,
    pub span: Span,
    pub location: Option<String>,
    pub participants: Vec<Participant>,
    pub modified_at: Ms,
}

/// The session whose action produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub context: ContextId,
    pub user: UserId,
}

impl Session {
    pub fn new(context: ContextId, user: UserId) -> Self {
        Self { context, user }
    }
}

/// Composite pool key. The `Ord` derive is load-bearing: keys sort by
/// (context, appointment, user), so all entries for one appointment are
/// contiguous in a `BTreeMap` and one range query retrieves them in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub context: ContextId,
    pub appointment: AppointmentId,
    pub user: UserId,
}

impl PoolKey {
    pub fn new(context: ContextId, appointment: AppointmentId, user: UserId) -> Self {
        Self {
            context,
            appointment,
            user,
        }
    }
}

/// One accumulated edit awaiting flush.
///
/// `before` is the state immediately prior to the *first* uncommitted edit of
/// the current batch and is never overwritten by later merges; `after` always
/// tracks the newest snapshot. `before == None` means the batch started with
/// the appointment's creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub before: Option<Appointment>,
    pub after: Appointment,
    pub session: Session,
    pub on_behalf_of: UserId,
    /// True if the determining snapshot's organizer is the acting user.
    /// Computed once at creation, never recomputed on merge.
    pub is_organizer_entry: bool,
    pub first_seen_at: Ms,
    pub last_updated_at: Ms,
}

impl PendingChange {
    /// Build a fresh entry for the first enqueue on a key.
    ///
    /// The determining snapshot is `before` when present, else `after` —
    /// the same snapshot that supplies the appointment id in `enqueue`.
    pub fn new(before: Option<Appointment>, after: Appointment, session: Session, now: Ms) -> Self {
        let determining = before.as_ref().unwrap_or(&after);
        let on_behalf_of = determining.principal;
        let is_organizer_entry = determining.organizer == session.user;
        Self {
            before,
            after,
            session,
            on_behalf_of,
            is_organizer_entry,
            first_seen_at: now,
            last_updated_at: now,
        }
    }

    /// Merge a newer snapshot into this entry: replace `after`, bump the
    /// debounce clock. Everything else is preserved.
    pub fn absorb(&mut self, after: Appointment, now: Ms) {
        self.after = after;
        self.last_updated_at = now;
    }

    /// Age of the entry relative to its last merge.
    pub fn idle_ms(&self, now: Ms) -> Ms {
        now - self.last_updated_at
    }

    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.session.context, self.after.id, self.session.user)
    }
}
