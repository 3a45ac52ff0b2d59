use std::collections::BTreeMap;

use crate::model::{AppointmentId, ContextId, PendingChange, PoolKey, UserId};

/// Flat pending-change store. One entry per (context, appointment, user);
/// `PoolKey`'s ordering keeps all users of one appointment contiguous, so the
/// per-appointment operations are single range scans. No interior locking —
/// the store lives behind [`NotificationPool`](super::NotificationPool)'s
/// exclusive mutex and every caller holds it.
#[derive(Debug, Default)]
pub struct PoolStore {
    entries: BTreeMap<PoolKey, PendingChange>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PoolKey) -> Option<&PendingChange> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &PoolKey) -> Option<&mut PendingChange> {
        self.entries.get_mut(key)
    }

    /// Insert or overwrite.
    pub fn put(&mut self, key: PoolKey, entry: PendingChange) {
        self.entries.insert(key, entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Detach every user's entry for one appointment.
    ///
    /// Ordering contract: an entry flagged as the organizer's comes first,
    /// the rest follow in stable user-id order. Downstream merge logic uses
    /// the first entry as the representative for session/actor metadata and
    /// prefers the organizer's perspective when available.
    pub fn remove_all_for_appointment(
        &mut self,
        context: ContextId,
        appointment: AppointmentId,
    ) -> Vec<PendingChange> {
        let range = PoolKey::new(context, appointment, UserId::MIN)
            ..=PoolKey::new(context, appointment, UserId::MAX);
        let keys: Vec<PoolKey> = self.entries.range(range).map(|(k, _)| *k).collect();

        let mut detached: Vec<PendingChange> = keys
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .collect();
        organizer_first(&mut detached);
        detached
    }

    /// Drain the whole store, leaving it empty.
    pub fn take_all(&mut self) -> BTreeMap<PoolKey, PendingChange> {
        std::mem::take(&mut self.entries)
    }
}

/// Stable partition: organizer entry (if any) to the front, everything else
/// keeps its relative order.
fn organizer_first(entries: &mut [PendingChange]) {
    if let Some(pos) = entries.iter().position(|e| e.is_organizer_entry)
        && pos > 0
    {
        entries[..=pos].rotate_right(1);
    }
}

/// Split a drained store into per-appointment groups, organizer entry first
/// within each group. Input iteration order is key order, so each group is a
/// contiguous run.
pub fn appointment_groups(
    drained: BTreeMap<PoolKey, PendingChange>,
) -> Vec<((ContextId, AppointmentId), Vec<PendingChange>)> {
    let mut groups: Vec<((ContextId, AppointmentId), Vec<PendingChange>)> = Vec::new();
    for (key, entry) in drained {
        let group_key = (key.context, key.appointment);
        match groups.last_mut() {
            Some((k, members)) if *k == group_key => members.push(entry),
            _ => groups.push((group_key, vec![entry])),
        }
    }
    for (_, members) in &mut groups {
        organizer_first(members);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Appointment, Participant, Session, Span};

    fn appointment(context: ContextId, id: AppointmentId, organizer: UserId) -> Appointment {
        Appointment {
            id,
            context,
            organizer,
            principal: organizer,
            title: None,
            span: Span::new(0, 3_600_000),
            location: None,
            participants: vec![Participant::internal(organizer, "org@example.com")],
            modified_at: 0,
        }
    }

    fn entry(context: ContextId, apt: AppointmentId, user: UserId, organizer: UserId) -> PendingChange {
        PendingChange::new(
            None,
            appointment(context, apt, organizer),
            Session::new(context, user),
            0,
        )
    }

    #[test]
    fn put_get_overwrite() {
        let mut store = PoolStore::new();
        let key = PoolKey::new(1, 10, 3);
        assert!(store.get(&key).is_none());

        let first = entry(1, 10, 3, 99);
        store.put(key, first);
        let mut second = entry(1, 10, 3, 99);
        second.first_seen_at = 777;
        store.put(key, second);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).unwrap().first_seen_at, 777);
    }

    #[test]
    fn remove_all_detaches_only_that_appointment() {
        let mut store = PoolStore::new();
        store.put(PoolKey::new(1, 10, 1), entry(1, 10, 1, 99));
        store.put(PoolKey::new(1, 10, 2), entry(1, 10, 2, 99));
        store.put(PoolKey::new(1, 11, 1), entry(1, 11, 1, 99));
        store.put(PoolKey::new(2, 10, 1), entry(2, 10, 1, 99));

        let detached = store.remove_all_for_appointment(1, 10);
        assert_eq!(detached.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.get(&PoolKey::new(1, 11, 1)).is_some());
        assert!(store.get(&PoolKey::new(2, 10, 1)).is_some());
    }

    #[test]
    fn remove_all_orders_organizer_first() {
        let mut store = PoolStore::new();
        // users 1..4 pending; user 3 is the organizer
        for user in 1..=4 {
            store.put(PoolKey::new(1, 10, user), entry(1, 10, user, 3));
        }

        let detached = store.remove_all_for_appointment(1, 10);
        assert_eq!(detached.len(), 4);
        assert!(detached[0].is_organizer_entry);
        assert_eq!(detached[0].session.user, 3);
        // remaining entries keep stable user order
        let rest: Vec<UserId> = detached[1..].iter().map(|e| e.session.user).collect();
        assert_eq!(rest, vec![1, 2, 4]);
    }

    #[test]
    fn remove_all_without_organizer_keeps_user_order() {
        let mut store = PoolStore::new();
        for user in [5, 2, 9] {
            store.put(PoolKey::new(1, 10, user), entry(1, 10, user, 1_000));
        }
        let detached = store.remove_all_for_appointment(1, 10);
        let users: Vec<UserId> = detached.iter().map(|e| e.session.user).collect();
        assert_eq!(users, vec![2, 5, 9]);
    }

    #[test]
    fn remove_all_on_unknown_appointment_is_empty() {
        let mut store = PoolStore::new();
        store.put(PoolKey::new(1, 10, 1), entry(1, 10, 1, 99));
        assert!(store.remove_all_for_appointment(1, 999).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn take_all_empties_the_store() {
        let mut store = PoolStore::new();
        store.put(PoolKey::new(1, 10, 1), entry(1, 10, 1, 99));
        store.put(PoolKey::new(2, 20, 2), entry(2, 20, 2, 99));

        let drained = store.take_all();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn groups_split_on_context_and_appointment() {
        let mut store = PoolStore::new();
        store.put(PoolKey::new(1, 10, 1), entry(1, 10, 1, 99));
        store.put(PoolKey::new(1, 10, 2), entry(1, 10, 2, 99));
        store.put(PoolKey::new(1, 11, 1), entry(1, 11, 1, 99));
        store.put(PoolKey::new(2, 10, 7), entry(2, 10, 7, 99));

        let groups = appointment_groups(store.take_all());
        let keys: Vec<(ContextId, AppointmentId)> = groups.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![(1, 10), (1, 11), (2, 10)]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 1);
        assert_eq!(groups[2].1.len(), 1);
    }

    #[test]
    fn groups_apply_organizer_first_ordering() {
        let mut store = PoolStore::new();
        for user in 1..=3 {
            store.put(PoolKey::new(1, 10, user), entry(1, 10, user, 2));
        }
        let groups = appointment_groups(store.take_all());
        assert_eq!(groups[0].1[0].session.user, 2);
    }
}
