use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Shared liveness registry: member id to believed online/offline state.
///
/// Exactly one entry per configured member once [`initialize`] has run;
/// entries are only flipped afterwards, never added or removed. Every
/// access takes the lock for the duration of one read or one write, so
/// there is no read-modify-write window. During steady state only the
/// owning acceptor writes its own key; [`set_online`] from anywhere else
/// is a test hook, not a protocol guarantee.
///
/// [`initialize`]: Registry::initialize
/// [`set_online`]: Registry::set_online
#[derive(Clone, Default)]
pub struct Registry {
    members: Arc<Mutex<HashMap<u64, bool>>>,
}

impl Registry {
    /// Empty registry. Call [`initialize`](Registry::initialize) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one entry per member id `1..=n`, all online.
    pub fn initialize(&self, n: u64) {
        let mut members = self.members.lock().unwrap();
        for id in 1..=n {
            members.insert(id, true);
        }
    }

    /// Unconditional overwrite of a member's liveness flag.
    pub fn set_online(&self, id: u64, online: bool) {
        self.members.lock().unwrap().insert(id, online);
    }

    /// Whether a member is believed online. Unknown ids read as offline.
    pub fn is_online(&self, id: u64) -> bool {
        *self.members.lock().unwrap().get(&id).unwrap_or(&false)
    }

    /// Number of members currently believed online.
    pub fn online_count(&self) -> usize {
        self.members.lock().unwrap().values().filter(|&&v| v).count()
    }

    /// One-shot snapshot of online member ids, ascending. A member that
    /// flips offline after the snapshot is still contacted by the caller.
    pub fn online_members(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, &v)| v)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn initialize_marks_all_online() {
        let r = Registry::new();
        r.initialize(5);
        assert_eq!(r.online_count(), 5);
        assert_eq!(r.online_members(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn flips_are_visible() {
        let r = Registry::new();
        r.initialize(3);
        r.set_online(2, false);
        assert!(!r.is_online(2));
        assert_eq!(r.online_members(), vec![1, 3]);
        r.set_online(2, true);
        assert_eq!(r.online_count(), 3);
    }

    #[test]
    fn unknown_member_reads_offline() {
        let r = Registry::new();
        r.initialize(3);
        assert!(!r.is_online(42));
    }

    #[test]
    fn concurrent_writers_to_distinct_keys_lose_nothing() {
        let r = Registry::new();
        r.initialize(8);
        let mut handles = Vec::new();
        for id in 1..=8 {
            let r = r.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    r.set_online(id, false);
                    r.set_online(id, true);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(r.online_count(), 8);
    }
}
