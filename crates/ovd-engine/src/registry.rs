use parking_lot::Mutex;

pub const MAX_SINKS: usize = 64;

/// One discovered downstream sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub id: u32,
    pub serial: u32,
    pub name: String,
    pub desc: String,
}

/// Mutable table of discovered sinks, maintained from graph registry
/// events on the loop thread and queried from control threads. Guarded
/// by a mutex that is never held across audio work — only short, bounded
/// copies happen under the lock.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Mutex<Vec<SinkRecord>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self { sinks: Mutex::new(Vec::with_capacity(MAX_SINKS)) }
    }

    /// Inserts a newly discovered sink, deduplicating by id. Drops the
    /// insert silently once `MAX_SINKS` is reached, matching the fixed
    /// upper bound on discovered sinks.
    pub fn insert(&self, record: SinkRecord) {
        let mut sinks = self.sinks.lock();
        if let Some(existing) = sinks.iter_mut().find(|s| s.id == record.id) {
            *existing = record;
            return;
        }
        if sinks.len() < MAX_SINKS {
            sinks.push(record);
        }
    }

    /// Removes the sink with the given id, if present, returning its
    /// serial. Swap-removes to keep the table compact.
    pub fn remove_by_id(&self, id: u32) -> Option<u32> {
        let mut sinks = self.sinks.lock();
        let idx = sinks.iter().position(|s| s.id == id)?;
        Some(sinks.swap_remove(idx).serial)
    }

    pub fn count(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn describe(&self, index: usize) -> Option<SinkRecord> {
        self.sinks.lock().get(index).cloned()
    }

    pub fn contains_serial(&self, serial: u32) -> bool {
        self.sinks.lock().iter().any(|s| s.serial == serial)
    }

    /// Exact match on both name and description; partial matches are
    /// never used.
    pub fn find_by_identity(&self, name: &str, desc: &str) -> Option<u32> {
        self.sinks
            .lock()
            .iter()
            .find(|s| s.name == name && s.desc == desc)
            .map(|s| s.serial)
    }

    pub fn first_serial(&self) -> Option<u32> {
        self.sinks.lock().first().map(|s| s.serial)
    }

    pub fn find_by_serial(&self, serial: u32) -> Option<SinkRecord> {
        self.sinks.lock().iter().find(|s| s.serial == serial).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, serial: u32, name: &str, desc: &str) -> SinkRecord {
        SinkRecord { id, serial, name: name.to_string(), desc: desc.to_string() }
    }

    #[test]
    fn insert_deduplicates_by_id() {
        let registry = SinkRegistry::new();
        registry.insert(record(1, 7, "A", "desc A"));
        registry.insert(record(1, 70, "A renamed", "desc A"));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.describe(0).unwrap().serial, 70);
    }

    #[test]
    fn remove_by_id_returns_serial_and_shrinks_table() {
        let registry = SinkRegistry::new();
        registry.insert(record(1, 7, "A", "desc A"));
        registry.insert(record(2, 9, "B", "desc B"));
        let removed = registry.remove_by_id(1);
        assert_eq!(removed, Some(7));
        assert_eq!(registry.count(), 1);
        assert!(registry.contains_serial(9));
        assert!(!registry.contains_serial(7));
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let registry = SinkRegistry::new();
        registry.insert(record(1, 7, "A", "desc A"));
        assert_eq!(registry.remove_by_id(99), None);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn preferred_match_requires_exact_name_and_description() {
        let registry = SinkRegistry::new();
        registry.insert(record(1, 7, "A", "desc A"));
        registry.insert(record(2, 9, "B", "desc B"));
        assert_eq!(registry.find_by_identity("B", "desc B"), Some(9));
        assert_eq!(registry.find_by_identity("B", "desc A"), None);
    }

    #[test]
    fn first_serial_picks_initial_enumeration_order() {
        let registry = SinkRegistry::new();
        registry.insert(record(1, 7, "A", "desc A"));
        registry.insert(record(2, 9, "B", "desc B"));
        assert_eq!(registry.first_serial(), Some(7));
    }
}
