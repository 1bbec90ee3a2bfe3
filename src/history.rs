//! Address/ZIP entry history
//!
//! Persisted to LocalStorage per user and per kind, newest first, capped at
//! `MAX_HISTORY_ENTRIES`. Feeds the autofill suggestions under the inputs.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_HISTORY_ENTRIES;
use crate::storage::{KeyValueStore, StoreError, UserId, load_json, save_json};

/// Which form input a history list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryKind {
    Address,
    Zip,
}

impl HistoryKind {
    /// Storage key suffix
    pub fn key_suffix(&self) -> &'static str {
        match self {
            HistoryKind::Address => "address_history",
            HistoryKind::Zip => "zip_history",
        }
    }

    /// Check that a value is worth remembering for this kind
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            HistoryKind::Address => !value.is_empty(),
            // US ZIP or ZIP+4
            HistoryKind::Zip => {
                let (base, ext) = match value.split_once('-') {
                    Some((base, ext)) => (base, Some(ext)),
                    None => (value, None),
                };
                base.len() == 5
                    && base.chars().all(|c| c.is_ascii_digit())
                    && ext.is_none_or(|e| e.len() == 4 && e.chars().all(|c| c.is_ascii_digit()))
            }
        }
    }
}

/// Ordered history list (newest first, no duplicates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    /// Create empty history
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from stored entries, dropping blanks and later duplicates
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut history = Self::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() || history.position(entry).is_some() {
                continue;
            }
            history.entries.push(entry.to_string());
        }
        history.entries.truncate(MAX_HISTORY_ENTRIES);
        history
    }

    fn position(&self, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| fold_case(e) == fold_case(value))
    }

    /// Record a value as most recent.
    /// Returns false if the value was blank or rejected for `kind`.
    pub fn record(&mut self, kind: HistoryKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || !kind.accepts(value) {
            return false;
        }

        if let Some(i) = self.position(value) {
            self.entries.remove(i);
        }
        self.entries.insert(0, value.to_string());

        // Trim to max size
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        true
    }

    /// Remove a value (case-insensitive). Returns whether it was present.
    pub fn forget(&mut self, value: &str) -> bool {
        match self.position(value.trim()) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Autofill candidates starting with `prefix` (case-insensitive), newest first
    pub fn suggestions(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let prefix = fold_case(prefix.trim());
        self.entries
            .iter()
            .filter(|e| fold_case(e).starts_with(&prefix))
            .take(limit)
            .map(String::as_str)
            .collect()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Most recent entry (if any)
    pub fn latest(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Load a history list for a user
    pub fn load(store: &impl KeyValueStore, user: &UserId, kind: HistoryKind) -> Self {
        match load_json::<Vec<String>>(store, &user.key(kind.key_suffix())) {
            Some(entries) => {
                let history = Self::from_entries(entries);
                log::info!("Loaded {} {:?} history entries", history.len(), kind);
                history
            }
            None => {
                log::debug!("No {kind:?} history found, starting fresh");
                Self::new()
            }
        }
    }

    /// Save a history list for a user
    pub fn save(
        &self,
        store: &impl KeyValueStore,
        user: &UserId,
        kind: HistoryKind,
    ) -> Result<(), StoreError> {
        save_json(store, &user.key(kind.key_suffix()), &self.entries)?;
        log::info!("{kind:?} history saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Case folding shared by de-duplication and autofill
fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_record_moves_to_front_without_duplicates() {
        let mut history = History::new();
        assert!(history.record(HistoryKind::Address, "1 Main St"));
        assert!(history.record(HistoryKind::Address, "22 Elm Rd"));
        assert!(history.record(HistoryKind::Address, "1 MAIN ST"));
        assert_eq!(history.entries(), ["1 MAIN ST", "22 Elm Rd"]);
        assert_eq!(history.latest(), Some("1 MAIN ST"));
    }

    #[test]
    fn test_record_rejects_blank_and_bad_zip() {
        let mut history = History::new();
        assert!(!history.record(HistoryKind::Address, "   "));
        assert!(!history.record(HistoryKind::Zip, "1234"));
        assert!(!history.record(HistoryKind::Zip, "abcde"));
        assert!(!history.record(HistoryKind::Zip, "02139-12"));
        assert!(history.record(HistoryKind::Zip, "02139"));
        assert!(history.record(HistoryKind::Zip, "02139-4307"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_capped() {
        let mut history = History::new();
        for i in 0..(MAX_HISTORY_ENTRIES + 5) {
            history.record(HistoryKind::Zip, &format!("{:05}", 10000 + i));
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.latest(), Some("10014"));
    }

    #[test]
    fn test_save_load_round_trip_preserves_order() {
        let store = MemoryStore::new();
        let user = UserId::new("erin");

        let mut history = History::new();
        for zip in ["10001", "94105", "60601"] {
            history.record(HistoryKind::Zip, zip);
        }
        history.save(&store, &user, HistoryKind::Zip).unwrap();

        let loaded = History::load(&store, &user, HistoryKind::Zip);
        assert_eq!(loaded, history);
        assert_eq!(loaded.entries(), ["60601", "94105", "10001"]);

        // Kinds and users are kept apart
        assert!(History::load(&store, &user, HistoryKind::Address).is_empty());
        assert!(History::load(&store, &UserId::guest(), HistoryKind::Zip).is_empty());
    }

    #[test]
    fn test_load_dedupes_stored_entries() {
        let store = MemoryStore::new();
        store
            .set_item("guest_address_history", r#"["a st", "", "b st", "A St"]"#)
            .unwrap();
        let loaded = History::load(&store, &UserId::guest(), HistoryKind::Address);
        assert_eq!(loaded.entries(), ["a st", "b st"]);
    }

    #[test]
    fn test_load_malformed_is_empty() {
        let store = MemoryStore::new();
        store.set_item("guest_zip_history", "{\"oops\":1}").unwrap();
        assert!(History::load(&store, &UserId::guest(), HistoryKind::Zip).is_empty());
    }

    #[test]
    fn test_suggestions_and_forget() {
        let mut history = History::new();
        for addr in ["12 Oak Ave", "5 Pine Ct", "120 Oak Blvd"] {
            history.record(HistoryKind::Address, addr);
        }
        assert_eq!(history.suggestions("12", 5), vec!["120 Oak Blvd", "12 Oak Ave"]);
        assert_eq!(history.suggestions("", 2).len(), 2);
        assert!(history.forget("5 pine ct"));
        assert!(!history.forget("nowhere"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_non_ascii_case_is_one_entry() {
        let mut history = History::new();
        history.record(HistoryKind::Address, "Élm St");
        history.record(HistoryKind::Address, "élm st");
        assert_eq!(history.entries(), ["élm st"]);
        assert_eq!(history.suggestions("ÉL", 5), vec!["élm st"]);
        assert!(history.forget("ÉLM ST"));
        assert!(history.is_empty());
    }
}
