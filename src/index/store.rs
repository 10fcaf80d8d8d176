use std::collections::HashMap;

use crate::model::Advisory;

/// Immutable-after-build map from primary identifier to advisory.
///
/// Advisories are kept in insertion order so that `list` and `search` are
/// deterministic and the stable sort has a well-defined tie order.
#[derive(Debug, Default)]
pub struct AdvisoryStore {
    advisories: Vec<Advisory>,
    positions: HashMap<String, usize>,
}

impl AdvisoryStore {
    /// Inserts an advisory. A duplicate identifier replaces the earlier
    /// entry in place and returns it.
    pub(crate) fn insert(&mut self, advisory: Advisory) -> Option<Advisory> {
        match self.positions.get(&advisory.ghsa_id) {
            Some(&pos) => Some(std::mem::replace(&mut self.advisories[pos], advisory)),
            None => {
                self.positions
                    .insert(advisory.ghsa_id.clone(), self.advisories.len());
                self.advisories.push(advisory);
                None
            }
        }
    }

    pub fn get(&self, ghsa_id: &str) -> Option<&Advisory> {
        self.positions.get(ghsa_id).map(|&pos| &self.advisories[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Advisory> {
        self.advisories.iter()
    }

    pub fn len(&self) -> usize {
        self.advisories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OsvRecord;
    use crate::normalize::normalize;

    fn advisory(id: &str, summary: &str) -> Advisory {
        let record: OsvRecord =
            serde_json::from_value(serde_json::json!({ "id": id, "summary": summary })).unwrap();
        normalize(&record)
    }

    #[test]
    fn test_duplicate_replaces_in_place() {
        let mut store = AdvisoryStore::default();
        assert!(store.insert(advisory("GHSA-a", "old")).is_none());
        store.insert(advisory("GHSA-b", "other"));
        let replaced = store.insert(advisory("GHSA-a", "new"));

        assert_eq!(replaced.map(|a| a.summary), Some("old".to_string()));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("GHSA-a").unwrap().summary, "new");
        let order: Vec<&str> = store.iter().map(|a| a.ghsa_id.as_str()).collect();
        assert_eq!(order, vec!["GHSA-a", "GHSA-b"]);
    }
}
