//! Anonymous identity assignment
//!
//! [`IdentityMap`] is owned by one batch. It is never global, so concurrent
//! batches cannot collide on PID sequences.

use crate::domain::{AnonymousPid, CanonicalRecord, PatientKey};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Ordered, injective mapping from original patient key to anonymous PID
///
/// PIDs are assigned sequentially from `PID-001` in first-encounter order.
///
/// # Examples
///
/// ```
/// use deident::core::identity::IdentityMap;
/// use deident::domain::PatientKey;
///
/// let mut identities = IdentityMap::new();
/// let jane = PatientKey::new("P-17").unwrap();
/// let grace = PatientKey::new("P-42").unwrap();
///
/// assert_eq!(identities.assign(&jane).as_str(), "PID-001");
/// assert_eq!(identities.assign(&grace).as_str(), "PID-002");
/// assert_eq!(identities.assign(&jane).as_str(), "PID-001");
/// assert_eq!(identities.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    entries: Vec<(PatientKey, AnonymousPid)>,
    positions: HashMap<PatientKey, usize>,
}

/// Records of one patient, by position in the normalized sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientGroup {
    /// The patient's anonymous identifier
    pub pid: AnonymousPid,
    /// Indices of the patient's records
    pub record_indices: Vec<usize>,
}

impl IdentityMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the PID for `key`, assigning the next one on first encounter
    pub fn assign(&mut self, key: &PatientKey) -> AnonymousPid {
        if let Some(&position) = self.positions.get(key) {
            return self.entries[position].1.clone();
        }
        let pid = AnonymousPid::from_sequence(self.entries.len() + 1);
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key.clone(), pid.clone()));
        pid
    }

    /// Assigns PIDs for a whole batch in one serialized pass
    ///
    /// The result is positionally aligned with `records`.
    pub fn assign_all(&mut self, records: &[CanonicalRecord]) -> Vec<AnonymousPid> {
        records
            .iter()
            .map(|record| self.assign(&record.patient_key))
            .collect()
    }

    /// Looks up an existing PID without assigning
    pub fn get(&self, key: &PatientKey) -> Option<&AnonymousPid> {
        self.positions.get(key).map(|&p| &self.entries[p].1)
    }

    /// Whether `pid` was assigned by this map
    pub fn contains_pid(&self, pid: &AnonymousPid) -> bool {
        pid.sequence()
            .checked_sub(1)
            .and_then(|position| self.entries.get(position))
            .is_some_and(|(_, assigned)| assigned == pid)
    }

    /// Number of distinct patients
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no patient has been assigned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&PatientKey, &AnonymousPid)> {
        self.entries.iter().map(|(key, pid)| (key, pid))
    }

    /// Buckets records by patient, in first-encounter order
    pub fn patient_groups(&self, records: &[CanonicalRecord]) -> Vec<PatientGroup> {
        let mut groups: Vec<PatientGroup> = self
            .entries
            .iter()
            .map(|(_, pid)| PatientGroup {
                pid: pid.clone(),
                record_indices: Vec::new(),
            })
            .collect();

        for (index, record) in records.iter().enumerate() {
            if let Some(&position) = self.positions.get(&record.patient_key) {
                groups[position].record_indices.push(index);
            }
        }

        groups.retain(|group| !group.record_indices.is_empty());
        groups
    }
}

impl Serialize for IdentityMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, pid) in &self.entries {
            map.serialize_entry(key.expose(), pid)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;

    fn key(value: &str) -> PatientKey {
        PatientKey::new(value).unwrap()
    }

    fn record(index: usize, patient: &str) -> CanonicalRecord {
        CanonicalRecord::new(index, ResourceKind::Observation, key(patient))
    }

    #[test]
    fn test_repeat_key_keeps_pid() {
        let mut identities = IdentityMap::new();
        let records = vec![record(0, "P-1"), record(1, "P-1")];
        let pids = identities.assign_all(&records);

        assert_eq!(pids[0].as_str(), "PID-001");
        assert_eq!(pids[0], pids[1]);
        assert_eq!(identities.len(), 1);
    }

    #[test]
    fn test_first_encounter_order() {
        let mut identities = IdentityMap::new();
        let records = vec![record(0, "B"), record(1, "A"), record(2, "B"), record(3, "C")];
        let pids = identities.assign_all(&records);
        let pids: Vec<&str> = pids.iter().map(AnonymousPid::as_str).collect();
        assert_eq!(pids, ["PID-001", "PID-002", "PID-001", "PID-003"]);
    }

    #[test]
    fn test_width_grows_past_999() {
        let mut identities = IdentityMap::new();
        let mut last = None;
        for i in 0..1000 {
            last = Some(identities.assign(&key(&format!("P-{i}"))));
        }
        assert_eq!(last.unwrap().as_str(), "PID-1000");
    }

    #[test]
    fn test_contains_pid() {
        let mut identities = IdentityMap::new();
        identities.assign(&key("A"));
        identities.assign(&key("B"));

        assert!(identities.contains_pid(&AnonymousPid::from_sequence(2)));
        assert!(!identities.contains_pid(&AnonymousPid::from_sequence(3)));
        assert!(!identities.contains_pid(&AnonymousPid::new("PID-000").unwrap()));
        assert!(!identities.contains_pid(&AnonymousPid::new("PID-0002").unwrap()));
    }

    #[test]
    fn test_get_does_not_assign() {
        let mut identities = IdentityMap::new();
        assert!(identities.get(&key("A")).is_none());
        identities.assign(&key("A"));
        assert_eq!(identities.get(&key("A")).unwrap().as_str(), "PID-001");
        assert_eq!(identities.len(), 1);
    }

    #[test]
    fn test_patient_groups() {
        let mut identities = IdentityMap::new();
        let records = vec![record(0, "A"), record(1, "B"), record(2, "A")];
        identities.assign_all(&records);

        let groups = identities.patient_groups(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pid.as_str(), "PID-001");
        assert_eq!(groups[0].record_indices, vec![0, 2]);
        assert_eq!(groups[1].record_indices, vec![1]);
    }

    #[test]
    fn test_serializes_in_assignment_order() {
        let mut identities = IdentityMap::new();
        identities.assign(&key("zeta"));
        identities.assign(&key("alpha"));

        let json = serde_json::to_string(&identities).unwrap();
        assert_eq!(json, r#"{"zeta":"PID-001","alpha":"PID-002"}"#);
    }

    #[test]
    fn test_debug_hides_original_keys() {
        let mut identities = IdentityMap::new();
        identities.assign(&key("Jane Namukasa"));
        assert!(!format!("{identities:?}").contains("Namukasa"));
    }
}
