//! VLAN reconciliation engine.
//!
//! Compares a subject VLAN list against a source-of-truth (SOT) list and
//! classifies every record into one of four buckets:
//!
//! ```text
//! synced       SOT record has an identical subject record
//! altered      SOT record shares a tag with a subject record, other fields differ
//! non_present  SOT record has no subject record with its tag
//! removed      subject record was not claimed by any SOT record
//! ```
//!
//! Matching is greedy in SOT order. For each SOT record the engine first looks
//! for an unclaimed exact match, then for an unclaimed record with the same
//! tag. A claimed subject record is never matched twice. Duplicate tags inside
//! one list are not collapsed, so the outcome for such input depends on list
//! order.
//!
//! Exact matches are searched across the whole unclaimed subject list before
//! any tag-only match is considered. A single pass taking the first record
//! that satisfies either rule would pair a SOT record with an earlier
//! same-tag record even when an identical one follows; with unique tags the
//! two orders give the same result.

use serde::Serialize;

use crate::models::{VlanRecord, VlanRole};

/// SOT record matched by tag to a subject record whose other fields differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlteredVlan<S, T> {
    /// Values that must be written (taken from the source of truth)
    pub desired: T,
    /// Subject record being replaced, kept for its identity
    pub current: S,
}

/// Result of one reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanDiff<S, T> {
    /// Role of the source-of-truth list
    pub sot_role: VlanRole,
    pub synced: Vec<T>,
    pub altered: Vec<AlteredVlan<S, T>>,
    pub non_present: Vec<T>,
    pub removed: Vec<S>,
}

/// Per-category counts of a [`VlanDiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub sot_role: VlanRole,
    pub synced: usize,
    pub altered: usize,
    pub non_present: usize,
    pub removed: usize,
}

impl DiffSummary {
    /// Number of records that need a write on the subject side.
    pub const fn pending_changes(&self) -> usize {
        self.altered + self.non_present + self.removed
    }
}

impl<S, T> VlanDiff<S, T> {
    /// Nothing to alter, create or remove.
    pub fn is_in_sync(&self) -> bool {
        self.altered.is_empty() && self.non_present.is_empty() && self.removed.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            sot_role: self.sot_role,
            synced: self.synced.len(),
            altered: self.altered.len(),
            non_present: self.non_present.len(),
            removed: self.removed.len(),
        }
    }
}

/// Classify `source_of_truth` against `subject`.
///
/// The SOT role is taken from the record type, so device and directory field
/// names are mapped without the caller having to name the role.
pub fn reconcile<S, T>(subject: &[S], source_of_truth: &[T]) -> VlanDiff<S, T>
where
    S: VlanRecord + Clone,
    T: VlanRecord + Clone,
{
    let mut claimed = vec![false; subject.len()];
    let mut diff = VlanDiff {
        sot_role: T::ROLE,
        synced: Vec::new(),
        altered: Vec::new(),
        non_present: Vec::new(),
        removed: Vec::new(),
    };

    for sot_vlan in source_of_truth {
        if let Some(index) =
            first_unclaimed(subject, &claimed, |candidate| candidate.matches(sot_vlan))
        {
            claimed[index] = true;
            diff.synced.push(sot_vlan.clone());
        } else if let Some(index) =
            first_unclaimed(subject, &claimed, |candidate| candidate.matches_tag(sot_vlan))
        {
            claimed[index] = true;
            diff.altered.push(AlteredVlan {
                desired: sot_vlan.clone(),
                current: subject[index].clone(),
            });
        } else {
            diff.non_present.push(sot_vlan.clone());
        }
    }

    diff.removed = subject
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(vlan, _)| vlan.clone())
        .collect();

    diff
}

fn first_unclaimed<S>(
    subject: &[S],
    claimed: &[bool],
    predicate: impl Fn(&S) -> bool,
) -> Option<usize> {
    subject
        .iter()
        .enumerate()
        .find(|(index, candidate)| !claimed[*index] && predicate(candidate))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{DbVlan, DeviceVlan};

    fn db_vlan(id: i64, name: &str, tag: u16, description: &str) -> DbVlan {
        DbVlan {
            id,
            tag,
            name: name.to_string(),
            description: Some(description.to_string()),
            device: 1,
        }
    }

    fn device_vlan(name: &str, tag: u16, description: &str) -> DeviceVlan {
        DeviceVlan::new(name, tag, Some(description))
    }

    fn assert_totals<S, T>(diff: &VlanDiff<S, T>, subject_len: usize, sot_len: usize) {
        assert_eq!(
            diff.synced.len() + diff.altered.len() + diff.non_present.len(),
            sot_len
        );
        assert_eq!(
            diff.synced.len() + diff.altered.len() + diff.removed.len(),
            subject_len
        );
    }

    #[test]
    fn identical_vlan_is_synced() {
        let sot = vec![db_vlan(1, "v1", 100, "d")];
        let subject = vec![device_vlan("v1", 100, "d")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.sot_role, VlanRole::Db);
        assert_eq!(diff.synced, sot);
        assert!(diff.altered.is_empty());
        assert!(diff.non_present.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.is_in_sync());
    }

    #[test]
    fn same_tag_different_fields_is_altered() {
        let sot = vec![db_vlan(1, "v1", 100, "d1")];
        let subject = vec![device_vlan("v2", 100, "d2")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(
            diff.altered,
            vec![AlteredVlan {
                desired: sot[0].clone(),
                current: subject[0].clone(),
            }]
        );
        assert!(diff.synced.is_empty());
        assert!(diff.non_present.is_empty());
        assert!(diff.removed.is_empty());
        assert!(!diff.is_in_sync());
    }

    #[test]
    fn missing_subject_vlan_is_non_present() {
        let sot = vec![db_vlan(1, "v1", 100, "d")];
        let subject: Vec<DeviceVlan> = Vec::new();

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.non_present, sot);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn unmatched_subject_vlan_is_removed() {
        let sot: Vec<DbVlan> = Vec::new();
        let subject = vec![device_vlan("v1", 100, "d")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.removed, subject);
        assert!(diff.synced.is_empty());
        assert!(diff.non_present.is_empty());
    }

    #[test]
    fn device_as_source_of_truth_maps_fields() {
        let sot = vec![
            device_vlan("pytest-device-vlan-100", 100, "pytest"),
            device_vlan("pytest-device-vlan-300", 300, "pytest"),
        ];
        let subject = vec![
            db_vlan(10, "pytest-db-vlan-200", 200, "pytest"),
            db_vlan(11, "pytest-db-vlan-100", 100, "ALTERED IN DB"),
        ];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.sot_role, VlanRole::Device);
        assert_eq!(diff.altered.len(), 1);
        assert_eq!(diff.altered[0].desired, sot[0]);
        assert_eq!(diff.altered[0].current.id, 11);
        assert_eq!(diff.non_present, vec![sot[1].clone()]);
        assert_eq!(diff.removed, vec![subject[0].clone()]);
        assert_totals(&diff, subject.len(), sot.len());
    }

    #[test]
    fn rename_with_same_tag_is_altered_not_replaced() {
        let sot = vec![db_vlan(1, "servers", 20, "d")];
        let subject = vec![device_vlan("srv", 20, "d")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.altered.len(), 1);
        assert!(diff.non_present.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn exact_match_wins_over_earlier_tag_match() {
        let sot = vec![db_vlan(1, "v1", 100, "d")];
        let subject = vec![device_vlan("other", 100, "x"), device_vlan("v1", 100, "d")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.synced.len(), 1);
        assert_eq!(diff.removed, vec![subject[0].clone()]);
    }

    #[test]
    fn description_whitespace_change_is_altered() {
        let sot = vec![db_vlan(1, "v1", 100, " d")];
        let subject = vec![device_vlan("v1", 100, "d")];

        let diff = reconcile(&subject, &sot);

        assert!(diff.synced.is_empty());
        assert_eq!(diff.altered.len(), 1);
        assert_eq!(diff.altered[0].desired, sot[0]);
        assert!(!diff.is_in_sync());
    }

    #[test]
    fn claimed_subject_vlan_is_not_matched_twice() {
        let sot = vec![db_vlan(1, "v1", 100, "d"), db_vlan(2, "v1-dup", 100, "d")];
        let subject = vec![device_vlan("v1", 100, "d")];

        let diff = reconcile(&subject, &sot);

        assert_eq!(diff.synced, vec![sot[0].clone()]);
        assert_eq!(diff.non_present, vec![sot[1].clone()]);
        assert!(diff.altered.is_empty());
        assert_totals(&diff, subject.len(), sot.len());
    }

    #[test]
    fn mixed_lists_keep_totals() {
        let sot = vec![
            db_vlan(1, "a", 10, "x"),
            db_vlan(2, "b", 20, "y"),
            db_vlan(3, "c", 30, "z"),
            db_vlan(4, "d", 40, "w"),
        ];
        let subject = vec![
            device_vlan("a", 10, "x"),
            device_vlan("b-old", 20, "y"),
            device_vlan("e", 50, "v"),
            device_vlan("f", 60, "u"),
        ];

        let diff = reconcile(&subject, &sot);

        assert_totals(&diff, subject.len(), sot.len());
        assert_eq!(
            diff.summary(),
            DiffSummary {
                sot_role: VlanRole::Db,
                synced: 1,
                altered: 1,
                non_present: 2,
                removed: 2,
            }
        );
        assert_eq!(diff.summary().pending_changes(), 5);
        let removed_names: Vec<_> = diff.removed.iter().map(|vlan| vlan.name.as_str()).collect();
        assert_eq!(removed_names, vec!["e", "f"]);
    }

    #[test]
    fn empty_lists_are_in_sync() {
        let diff = reconcile::<DeviceVlan, DbVlan>(&[], &[]);
        assert!(diff.is_in_sync());
        assert_eq!(diff.summary().pending_changes(), 0);
    }
}
