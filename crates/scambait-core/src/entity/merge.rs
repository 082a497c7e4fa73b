//! Entity set merge and cross-type disambiguation.
//!
//! Called once per turn to combine prior-session entities with the current
//! turn's extraction. Idempotent by construction: the output carries only
//! canonical values, so re-merging the result with the same inputs is a
//! no-op.

use std::collections::HashSet;

use scambait_types::entity::{EntityRecord, EntitySet, EntityType};

use super::normalize::{normalize, phone_core};

/// Merge two entity sets into one canonical, deduplicated set.
///
/// For each type the sequences are concatenated (`a` before `b`), every
/// value is normalized (rejects dropped), and duplicates are removed by
/// normalized value with the earliest-seen record's confidence and source
/// winning. Cross-type disambiguation then removes bank-account candidates
/// that are really phone numbers.
pub fn merge(a: &EntitySet, b: &EntitySet) -> EntitySet {
    let mut out = EntitySet::new();
    let mut dropped = 0usize;

    for entity_type in EntityType::ALL {
        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<EntityRecord> = Vec::new();

        for record in a.get(entity_type).iter().chain(b.get(entity_type)) {
            let canonical = normalize(&record.value, entity_type);
            if canonical.is_empty() {
                dropped += 1;
                continue;
            }
            if !seen.insert(canonical.clone()) {
                continue;
            }
            records.push(EntityRecord {
                value: canonical,
                confidence: record.confidence,
                source: record.source,
            });
        }

        if !records.is_empty() {
            out.0.insert(entity_type, records);
        }
    }

    disambiguate(&mut out);

    if dropped > 0 {
        tracing::debug!(dropped, "merge dropped unusable entity candidates");
    }
    out
}

/// A 10-digit value that also appears as a known phone number is presumed
/// to be a phone number, not an account number: remove it from
/// `bank_accounts`.
fn disambiguate(set: &mut EntitySet) {
    let phone_cores: HashSet<String> = set
        .get(EntityType::PhoneNumbers)
        .iter()
        .filter_map(|r| phone_core(&r.value))
        .map(str::to_string)
        .collect();

    if phone_cores.is_empty() {
        return;
    }

    if let Some(accounts) = set.0.get_mut(&EntityType::BankAccounts) {
        accounts.retain(|r| r.value.len() != 10 || !phone_cores.contains(&r.value));
        if accounts.is_empty() {
            set.0.remove(&EntityType::BankAccounts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scambait_types::entity::EntitySource;

    fn set(entries: &[(EntityType, &[&str])]) -> EntitySet {
        let mut out = EntitySet::new();
        for (entity_type, values) in entries {
            for value in *values {
                out.insert(*entity_type, EntityRecord::explicit(*value));
            }
        }
        out
    }

    #[test]
    fn test_merge_unions_both_sides() {
        let a = set(&[(EntityType::UpiIds, &["fraud@ybl"])]);
        let b = set(&[(EntityType::BankAccounts, &["123456789012"])]);
        let merged = merge(&a, &b);
        assert_eq!(merged.get(EntityType::UpiIds).len(), 1);
        assert_eq!(merged.get(EntityType::BankAccounts).len(), 1);
    }

    #[test]
    fn test_merge_dedupes_by_normalized_value() {
        let a = set(&[(EntityType::PhoneNumbers, &["+91-9876543210"])]);
        let b = set(&[(EntityType::PhoneNumbers, &["09876543210", "9876543210"])]);
        let merged = merge(&a, &b);
        let phones = merged.get(EntityType::PhoneNumbers);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].value, "+91 9876543210");
    }

    #[test]
    fn test_merge_keeps_earliest_record_attributes() {
        let mut a = EntitySet::new();
        a.insert(
            EntityType::UpiIds,
            EntityRecord {
                value: "fraud@ybl".into(),
                confidence: 0.7,
                source: EntitySource::Inferred,
            },
        );
        let b = set(&[(EntityType::UpiIds, &["fraud@ybl"])]);

        let merged = merge(&a, &b);
        let records = merged.get(EntityType::UpiIds);
        assert_eq!(records.len(), 1);
        assert!((records[0].confidence - 0.7).abs() < f64::EPSILON);
        assert_eq!(records[0].source, EntitySource::Inferred);
    }

    #[test]
    fn test_merge_drops_rejected_values() {
        let a = set(&[
            (EntityType::PhoneNumbers, &["12345"]),
            (EntityType::CaseIds, &["REFERENCE"]),
        ]);
        let merged = merge(&a, &EntitySet::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_idempotent() {
        let x = set(&[
            (EntityType::PhoneNumbers, &["919876543210", "+91 9876543210"]),
            (EntityType::BankAccounts, &["1234 5678 9012 3456"]),
            (EntityType::CaseIds, &["CASE-2024-001"]),
        ]);
        let empty = EntitySet::new();

        let left = merge(&x, &empty);
        let right = merge(&empty, &x);
        assert_eq!(left, right);

        let doubled = merge(&x, &x);
        assert_eq!(doubled, left);

        // Re-merging canonical output is a no-op.
        let again = merge(&left, &empty);
        assert_eq!(again, left);
    }

    #[test]
    fn test_disambiguation_removes_phone_lookalike_account() {
        let a = set(&[(EntityType::BankAccounts, &["9876543210"])]);
        let b = set(&[(EntityType::PhoneNumbers, &["+91-9876543210"])]);

        let merged = merge(&a, &b);
        assert!(merged.get(EntityType::BankAccounts).is_empty());
        let phones = merged.get(EntityType::PhoneNumbers);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].value, "+91 9876543210");
    }

    #[test]
    fn test_disambiguation_keeps_longer_accounts() {
        let a = set(&[(EntityType::BankAccounts, &["98765432101234"])]);
        let b = set(&[(EntityType::PhoneNumbers, &["9876543210"])]);

        let merged = merge(&a, &b);
        assert_eq!(merged.get(EntityType::BankAccounts).len(), 1);
    }

    #[test]
    fn test_disambiguation_keeps_unrelated_ten_digit_account() {
        let a = set(&[(EntityType::BankAccounts, &["1112223334"])]);
        let b = set(&[(EntityType::PhoneNumbers, &["9876543210"])]);

        let merged = merge(&a, &b);
        assert_eq!(merged.get(EntityType::BankAccounts).len(), 1);
    }
}
