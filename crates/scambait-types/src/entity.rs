//! Extracted entity types.
//!
//! An entity is a typed piece of intelligence pulled out of a scammer
//! message (a bank account number, a UPI handle, a phishing URL, ...).
//! Identity of an entity is `(type, normalized value)`; uniqueness is
//! enforced at merge time by `scambait-core`, not here.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of entity categories the extraction pipeline produces.
///
/// Each type owns its own normalization rule and participates in the
/// type-priority ordering used for disambiguation (a 10-digit value that
/// matches a known phone number is presumed to be a phone, not an account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    BankAccounts,
    UpiIds,
    PhishingUrls,
    PhoneNumbers,
    EmailAddresses,
    IfscCodes,
    CaseIds,
    PolicyNumbers,
    OrderNumbers,
}

impl EntityType {
    /// All entity types, in canonical order.
    pub const ALL: [EntityType; 9] = [
        EntityType::BankAccounts,
        EntityType::UpiIds,
        EntityType::PhishingUrls,
        EntityType::PhoneNumbers,
        EntityType::EmailAddresses,
        EntityType::IfscCodes,
        EntityType::CaseIds,
        EntityType::PolicyNumbers,
        EntityType::OrderNumbers,
    ];
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityType::BankAccounts => "bank_accounts",
            EntityType::UpiIds => "upi_ids",
            EntityType::PhishingUrls => "phishing_urls",
            EntityType::PhoneNumbers => "phone_numbers",
            EntityType::EmailAddresses => "email_addresses",
            EntityType::IfscCodes => "ifsc_codes",
            EntityType::CaseIds => "case_ids",
            EntityType::PolicyNumbers => "policy_numbers",
            EntityType::OrderNumbers => "order_numbers",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_accounts" => Ok(EntityType::BankAccounts),
            "upi_ids" => Ok(EntityType::UpiIds),
            "phishing_urls" => Ok(EntityType::PhishingUrls),
            "phone_numbers" => Ok(EntityType::PhoneNumbers),
            "email_addresses" => Ok(EntityType::EmailAddresses),
            "ifsc_codes" => Ok(EntityType::IfscCodes),
            "case_ids" => Ok(EntityType::CaseIds),
            "policy_numbers" => Ok(EntityType::PolicyNumbers),
            "order_numbers" => Ok(EntityType::OrderNumbers),
            other => Err(format!("unknown entity type: '{other}'")),
        }
    }
}

/// How an entity was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitySource {
    /// Matched verbatim in the scammer's message.
    Explicit,
    /// Deduced by the extraction model rather than quoted directly.
    Inferred,
}

impl Default for EntitySource {
    fn default() -> Self {
        EntitySource::Explicit
    }
}

/// One extracted value with its confidence and provenance.
///
/// Immutable once it appears in a turn's output: later merges supersede
/// a record, they never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub value: String,
    pub confidence: f64,
    pub source: EntitySource,
}

impl EntityRecord {
    /// An explicitly-matched record with full confidence.
    pub fn explicit(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: 1.0,
            source: EntitySource::Explicit,
        }
    }
}

// Upstream extractors emit either `{"value": ..., "confidence": ..}` objects
// or bare strings. Accept both; bare strings become explicit records.
impl<'de> Deserialize<'de> for EntityRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bare(String),
            Full {
                value: String,
                #[serde(default = "default_confidence")]
                confidence: f64,
                #[serde(default)]
                source: EntitySource,
            },
        }

        fn default_confidence() -> f64 {
            1.0
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bare(value) => Ok(EntityRecord::explicit(value)),
            Raw::Full {
                value,
                confidence,
                source,
            } => Ok(EntityRecord {
                value,
                confidence: confidence.clamp(0.0, 1.0),
                source,
            }),
        }
    }
}

/// A mapping from entity type to its extracted records.
///
/// Deserialization is lenient: unknown keys and structurally invalid values
/// (a non-array where a list is expected, a malformed record inside a list)
/// are dropped rather than failing the whole set. The merge pipeline never
/// raises on bad input; it only loses unusable data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntitySet(pub BTreeMap<EntityType, Vec<EntityRecord>>);

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.is_empty())
    }

    /// Total record count across all types.
    pub fn len(&self) -> usize {
        self.0.values().map(|v| v.len()).sum()
    }

    pub fn get(&self, entity_type: EntityType) -> &[EntityRecord] {
        self.0.get(&entity_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, entity_type: EntityType, record: EntityRecord) {
        self.0.entry(entity_type).or_default().push(record);
    }
}

impl<'de> Deserialize<'de> for EntitySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut set = BTreeMap::new();
        for (key, value) in raw {
            let Ok(entity_type) = key.parse::<EntityType>() else {
                continue;
            };
            let records = match value {
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<EntityRecord>(item).ok())
                    .collect(),
                // Wrong shape for this type: treat as empty, not fatal.
                _ => Vec::new(),
            };
            set.insert(entity_type, records);
        }
        Ok(EntitySet(set))
    }
}

impl FromIterator<(EntityType, Vec<EntityRecord>)> for EntitySet {
    fn from_iter<I: IntoIterator<Item = (EntityType, Vec<EntityRecord>)>>(iter: I) -> Self {
        EntitySet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_display_fromstr_roundtrip() {
        for t in EntityType::ALL {
            let parsed: EntityType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn test_entity_type_unknown_rejected() {
        assert!("aadhaar_numbers".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_record_deserializes_from_bare_string() {
        let record: EntityRecord = serde_json::from_str("\"9876543210\"").unwrap();
        assert_eq!(record.value, "9876543210");
        assert_eq!(record.confidence, 1.0);
        assert_eq!(record.source, EntitySource::Explicit);
    }

    #[test]
    fn test_record_deserializes_from_object() {
        let record: EntityRecord =
            serde_json::from_str(r#"{"value": "x@ybl", "confidence": 0.8, "source": "inferred"}"#)
                .unwrap();
        assert_eq!(record.value, "x@ybl");
        assert!((record.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(record.source, EntitySource::Inferred);
    }

    #[test]
    fn test_record_confidence_clamped() {
        let record: EntityRecord =
            serde_json::from_str(r#"{"value": "x", "confidence": 3.5}"#).unwrap();
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn test_entity_set_tolerates_malformed_values() {
        let set: EntitySet = serde_json::from_str(
            r#"{
                "bank_accounts": ["12345678901"],
                "upi_ids": "not-a-list",
                "phone_numbers": [{"value": "9876543210"}, 42],
                "made_up_type": ["ignored"]
            }"#,
        )
        .unwrap();

        assert_eq!(set.get(EntityType::BankAccounts).len(), 1);
        assert!(set.get(EntityType::UpiIds).is_empty());
        assert_eq!(set.get(EntityType::PhoneNumbers).len(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_entity_set_serde_roundtrip() {
        let mut set = EntitySet::new();
        set.insert(EntityType::UpiIds, EntityRecord::explicit("scammer@ybl"));
        let json = serde_json::to_string(&set).unwrap();
        let parsed: EntitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }
}
