//! Per-type value normalization.
//!
//! Every equivalent spelling of an entity must collapse to one canonical
//! string, because merge-time deduplication and the stored-metadata
//! uniqueness invariant both key on the normalized form. An empty return
//! value means "reject": callers drop the candidate, they never store an
//! empty string.

use scambait_types::entity::EntityType;

/// Canonical rendering prefix for Indian mobile numbers.
const PHONE_COUNTRY_CODE: &str = "+91";

/// Label tokens that upstream pattern matching drags along in front of
/// reference identifiers ("Case No. X", "policy # Y", ...).
const REFERENCE_LABELS: &[&str] = &[
    "case",
    "complaint",
    "ticket",
    "reference",
    "ref",
    "policy",
    "pol",
    "order",
    "ord",
    "crn",
    "inv",
    "txn",
];

/// Qualifier tokens allowed between a label and the identifier.
const LABEL_QUALIFIERS: &[&str] = &["no", "number", "id"];

/// Generic words the reference-id patterns capture by accident. A candidate
/// reduced to one of these carries no intelligence value.
const NOISE_TOKENS: &[&str] = &[
    "case",
    "complaint",
    "ticket",
    "reference",
    "ref",
    "policy",
    "order",
    "number",
    "account",
    "payment",
    "pending",
    "urgent",
    "verify",
    "details",
    "id",
    "no",
];

/// Normalize one raw extracted value for its entity type.
///
/// Returns the canonical string form, or an empty string when the value is
/// rejected. Pure function; callers must treat empty as "drop this
/// candidate", never as a valid value.
pub fn normalize(raw: &str, entity_type: EntityType) -> String {
    match entity_type {
        EntityType::PhoneNumbers => normalize_phone(raw),
        EntityType::BankAccounts => raw.chars().filter(char::is_ascii_digit).collect(),
        EntityType::CaseIds | EntityType::PolicyNumbers | EntityType::OrderNumbers => {
            normalize_reference_id(raw)
        }
        EntityType::IfscCodes => raw.trim().to_ascii_uppercase(),
        EntityType::UpiIds | EntityType::PhishingUrls | EntityType::EmailAddresses => {
            raw.trim().to_string()
        }
    }
}

/// The bare 10-digit core of a canonical phone number, if `value` is one.
///
/// Used by disambiguation to test bank-account candidates against known
/// phone numbers.
pub fn phone_core(value: &str) -> Option<&str> {
    let core = value.strip_prefix(PHONE_COUNTRY_CODE)?.trim_start();
    (core.len() == 10 && core.chars().all(|c| c.is_ascii_digit())).then_some(core)
}

/// Indian mobile numbers: collapse every spelling (+91 prefix, 0 trunk
/// prefix, separators) onto one canonical form, reject anything that does
/// not reduce to exactly 10 digits.
fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    let core = if digits.len() > 10 {
        if let Some(rest) = digits.strip_prefix("091") {
            rest
        } else if let Some(rest) = digits.strip_prefix("91") {
            rest
        } else if let Some(rest) = digits.strip_prefix('0') {
            rest
        } else {
            digits.as_str()
        }
    } else {
        digits.as_str()
    };

    if core.len() == 10 {
        format!("{PHONE_COUNTRY_CODE} {core}")
    } else {
        String::new()
    }
}

/// Reference identifiers (case/policy/order numbers): strip one leading
/// label token, trim junk punctuation, and reject noise captures.
fn normalize_reference_id(raw: &str) -> String {
    let mut rest = raw.trim();

    // Strip to fixpoint: the remainder after one strip can itself start
    // with a label ("Ticket: CASE-77"), and normalization must be
    // idempotent, so a single pass is not enough.
    loop {
        let stripped = strip_leading_label(rest)
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-');
        if stripped == rest {
            break;
        }
        rest = stripped;
    }

    if NOISE_TOKENS.contains(&rest.to_ascii_lowercase().as_str()) {
        return String::new();
    }
    if rest.len() < 4 && !rest.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }

    rest.to_string()
}

/// Strip a leading `<label> [qualifier] <separator>` sequence, only when it
/// occurs at the very start and a separator actually follows. `CASE-2024-001`
/// becomes `2024-001`; `CASE2024001` is left alone.
fn strip_leading_label(value: &str) -> &str {
    let Some((word, after)) = take_word(value) else {
        return value;
    };
    if !REFERENCE_LABELS.contains(&word.to_ascii_lowercase().as_str()) {
        return value;
    }

    let (seen_sep, after) = skip_separators(after);

    // Optional qualifier ("no", "number", "id", "#") after the label.
    if let Some((qualifier, after_qualifier)) = take_word(after) {
        if LABEL_QUALIFIERS.contains(&qualifier.to_ascii_lowercase().as_str()) {
            let (qualifier_sep, stripped) = skip_separators(after_qualifier);
            if (seen_sep || qualifier_sep) && !stripped.is_empty() {
                return stripped;
            }
            return value;
        }
    }

    if seen_sep && !after.is_empty() {
        return after;
    }
    value
}

/// The leading run of ASCII letters, plus the remainder.
fn take_word(value: &str) -> Option<(&str, &str)> {
    let end = value
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    (end > 0).then(|| value.split_at(end))
}

/// Skip separator characters, reporting whether any were seen.
fn skip_separators(value: &str) -> (bool, &str) {
    let rest = value.trim_start_matches([' ', '\t', '.', ':', '#', '-', '/']);
    (rest.len() != value.len(), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_spellings_collapse_to_one_canonical_form() {
        let canonical = normalize("9876543210", EntityType::PhoneNumbers);
        assert_eq!(canonical, "+91 9876543210");
        assert_eq!(normalize("+91-9876543210", EntityType::PhoneNumbers), canonical);
        assert_eq!(normalize("919876543210", EntityType::PhoneNumbers), canonical);
        assert_eq!(normalize("09876543210", EntityType::PhoneNumbers), canonical);
        assert_eq!(normalize("0919876543210", EntityType::PhoneNumbers), canonical);
        assert_eq!(normalize("+91 98765 43210", EntityType::PhoneNumbers), canonical);
    }

    #[test]
    fn test_phone_wrong_length_rejected() {
        assert_eq!(normalize("12345", EntityType::PhoneNumbers), "");
        assert_eq!(normalize("98765432101234", EntityType::PhoneNumbers), "");
        assert_eq!(normalize("", EntityType::PhoneNumbers), "");
    }

    #[test]
    fn test_phone_core_of_canonical_value() {
        assert_eq!(phone_core("+91 9876543210"), Some("9876543210"));
        assert_eq!(phone_core("9876543210"), None);
        assert_eq!(phone_core("+91 98765"), None);
    }

    #[test]
    fn test_bank_account_strips_non_digits_without_length_check() {
        assert_eq!(
            normalize("1234-5678-9012-345", EntityType::BankAccounts),
            "123456789012345"
        );
        assert_eq!(normalize("A/C 987 654", EntityType::BankAccounts), "987654");
    }

    #[test]
    fn test_reference_label_stripped_structure_kept() {
        assert_eq!(normalize("CASE-2024-001", EntityType::CaseIds), "2024-001");
        assert_eq!(
            normalize("Policy No. LIC-44210988", EntityType::PolicyNumbers),
            "LIC-44210988"
        );
        // Stacked labels are stripped all the way down.
        assert_eq!(normalize("Ticket: CASE-77", EntityType::CaseIds), "77");
        assert_eq!(
            normalize("order id: OD123456789", EntityType::OrderNumbers),
            "OD123456789"
        );
        assert_eq!(
            normalize("ticket # 88-411", EntityType::CaseIds),
            "88-411"
        );
        assert_eq!(normalize("TXN: 8827736615", EntityType::OrderNumbers), "8827736615");
    }

    #[test]
    fn test_reference_label_without_separator_left_alone() {
        assert_eq!(normalize("CASE2024001", EntityType::CaseIds), "CASE2024001");
    }

    #[test]
    fn test_noise_tokens_rejected() {
        assert_eq!(normalize("REFERENCE", EntityType::CaseIds), "");
        assert_eq!(normalize("number", EntityType::OrderNumbers), "");
        assert_eq!(normalize("Urgent", EntityType::PolicyNumbers), "");
    }

    #[test]
    fn test_short_digitless_reference_rejected() {
        assert_eq!(normalize("abc", EntityType::CaseIds), "");
        // Short but contains a digit: kept.
        assert_eq!(normalize("A1", EntityType::CaseIds), "A1");
    }

    #[test]
    fn test_ifsc_uppercased() {
        assert_eq!(normalize(" sbin0001234 ", EntityType::IfscCodes), "SBIN0001234");
    }

    #[test]
    fn test_other_types_trim_only() {
        assert_eq!(
            normalize("  scammer@ybl  ", EntityType::UpiIds),
            "scammer@ybl"
        );
        assert_eq!(
            normalize(" http://bit.ly/x ", EntityType::PhishingUrls),
            "http://bit.ly/x"
        );
    }

    #[test]
    fn test_normalization_idempotent_for_all_types() {
        let samples = [
            (EntityType::PhoneNumbers, "+91-9876543210"),
            (EntityType::BankAccounts, "1234 5678 901"),
            (EntityType::CaseIds, "CASE-2024-001"),
            (EntityType::PolicyNumbers, "policy no POL-99-1"),
            (EntityType::OrderNumbers, "ORD#553-1234567"),
            (EntityType::UpiIds, " x@oksbi "),
            (EntityType::PhishingUrls, "http://t.co/abc"),
            (EntityType::EmailAddresses, "a@b.com "),
            (EntityType::IfscCodes, "hdfc0004321"),
        ];
        for (entity_type, raw) in samples {
            let once = normalize(raw, entity_type);
            assert!(!once.is_empty(), "{raw} unexpectedly rejected");
            assert_eq!(normalize(&once, entity_type), once, "not idempotent for {raw}");
        }
    }
}
