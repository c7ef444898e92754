//! Last-line validation of assembled entries.
//!
//! Whatever path produced the entry, three things must hold on the way out:
//! the product carries exactly the row's rate, no sub-product segment appears
//! that the raw text never mentioned, and an agreement the cache knows is
//! spelled the official way with its official family/group.

use crate::dictionary::StandardEntry;
use crate::index::CacheIndex;
use crate::normalize::{format_rate_br, strip_trailing_rate, tokens};

pub fn validate_entry(
    mut entry: StandardEntry,
    rate: f64,
    index: &CacheIndex,
    raw_text: &str,
) -> StandardEntry {
    // Official spelling and metadata when the agreement is known.
    if let Some(official) = index.lookup_signature(&entry.agreement) {
        let official = official.to_string();
        if let Some((family, group)) = index.metadata(&official) {
            entry.family = family.to_string();
            entry.group = group.to_string();
        }
        entry.agreement = official;
    }

    // Drop appended segments the raw text never mentioned. The first segment
    // is the base name and always stays.
    let prefix = strip_trailing_rate(&entry.product);
    let raw = tokens(raw_text);
    let agreement_toks = tokens(&entry.agreement);
    let segments: Vec<&str> = prefix.split(" - ").collect();
    let mut kept: Vec<&str> = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let explicit = tokens(segment)
            .iter()
            .all(|t| raw.contains(t) || agreement_toks.contains(t));
        if i == 0 || explicit {
            kept.push(segment);
        }
    }

    // Exactly one rate suffix, matching the row.
    entry.product = format!("{} - {}", kept.join(" - "), format_rate_br(rate));
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{cache_key, Dictionary};

    fn entry(product: &str, agreement: &str) -> StandardEntry {
        StandardEntry {
            product: product.into(),
            agreement: agreement.into(),
            family: "OUTROS".into(),
            group: "OUTROS".into(),
        }
    }

    fn empty_index() -> CacheIndex {
        CacheIndex::build(&Dictionary::default())
    }

    #[test]
    fn rate_suffix_is_forced_to_row_rate() {
        let out = validate_entry(
            entry("GOV. SP - 2,10%", "GOV-SP"),
            2.5,
            &empty_index(),
            "GOV SP 2.50%",
        );
        assert_eq!(out.product, "GOV. SP - 2,50%");
    }

    #[test]
    fn rate_suffix_added_when_missing() {
        let out = validate_entry(
            entry("GOV. SP", "GOV-SP"),
            2.5,
            &empty_index(),
            "GOV SP 2.50%",
        );
        assert_eq!(out.product, "GOV. SP - 2,50%");
    }

    #[test]
    fn unmentioned_subproduct_segment_is_dropped() {
        let out = validate_entry(
            entry("GOV. SP - SPPREV - 2,50%", "GOV-SP"),
            2.5,
            &empty_index(),
            "GOV SP 2.50%",
        );
        assert_eq!(out.product, "GOV. SP - 2,50%");
    }

    #[test]
    fn mentioned_subproduct_segment_survives() {
        let out = validate_entry(
            entry("GOV. SP - SPPREV - 2,50%", "GOV-SP"),
            2.5,
            &empty_index(),
            "GOV SP SPPREV 2.50%",
        );
        assert_eq!(out.product, "GOV. SP - SPPREV - 2,50%");
    }

    #[test]
    fn known_agreement_gets_official_spelling_and_metadata() {
        let mut dict = Dictionary::default();
        dict.upsert(
            cache_key("K1", 2.5, "1-96"),
            StandardEntry {
                product: "GOV. SP - 2,50%".into(),
                agreement: "GOV-SP".into(),
                family: "GOVERNOS".into(),
                group: "ESTADUAL".into(),
            },
        );
        let index = CacheIndex::build(&dict);
        let out = validate_entry(
            entry("GOV. SP - 2,50%", "gov sp"),
            2.5,
            &index,
            "GOV SP 2.50%",
        );
        assert_eq!(out.agreement, "GOV-SP");
        assert_eq!(out.family, "GOVERNOS");
        assert_eq!(out.group, "ESTADUAL");
    }
}
