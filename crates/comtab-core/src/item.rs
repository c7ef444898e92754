//! Canonical commissioning row, independent of the source institution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One standardized product row, whether it came from the internal table or
/// from a bank report.
///
/// `commission_pct` is in percent units (`8.5` means 8,5%). String fields
/// keep whatever the standardization layer produced; empty strings mean
/// "absent" for the optional spreadsheet columns, but `bank_table_id` and
/// `origin_product_id` use `Option` because their presence changes which
/// identity strategy applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    /// Institution name as printed in the output sheet (e.g. "HOPE").
    pub institution: String,
    /// Standardized agreement ("convênio") name.
    pub agreement: String,
    /// Standardized product name, rate suffix included.
    pub product_name: String,
    /// Operation label (NOVO, PORTABILIDADE, ...).
    pub operation: String,
    /// Current installment term, collapsed ("84" or "12-84").
    pub current_installments: String,
    /// Commission percentage (8.5 == 8,5%).
    pub commission_pct: f64,
    /// Bank-side table identifier, when the report carries one.
    pub bank_table_id: Option<String>,
    /// Product id at the origin system, when the report carries one.
    pub origin_product_id: Option<String>,
    /// Adapter-specific extras rendered into output columns
    /// (e.g. "Complemento", "Família Produto").
    pub extras: BTreeMap<String, String>,
    /// The original spreadsheet row, preserved verbatim for internal items
    /// so close rows can copy every column. Empty for bank items.
    pub original_row: BTreeMap<String, String>,
}

impl CanonicalItem {
    /// Convenience constructor with empty optional/auxiliary fields.
    pub fn new(
        institution: impl Into<String>,
        agreement: impl Into<String>,
        product_name: impl Into<String>,
        operation: impl Into<String>,
        current_installments: impl Into<String>,
        commission_pct: f64,
    ) -> Self {
        Self {
            institution: institution.into(),
            agreement: agreement.into(),
            product_name: product_name.into(),
            operation: operation.into(),
            current_installments: current_installments.into(),
            commission_pct,
            bank_table_id: None,
            origin_product_id: None,
            extras: BTreeMap::new(),
            original_row: BTreeMap::new(),
        }
    }

    /// An extras value, or `""` when absent.
    pub fn extra(&self, key: &str) -> &str {
        self.extras.get(key).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_leaves_ids_absent() {
        let item = CanonicalItem::new("HOPE", "GOV-SP", "GOV. SP - 2,50%", "NOVO", "84", 8.5);
        assert!(item.bank_table_id.is_none());
        assert!(item.origin_product_id.is_none());
        assert!(item.extras.is_empty());
    }

    #[test]
    fn extra_returns_empty_for_missing_key() {
        let mut item = CanonicalItem::new("HOPE", "SIAPE", "SIAPE - 1,80%", "NOVO", "96", 10.0);
        item.extras.insert("Complemento".into(), "2360".into());
        assert_eq!(item.extra("Complemento"), "2360");
        assert_eq!(item.extra("Grupo Convênio"), "");
    }

    #[test]
    fn serializes_round_trip() {
        let item = CanonicalItem::new("HOPE", "GOV-MG", "GOV. MG - 2,10%", "NOVO", "84", 8.0);
        let json = serde_json::to_string(&item).unwrap();
        let back: CanonicalItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
