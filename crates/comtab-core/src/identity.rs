//! Identity keys — when are an internal row and a bank row "the same product"?
//!
//! Three strategies, tried in priority order:
//!
//! 1. origin product id + operation + installments,
//! 2. bank table id + operation + installments,
//! 3. fallback on the descriptive fields (institution, agreement, product,
//!    operation, installments).
//!
//! A row that carries an origin id must never collide with one keyed by the
//! fallback strategy, so the strategy tag is part of the key.

use serde::{Deserialize, Serialize};

use crate::item::CanonicalItem;

/// Composite identity key for a [`CanonicalItem`].
///
/// `Ord` so diff output can be emitted in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityKey {
    /// Keyed by the product id at the origin system.
    OriginId {
        id: String,
        operation: String,
        installments: String,
    },
    /// Keyed by the bank-side table id.
    BankTableId {
        id: String,
        operation: String,
        installments: String,
    },
    /// Descriptive fallback for rows without any id.
    Descriptive {
        institution: String,
        agreement: String,
        product_name: String,
        operation: String,
        installments: String,
    },
}

impl IdentityKey {
    /// Derive the identity key for an item.
    ///
    /// Empty-string ids count as absent, which routes the row to the next
    /// strategy down.
    pub fn of(item: &CanonicalItem) -> Self {
        if let Some(id) = non_empty(&item.origin_product_id) {
            return Self::OriginId {
                id: id.to_string(),
                operation: item.operation.clone(),
                installments: item.current_installments.clone(),
            };
        }
        if let Some(id) = non_empty(&item.bank_table_id) {
            return Self::BankTableId {
                id: id.to_string(),
                operation: item.operation.clone(),
                installments: item.current_installments.clone(),
            };
        }
        Self::Descriptive {
            institution: item.institution.clone(),
            agreement: item.agreement.clone(),
            product_name: item.product_name.clone(),
            operation: item.operation.clone(),
            installments: item.current_installments.clone(),
        }
    }
}

fn non_empty(id: &Option<String>) -> Option<&str> {
    match id.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(s) => Some(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> CanonicalItem {
        CanonicalItem::new("HOPE", "GOV-SP", "GOV. SP - 2,50%", "NOVO", "84", 8.5)
    }

    #[test]
    fn prefers_origin_id() {
        let mut it = item();
        it.origin_product_id = Some("2360".into());
        it.bank_table_id = Some("999".into());
        assert_eq!(
            IdentityKey::of(&it),
            IdentityKey::OriginId {
                id: "2360".into(),
                operation: "NOVO".into(),
                installments: "84".into(),
            }
        );
    }

    #[test]
    fn falls_back_to_bank_table_id() {
        let mut it = item();
        it.bank_table_id = Some("999".into());
        assert!(matches!(
            IdentityKey::of(&it),
            IdentityKey::BankTableId { ref id, .. } if id == "999"
        ));
    }

    #[test]
    fn empty_ids_count_as_absent() {
        let mut it = item();
        it.origin_product_id = Some("  ".into());
        it.bank_table_id = Some(String::new());
        assert!(matches!(IdentityKey::of(&it), IdentityKey::Descriptive { .. }));
    }

    #[test]
    fn descriptive_key_carries_all_fields() {
        let key = IdentityKey::of(&item());
        match key {
            IdentityKey::Descriptive {
                institution,
                agreement,
                product_name,
                operation,
                installments,
            } => {
                assert_eq!(institution, "HOPE");
                assert_eq!(agreement, "GOV-SP");
                assert_eq!(product_name, "GOV. SP - 2,50%");
                assert_eq!(operation, "NOVO");
                assert_eq!(installments, "84");
            }
            other => panic!("expected Descriptive, got {other:?}"),
        }
    }

    #[test]
    fn same_origin_id_different_installments_differ() {
        let mut a = item();
        a.origin_product_id = Some("2360".into());
        let mut b = a.clone();
        b.current_installments = "96".into();
        assert_ne!(IdentityKey::of(&a), IdentityKey::of(&b));
    }
}
