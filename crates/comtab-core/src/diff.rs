//! Diff engine — internal table vs. bank report.
//!
//! Produces one [`DiffAction`] per divergence:
//!
//! - present only in the internal table → [`Action::Close`],
//! - present only in the bank report → [`Action::Open`],
//! - present in both with a relevant field changed → [`Action::CloseOpen`]
//!   (the commissioning system has no in-place update; a changed condition
//!   closes the old row and opens a new one).
//!
//! Relevant fields: bank table id, commission percentage (rounded to four
//! decimal places), current installments. Output is sorted by identity key
//! so two runs over the same inputs emit identical action lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::IdentityKey;
use crate::item::CanonicalItem;

/// What the output spreadsheet should do about a divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// New row, present only in the bank report.
    Open,
    /// Obsolete row, present only in the internal table.
    Close,
    /// Changed row: close the internal version, open the bank version.
    CloseOpen,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::CloseOpen => write!(f, "close_open"),
        }
    }
}

/// A single diff outcome with the item(s) involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffAction {
    pub action: Action,
    /// Internal-table side, present for Close and CloseOpen.
    pub internal: Option<CanonicalItem>,
    /// Bank-report side, present for Open and CloseOpen.
    pub bank: Option<CanonicalItem>,
    /// Human-readable reason, carried into logs.
    pub reason: String,
}

/// Compare internal items against bank items and return the action list.
///
/// When the same identity key appears more than once on a side, the last
/// occurrence wins (duplicate rows in source spreadsheets are an input
/// defect; the engine stays deterministic about them).
pub fn diff(internal: &[CanonicalItem], bank: &[CanonicalItem]) -> Vec<DiffAction> {
    let internal_by_key: BTreeMap<IdentityKey, &CanonicalItem> =
        internal.iter().map(|i| (IdentityKey::of(i), i)).collect();
    let bank_by_key: BTreeMap<IdentityKey, &CanonicalItem> =
        bank.iter().map(|i| (IdentityKey::of(i), i)).collect();

    let mut actions = Vec::new();

    for (key, internal_item) in &internal_by_key {
        match bank_by_key.get(key) {
            None => actions.push(DiffAction {
                action: Action::Close,
                internal: Some((*internal_item).clone()),
                bank: None,
                reason: "row present only in the internal table".to_string(),
            }),
            Some(bank_item) => {
                if relevant_change(internal_item, bank_item) {
                    actions.push(DiffAction {
                        action: Action::CloseOpen,
                        internal: Some((*internal_item).clone()),
                        bank: Some((*bank_item).clone()),
                        reason: "relevant fields changed (bank table id, commission or installments)"
                            .to_string(),
                    });
                }
            }
        }
    }

    for (key, bank_item) in &bank_by_key {
        if !internal_by_key.contains_key(key) {
            actions.push(DiffAction {
                action: Action::Open,
                internal: None,
                bank: Some((*bank_item).clone()),
                reason: "new row present only in the bank report".to_string(),
            });
        }
    }

    actions
}

/// Did any field that forces a close+reopen change between the two sides?
fn relevant_change(internal: &CanonicalItem, bank: &CanonicalItem) -> bool {
    let internal_id = internal.bank_table_id.as_deref().unwrap_or("");
    let bank_id = bank.bank_table_id.as_deref().unwrap_or("");
    if internal_id != bank_id {
        return true;
    }

    // Commission compared at 4 decimal places; spreadsheets round-trip
    // through pt-BR formatted strings and pick up float noise.
    if round4(internal.commission_pct) != round4(bank.commission_pct) {
        return true;
    }

    internal.current_installments != bank.current_installments
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
