//! Row mapping: HOPE spreadsheet rows → [`CanonicalItem`]s.

use comtab_core::{parse_percent_br, CanonicalItem};
use comtab_standard::{RawInput, StandardizationOrigin, Standardizer, SuggestionLogError};

use crate::hope::complement;
use crate::sheet::{Row, ORIGIN_MARKER};

/// Column names of the HOPE product report.
pub mod bank_columns {
    pub const ORIGIN_ID: &str = "Id do Produto na Origem";
    pub const RATE: &str = "Taxa a.m";
    pub const TERM_START: &str = "Prazo Inicial";
    pub const TERM_END: &str = "Prazo Final";
    pub const PRODUCT: &str = "Tabela/Nome do Produto";
    pub const AGREEMENT: &str = "Convênio";
    pub const CONTRACT_TYPE: &str = "Tipo de Contrato";
    pub const BANK: &str = "Banco";
    pub const COMMISSION: &str = "À Vista Empresa";
}

/// Column names of the internal commissioning table used during mapping.
pub mod internal_columns {
    pub const INSTITUTION: &str = "Instituição";
    pub const AGREEMENT: &str = "Convênio";
    pub const PRODUCT: &str = "Produto";
    pub const OPERATION: &str = "Operação";
    pub const CURRENT_INSTALLMENTS: &str = "Parc. Atual";
    pub const COMMISSION: &str = "% Comissão";
    pub const BANK_TABLE_ID: &str = "Id Tabela Banco";
    pub const END: &str = "Término";
}

fn get(row: &Row, name: &str) -> String {
    row.get(name).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Map bank report rows, standardizing each one. The standardization origin
/// rides along in extras under [`ORIGIN_MARKER`] so the writer can flag rows
/// that need review.
pub async fn bank_items(
    rows: &[Row],
    standardizer: &mut Standardizer,
) -> Result<Vec<CanonicalItem>, SuggestionLogError> {
    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        let origin_id = get(row, bank_columns::ORIGIN_ID);
        let start = get(row, bank_columns::TERM_START);
        let end = get(row, bank_columns::TERM_END);
        let term = if start == end { start.clone() } else { format!("{start}-{end}") };
        let product_raw = get(row, bank_columns::PRODUCT);

        let input = RawInput {
            origin_id: origin_id.clone(),
            rate_raw: get(row, bank_columns::RATE),
            term_raw: term.clone(),
            product_raw: product_raw.clone(),
            agreement_raw: get(row, bank_columns::AGREEMENT),
        };
        let outcome = standardizer.standardize(&input).await?;

        let product_name = non_empty_or(outcome.entry.product, &product_raw);
        let agreement = non_empty_or(outcome.entry.agreement, &input.agreement_raw);
        let operation = map_operation(&get(row, bank_columns::CONTRACT_TYPE));

        let mut item = CanonicalItem::new(
            get(row, bank_columns::BANK),
            agreement,
            product_name,
            operation.clone(),
            term,
            parse_percent_br(&get(row, bank_columns::COMMISSION)),
        );
        if !origin_id.is_empty() {
            item.bank_table_id = Some(origin_id.clone());
            item.origin_product_id = Some(origin_id.clone());
        }
        item.extras.insert("Família Produto".into(), outcome.entry.family);
        item.extras.insert("Grupo Convênio".into(), outcome.entry.group);
        item.extras.insert(
            "Complemento".into(),
            complement::build(&origin_id, &operation, &product_raw),
        );
        item.extras.insert(ORIGIN_MARKER.into(), origin_label(outcome.origin).into());
        items.push(item);
    }

    Ok(items)
}

/// Map internal table rows. Rows already closed (non-empty Término) are not
/// part of the live table and are skipped; the original row is preserved so
/// close rows can copy it verbatim.
pub fn internal_items(rows: &[Row]) -> Vec<CanonicalItem> {
    rows.iter()
        .filter(|row| get(row, internal_columns::END).is_empty())
        .map(|row| {
            let bank_table_id = get(row, internal_columns::BANK_TABLE_ID);
            let mut item = CanonicalItem::new(
                get(row, internal_columns::INSTITUTION),
                get(row, internal_columns::AGREEMENT),
                get(row, internal_columns::PRODUCT),
                get(row, internal_columns::OPERATION),
                get(row, internal_columns::CURRENT_INSTALLMENTS),
                parse_percent_br(&get(row, internal_columns::COMMISSION)),
            );
            if !bank_table_id.is_empty() {
                item.bank_table_id = Some(bank_table_id.clone());
                item.origin_product_id = Some(bank_table_id);
            }
            item.original_row = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            item
        })
        .collect()
}

/// HOPE contract types → internal operation labels. PORT with REFIN is its
/// own operation and is checked first.
pub fn map_operation(contract_type: &str) -> String {
    let t = contract_type.trim().to_uppercase();
    if t.contains("PORT") && t.contains("REFIN") {
        "PORTAB/REFIN".to_string()
    } else if t.contains("PORT") {
        "PORTABILIDADE".to_string()
    } else if t.contains("CART") {
        "CARTÃO".to_string()
    } else if t.contains("NOVO") {
        "NOVO".to_string()
    } else {
        t
    }
}

fn origin_label(origin: StandardizationOrigin) -> &'static str {
    match origin {
        StandardizationOrigin::Cache => "CACHE",
        StandardizationOrigin::Rule => "REGRAS",
        StandardizationOrigin::Ai => "IA",
        StandardizationOrigin::Manual => "MANUAL",
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
