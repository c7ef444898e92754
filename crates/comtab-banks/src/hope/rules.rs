//! HOPE output rules: the fixed column set and how open/close rows are
//! filled.

use chrono::{Days, NaiveDate};
use comtab_core::CanonicalItem;

use crate::sheet::{Row, ORIGIN_MARKER};

/// Output column order of the HOPE delta spreadsheet. Always written in
/// full, whatever subset a given row populates.
pub const OUTPUT_COLUMNS: [&str; 30] = [
    "ID",
    "Instituição",
    "Produto",
    "Família Produto",
    "Grupo Convênio",
    "Convênio",
    "Operação",
    "Parc. Atual",
    "Parc. Refin.",
    "% PMT Pagas",
    "% Taxa",
    "Idade",
    "% Comissão",
    "-",
    "Base Comissão",
    "% Mínima",
    "% Intermediária",
    "% Máxima",
    "% Fator",
    "% TAC",
    "Val. Teto TAC",
    "Faixa Val. Contrato",
    "Faixa Val. Seguro",
    "Vigência",
    "Término",
    "Complemento",
    "Venda Digital",
    "Visualização Restrita",
    "Val. Base Produção",
    "Id Tabela Banco",
];

fn br_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Open row: a brand-new line following HOPE defaults, Vigência = `as_of`.
pub fn open_row(item: &CanonicalItem, as_of: NaiveDate) -> Row {
    let mut row: Row = OUTPUT_COLUMNS
        .iter()
        .map(|c| (c.to_string(), String::new()))
        .collect();

    row.insert("Instituição".into(), item.institution.clone());
    row.insert("Produto".into(), item.product_name.clone());
    row.insert("Convênio".into(), item.agreement.clone());
    row.insert("Operação".into(), item.operation.clone());
    row.insert("Parc. Atual".into(), item.current_installments.clone());
    row.insert(
        "% Comissão".into(),
        format!("{:.2}", item.commission_pct).replace('.', ","),
    );
    row.insert(
        "Id Tabela Banco".into(),
        item.bank_table_id.clone().unwrap_or_default(),
    );
    row.insert("Complemento".into(), item.extra("Complemento").to_string());
    row.insert("Família Produto".into(), item.extra("Família Produto").to_string());
    row.insert("Grupo Convênio".into(), item.extra("Grupo Convênio").to_string());

    // HOPE defaults
    row.insert("Parc. Refin.".into(), "0".into());
    row.insert("% PMT Pagas".into(), "0".into());
    row.insert("% Taxa".into(), "0".into());
    row.insert("Idade".into(), "0-80".into());
    row.insert("-".into(), "%".into());
    row.insert(
        "Base Comissão".into(),
        if item.operation.eq_ignore_ascii_case("PORTABILIDADE") {
            "BRUTO".into()
        } else {
            "LÍQUIDO".into()
        },
    );
    row.insert("% Fator".into(), "0".into());
    row.insert("% TAC".into(), "0".into());
    row.insert("Val. Teto TAC".into(), "0".into());
    row.insert("Faixa Val. Contrato".into(), "0,00-100.000,00-LÍQUIDO".into());
    row.insert("Faixa Val. Seguro".into(), "0".into());
    row.insert("Vigência".into(), br_date(as_of));
    row.insert("Venda Digital".into(), "SIM".into());
    row.insert("Visualização Restrita".into(), "NÃO".into());

    // review marker, consumed by the writer, never a column
    let marker = item.extra(ORIGIN_MARKER);
    if !marker.is_empty() {
        row.insert(ORIGIN_MARKER.into(), marker.to_string());
    }
    row
}

/// Close row: the preserved original line, untouched except for
/// Término = the day before `as_of`.
pub fn close_row(item: &CanonicalItem, as_of: NaiveDate) -> Row {
    let yesterday = as_of.checked_sub_days(Days::new(1)).unwrap_or(as_of);

    let mut row: Row = OUTPUT_COLUMNS
        .iter()
        .map(|c| (c.to_string(), String::new()))
        .collect();
    for col in OUTPUT_COLUMNS {
        if let Some(value) = item.original_row.get(col) {
            row.insert(col.to_string(), value.clone());
        }
    }
    row.insert("Término".into(), br_date(yesterday));
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bank_item() -> CanonicalItem {
        let mut item = CanonicalItem::new(
            "HOPE",
            "GOV-AC",
            "GOV. AC - 1,90%",
            "PORTABILIDADE",
            "1-96",
            8.5,
        );
        item.bank_table_id = Some("2360".into());
        item.extras.insert("Complemento".into(), "2360 | TX ENTRADA 1,49% A 2,50% | OBRIGATORIO O REFIN".into());
        item.extras.insert("Família Produto".into(), "GOVERNOS".into());
        item.extras.insert("Grupo Convênio".into(), "ESTADUAL".into());
        item.extras.insert(ORIGIN_MARKER.into(), "IA".into());
        item
    }

    #[test]
    fn open_row_defaults_and_fields() {
        let row = open_row(&bank_item(), date(2026, 8, 23));
        assert_eq!(row["Produto"], "GOV. AC - 1,90%");
        assert_eq!(row["% Comissão"], "8,50");
        assert_eq!(row["Base Comissão"], "BRUTO");
        assert_eq!(row["Idade"], "0-80");
        assert_eq!(row["-"], "%");
        assert_eq!(row["Faixa Val. Contrato"], "0,00-100.000,00-LÍQUIDO");
        assert_eq!(row["Vigência"], "23/08/2026");
        assert_eq!(row["Término"], "");
        assert_eq!(row["Venda Digital"], "SIM");
        assert_eq!(row["Visualização Restrita"], "NÃO");
        assert_eq!(row[ORIGIN_MARKER], "IA");
        // every output column present
        for col in OUTPUT_COLUMNS {
            assert!(row.contains_key(col), "missing column {col}");
        }
    }

    #[test]
    fn non_portability_commission_base_is_liquid() {
        let mut item = bank_item();
        item.operation = "NOVO".into();
        let row = open_row(&item, date(2026, 8, 23));
        assert_eq!(row["Base Comissão"], "LÍQUIDO");
    }

    #[test]
    fn close_row_copies_original_and_sets_termino_to_yesterday() {
        let mut item = CanonicalItem::new("HOPE", "GOV-SP", "GOV. SP - 2,50%", "NOVO", "84", 8.5);
        item.original_row = [
            ("ID", "77"),
            ("Produto", "GOV. SP - 2,50%"),
            ("Vigência", "01/02/2025"),
            ("% Comissão", "8,50"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let row = close_row(&item, date(2026, 3, 1));
        assert_eq!(row["ID"], "77");
        assert_eq!(row["Produto"], "GOV. SP - 2,50%");
        assert_eq!(row["Vigência"], "01/02/2025");
        assert_eq!(row["Término"], "28/02/2026");
        // close rows are never review-flagged
        assert!(!row.contains_key(ORIGIN_MARKER));
    }
}
