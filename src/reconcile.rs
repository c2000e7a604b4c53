use crate::error::Result;
use crate::snapshot::ClassifiedSnapshot;
use crate::table::{Cell, ReportTable};
use log::warn;
use std::collections::BTreeSet;

pub const MISSING_TRANSACTION_TYPES: &str = "Missing Transaction Types";
pub const MISSING_INVESTMENT_TYPES: &str = "Missing Investment Types";
pub const MISSING_INVESTMENT_MAPPINGS: &str = "Missing Investment Mappings";
pub const MISSING_LEDGER_ACCOUNT_MAPPINGS: &str = "Missing Ledger Account Mappings";
pub const MISSING_POSITION_MAPPINGS: &str = "Missing Position Mappings";

/// The gap artifact: one table per key space with unmapped fact keys. Each
/// table doubles as the insert template for the maintainer — fact-side
/// columns filled in, attribute columns left blank.
#[derive(Debug, Clone, PartialEq)]
pub struct GapReport {
    tables: Vec<ReportTable>,
}

impl GapReport {
    pub fn is_clean(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> &[ReportTable] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.tables)?)
    }
}

/// Evaluates all five key spaces and collects the gap tables. The caller
/// halts the pipeline when the report is not clean; no aggregation may run
/// against unmapped data.
pub fn reconcile(classified: &ClassifiedSnapshot<'_>) -> GapReport {
    let snapshot = classified.snapshot;
    let mut tables = Vec::new();

    let transaction_gap = gap_keys(
        classified.ledger.iter().map(|e| e.transaction_key.as_str()),
        snapshot.transaction_types.keys().map(String::as_str),
    );
    if !transaction_gap.is_empty() {
        let mut table = ReportTable::new(
            MISSING_TRANSACTION_TYPES,
            &[
                "Key",
                "Group account",
                "Security type",
                "Investment class",
                "Contributes to status",
                "Contributes to change",
                "Unrealized kind",
                "Realized kind",
            ],
        );
        let mut seen = BTreeSet::new();
        for entry in &classified.ledger {
            if !transaction_gap.contains(entry.transaction_key.as_str()) {
                continue;
            }
            push_unique(
                &mut table,
                &mut seen,
                vec![
                    Cell::text(&entry.transaction_key),
                    Cell::text(&entry.entry.group_account),
                    Cell::text(&entry.entry.security_type),
                    Cell::text(&entry.entry.investment_class),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                ],
            );
        }
        tables.push(table);
    }

    let investment_type_gap = gap_keys(
        classified
            .ledger
            .iter()
            .map(|e| e.investment_type_key.as_str()),
        snapshot.investment_types.keys().map(String::as_str),
    );
    if !investment_type_gap.is_empty() {
        let mut table = ReportTable::new(
            MISSING_INVESTMENT_TYPES,
            &["Key", "Security type", "Maturity band", "Category"],
        );
        let mut seen = BTreeSet::new();
        for entry in &classified.ledger {
            if !investment_type_gap.contains(entry.investment_type_key.as_str()) {
                continue;
            }
            push_unique(
                &mut table,
                &mut seen,
                vec![
                    Cell::text(&entry.investment_type_key),
                    Cell::text(&entry.entry.security_type),
                    Cell::text(&entry.entry.maturity_band),
                    Cell::Blank,
                ],
            );
        }
        tables.push(table);
    }

    let investment_gap = gap_keys(
        classified.ledger.iter().map(|e| e.investment_key.as_str()),
        snapshot.investments.keys().map(String::as_str),
    );
    if !investment_gap.is_empty() {
        let mut table = ReportTable::new(
            MISSING_INVESTMENT_MAPPINGS,
            &[
                "Key",
                "Security id",
                "Security type",
                "Purpose",
                "Tag",
                "IFRS classification",
                "Valuation method",
                "Valuation method (if other)",
                "Funding source",
            ],
        );
        let mut seen = BTreeSet::new();
        for entry in &classified.ledger {
            if !investment_gap.contains(entry.investment_key.as_str()) {
                continue;
            }
            push_unique(
                &mut table,
                &mut seen,
                vec![
                    Cell::text(&entry.investment_key),
                    Cell::text(&entry.entry.security_id),
                    Cell::text(&entry.entry.security_type),
                    Cell::text(&entry.entry.purpose),
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                ],
            );
        }
        tables.push(table);
    }

    let account_keys: Vec<String> = snapshot
        .account_balances
        .iter()
        .map(|b| b.account_key())
        .collect();
    let account_gap = gap_keys(
        account_keys.iter().map(String::as_str),
        snapshot.ledger_accounts.keys().map(String::as_str),
    );
    if !account_gap.is_empty() {
        let mut table = ReportTable::new(
            MISSING_LEDGER_ACCOUNT_MAPPINGS,
            &["Key", "Account no", "Account suffix", "Account name"],
        );
        let mut seen = BTreeSet::new();
        for (balance, key) in snapshot.account_balances.iter().zip(&account_keys) {
            if !account_gap.contains(key.as_str()) {
                continue;
            }
            push_unique(
                &mut table,
                &mut seen,
                vec![
                    Cell::text(key),
                    Cell::text(&balance.account_no),
                    Cell::text(&balance.account_suffix),
                    Cell::text(&balance.account_name),
                ],
            );
        }
        tables.push(table);
    }

    let position_gap = gap_keys(
        classified.positions.iter().map(|p| p.position_key.as_str()),
        snapshot.position_map.keys().map(String::as_str),
    );
    if !position_gap.is_empty() {
        let mut table = ReportTable::new(
            MISSING_POSITION_MAPPINGS,
            &["Key", "Security id", "ISIN", "Investment name", "Investment type"],
        );
        let mut seen = BTreeSet::new();
        for position in &classified.positions {
            if !position_gap.contains(position.position_key.as_str()) {
                continue;
            }
            push_unique(
                &mut table,
                &mut seen,
                vec![
                    Cell::text(&position.position_key),
                    Cell::text(&position.position.security_id),
                    Cell::text(&position.position.isin),
                    Cell::text(&position.position.investment_name),
                    Cell::text(&position.position.investment_type),
                ],
            );
        }
        tables.push(table);
    }

    if !tables.is_empty() {
        for table in &tables {
            warn!(
                "Mapping gap: {} ({} distinct rows)",
                table.name(),
                table.rows().len()
            );
        }
    }

    GapReport { tables }
}

/// `gap = set(fact_keys) − set(mapping_keys)`. A key space with no fact
/// rows trivially has an empty gap.
fn gap_keys<'a>(
    fact_keys: impl Iterator<Item = &'a str>,
    mapping_keys: impl Iterator<Item = &'a str>,
) -> BTreeSet<&'a str> {
    let facts: BTreeSet<&str> = fact_keys.collect();
    let mapped: BTreeSet<&str> = mapping_keys.collect();
    facts.difference(&mapped).copied().collect()
}

/// Keeps the first occurrence of each distinct row (on the collected column
/// subset), preserving source order.
fn push_unique(table: &mut ReportTable, seen: &mut BTreeSet<String>, row: Vec<Cell>) {
    let fingerprint = row
        .iter()
        .map(|cell| match cell {
            Cell::Text(s) => s.as_str(),
            _ => "",
        })
        .collect::<Vec<_>>()
        .join("\u{1f}");

    if seen.insert(fingerprint) {
        table.push_row(row);
    }
}
