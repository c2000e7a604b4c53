use crate::error::{ReportBuilderError, Result};
use crate::keys::{
    classify_ledger_entry, classify_position, ClassifiedLedgerEntry, ClassifiedPosition,
};
use crate::period::{same_month, ReportingPeriod};
use crate::schema::{
    InvestmentAttrs, InvestmentTypeAttrs, LedgerAccountBalance, LedgerEntry, MappingTable,
    PositionRecord, RegulatoryAttrs, TransactionTypeAttrs,
};
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

/// Everything one run works from: the three fact tables, the five mapping
/// tables and the code map, loaded once by the external driver and immutable
/// from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingSnapshot {
    pub ledger: Vec<LedgerEntry>,
    pub positions: Vec<PositionRecord>,
    pub account_balances: Vec<LedgerAccountBalance>,
    pub transaction_types: MappingTable<TransactionTypeAttrs>,
    pub investment_types: MappingTable<InvestmentTypeAttrs>,
    pub investments: MappingTable<InvestmentAttrs>,
    pub ledger_accounts: MappingTable<RegulatoryAttrs>,
    pub position_map: MappingTable<RegulatoryAttrs>,
    /// Display-code translations (currency, rating agency) for the position
    /// lookup report. Not one of the gated key spaces; an unmatched code
    /// falls back to itself.
    pub code_map: BTreeMap<String, String>,
}

impl ReportingSnapshot {
    /// Upstream-staleness gate: each fact table must contain rows dated in
    /// the report month, otherwise the feed has not caught up with the
    /// period being reported and the run aborts before any reconciliation.
    pub fn ensure_period_data(&self, period: &ReportingPeriod) -> Result<()> {
        check_period(
            self.ledger.iter().map(|e| e.booking_date),
            "ledger entries",
            "booking_date",
            period.report_date,
        )?;
        check_period(
            self.positions.iter().map(|p| p.report_date),
            "positions",
            "report_date",
            period.report_date,
        )?;
        check_period(
            self.account_balances.iter().map(|b| b.last_posting_date),
            "account balances",
            "last_posting_date",
            period.report_date,
        )?;

        Ok(())
    }

    /// Derives every classification key and resolves it against the mapping
    /// tables. Unresolved key spaces stay `None`; the reconciliation gate
    /// decides whether the run may continue.
    pub fn classify(&self) -> ClassifiedSnapshot<'_> {
        let ledger = self
            .ledger
            .iter()
            .map(|entry| {
                classify_ledger_entry(
                    entry,
                    &self.transaction_types,
                    &self.investment_types,
                    &self.investments,
                )
            })
            .collect();

        let positions = self
            .positions
            .iter()
            .map(|position| {
                classify_position(
                    position,
                    &self.investment_types,
                    &self.investments,
                    &self.position_map,
                )
            })
            .collect();

        ClassifiedSnapshot {
            snapshot: self,
            ledger,
            positions,
        }
    }

    pub fn code_label<'a>(&'a self, code: &'a str) -> &'a str {
        self.code_map.get(code).map(String::as_str).unwrap_or(code)
    }
}

fn check_period(
    dates: impl Iterator<Item = NaiveDate>,
    table: &str,
    column: &str,
    report_date: NaiveDate,
) -> Result<()> {
    for date in dates {
        if same_month(date, report_date) {
            debug!(
                "Data check passed: {} has rows for {}-{:02} in column {}",
                table,
                report_date.year(),
                report_date.month(),
                column
            );
            return Ok(());
        }
    }

    Err(ReportBuilderError::MissingPeriodData {
        table: table.to_string(),
        column: column.to_string(),
        year: report_date.year(),
        month: report_date.month(),
    })
}

/// The snapshot with every fact row classified. Borrows the snapshot; all
/// downstream stages work from read-only views of this.
#[derive(Debug)]
pub struct ClassifiedSnapshot<'a> {
    pub snapshot: &'a ReportingSnapshot,
    pub ledger: Vec<ClassifiedLedgerEntry<'a>>,
    pub positions: Vec<ClassifiedPosition<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;

    fn minimal_snapshot(booking_date: NaiveDate) -> ReportingSnapshot {
        ReportingSnapshot {
            ledger: vec![LedgerEntry {
                booking_date,
                group_account: "0600".to_string(),
                security_type: "BOND".to_string(),
                investment_class: "FI".to_string(),
                security_id: "SI0001".to_string(),
                maturity_band: "LT".to_string(),
                purpose: "PORTFOLIO".to_string(),
                debit_original: 10.0,
                credit_original: 0.0,
                debit_base: 10.0,
                credit_base: 0.0,
            }],
            positions: vec![PositionRecord {
                report_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
                security_id: "SI0001".to_string(),
                isin: "SI0000000001".to_string(),
                investment_name: "Test bond".to_string(),
                investment_type: "L_BONDS".to_string(),
                security_type: "BOND".to_string(),
                maturity_band: "LT".to_string(),
                quotation_currency: "EUR".to_string(),
                nominal_lot_value: 1000.0,
                lots: 5.0,
                acquisition_value_qc: 5000.0,
                acquisition_value_base: 5000.0,
                book_value_qc: 5100.0,
                book_value_base: 5100.0,
                accrued_interest_qc: 12.0,
                accrued_interest_base: 12.0,
                market_value_qc: 5150.0,
                market_value_base: 5150.0,
                coupon_rate: Some(1.25),
                effective_interest_rate: Some(1.31),
                coupon_frequency: Some("Annual".to_string()),
                purchase_date: NaiveDate::from_ymd_opt(2023, 2, 1),
                maturity_date: NaiveDate::from_ymd_opt(2030, 2, 1),
                issuer_rating: Some("A".to_string()),
                rating_agency: Some("SP".to_string()),
            }],
            account_balances: vec![LedgerAccountBalance {
                account_no: "020300".to_string(),
                account_suffix: "00".to_string(),
                account_name: "Participations".to_string(),
                balance: 250.0,
                last_posting_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            }],
            transaction_types: MappingTable::empty("transaction types"),
            investment_types: MappingTable::from_rows(
                "investment types",
                vec![(
                    "BONDLT".to_string(),
                    InvestmentTypeAttrs {
                        category: Category::DebtSecuritiesOverOneYear,
                    },
                )],
            )
            .unwrap(),
            investments: MappingTable::empty("investments"),
            ledger_accounts: MappingTable::empty("ledger accounts"),
            position_map: MappingTable::empty("position map"),
            code_map: BTreeMap::new(),
        }
    }

    #[test]
    fn test_period_check_passes_with_report_month_rows() {
        let snapshot = minimal_snapshot(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        let period =
            ReportingPeriod::from_report_date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert!(snapshot.ensure_period_data(&period).is_ok());
    }

    #[test]
    fn test_period_check_rejects_stale_ledger() {
        let snapshot = minimal_snapshot(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        let period =
            ReportingPeriod::from_report_date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());

        match snapshot.ensure_period_data(&period) {
            Err(ReportBuilderError::MissingPeriodData { table, month, .. }) => {
                assert_eq!(table, "ledger entries");
                assert_eq!(month, 6);
            }
            other => panic!("expected MissingPeriodData, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_resolves_category_for_ledger_and_positions() {
        let snapshot = minimal_snapshot(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        let classified = snapshot.classify();

        assert_eq!(classified.ledger.len(), 1);
        assert_eq!(
            classified.ledger[0].category,
            Some(Category::DebtSecuritiesOverOneYear)
        );
        assert_eq!(
            classified.positions[0].category,
            Some(Category::DebtSecuritiesOverOneYear)
        );
        // Unmapped key spaces stay unresolved.
        assert!(classified.ledger[0].transaction.is_none());
        assert!(classified.positions[0].attrs.is_none());
    }

    #[test]
    fn test_code_label_falls_back_to_raw_code() {
        let mut snapshot = minimal_snapshot(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        snapshot
            .code_map
            .insert("EUR".to_string(), "Euro".to_string());

        assert_eq!(snapshot.code_label("EUR"), "Euro");
        assert_eq!(snapshot.code_label("XXX"), "XXX");
    }
}
