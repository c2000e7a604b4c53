//! # Quarterly Report Builder
//!
//! A library for turning raw accounting ledger entries, investment-position
//! snapshots and hand-maintained mapping tables into a quarterly regulatory
//! financial report — and for refusing to produce one while the mapping
//! tables do not yet cover all observed data.
//!
//! ## Core Concepts
//!
//! - **Composite keys**: classification keys derived from fact rows by
//!   ordered field concatenation, resolved against five independent mapping
//!   tables.
//! - **Reconciliation gate**: any fact key missing from its mapping table
//!   halts the run and yields the gap tables instead of a report
//!   (all-or-nothing; no partial aggregation over unmapped data).
//! - **Windowed aggregation**: per category and transaction kind, an
//!   as-of-previous-quarter *status* sum and a within-current-quarter
//!   *change* sum, combined into the report line items.
//! - **Deterministic sums**: empty subsets sum to exactly `0.0`, never a
//!   missing value and never `-0.0`; reruns over unchanged data serialize
//!   byte-identically.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quarterly_report_builder::*;
//! use chrono::NaiveDate;
//!
//! let snapshot = ReportingSnapshot { /* facts + mapping tables */ };
//! let period = ReportingPeriod::from_report_date(
//!     NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
//! );
//!
//! match build_quarterly_report(&snapshot, period)? {
//!     RunOutcome::Completed(report) => persist(report.tables()),
//!     RunOutcome::MappingGaps(gaps) => persist(gaps.tables()), // update mappings, rerun
//! }
//! ```

pub mod aggregate;
pub mod assemble;
pub mod error;
pub mod ingestion;
pub mod keys;
pub mod period;
pub mod reconcile;
pub mod schema;
pub mod snapshot;
pub mod table;

pub use aggregate::{
    Aggregator, KindSums, RealizedBreakdown, TagAttributes, UnrealizedBreakdown,
};
pub use assemble::{ReportArtifact, ReportAssembler};
pub use error::{ReportBuilderError, Result};
pub use ingestion::*;
pub use keys::{composite_key, ClassifiedLedgerEntry, ClassifiedPosition};
pub use period::ReportingPeriod;
pub use reconcile::{reconcile, GapReport};
pub use schema::*;
pub use snapshot::{ClassifiedSnapshot, ReportingSnapshot};
pub use table::{Cell, ReportTable, TOTAL_LABEL};

use chrono::Datelike;
use log::{info, warn};

/// Termination signal of one pipeline run: either the report artifact is
/// ready, or the gate tripped and only the gap artifact exists.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ReportArtifact),
    MappingGaps(GapReport),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&ReportArtifact> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::MappingGaps(_) => None,
        }
    }

    pub fn gaps(&self) -> Option<&GapReport> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::MappingGaps(gaps) => Some(gaps),
        }
    }
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// Runs the whole pipeline once: staleness checks, classification,
    /// reconciliation gate, aggregation, assembly. No state survives the
    /// call; rerunning with the same snapshot produces the same artifact.
    pub fn run(snapshot: &ReportingSnapshot, period: ReportingPeriod) -> Result<RunOutcome> {
        info!(
            "Report date: {}, year start: {}, previous quarter end: {}, quarter start: {}",
            period.report_date, period.year_start, period.previous_quarter_end, period.quarter_start
        );

        snapshot.ensure_period_data(&period)?;

        let classified = snapshot.classify();
        info!(
            "Classified {} ledger entries, {} positions, {} account balances",
            classified.ledger.len(),
            classified.positions.len(),
            snapshot.account_balances.len()
        );

        let gaps = reconcile::reconcile(&classified);
        if !gaps.is_clean() {
            warn!(
                "Update mapping: {} key space(s) with unmapped facts, no report produced",
                gaps.tables().len()
            );
            return Ok(RunOutcome::MappingGaps(gaps));
        }
        info!("All mappings up to date");

        let assembler = ReportAssembler::new(&classified, period);
        let report = assembler.assemble();
        info!(
            "Assembled {} report tables for {}-Q{}",
            report.tables().len(),
            period.report_date.year(),
            (period.report_date.month0() / 3) + 1
        );

        Ok(RunOutcome::Completed(report))
    }
}

pub fn build_quarterly_report(
    snapshot: &ReportingSnapshot,
    period: ReportingPeriod,
) -> Result<RunOutcome> {
    ReportBuilder::run(snapshot, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn ledger_entry() -> LedgerEntry {
        LedgerEntry {
            booking_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            group_account: "0600".to_string(),
            security_type: "BOND".to_string(),
            investment_class: "FI".to_string(),
            security_id: "SI0001".to_string(),
            maturity_band: "LT".to_string(),
            purpose: "PORTFOLIO".to_string(),
            debit_original: 100.0,
            credit_original: 0.0,
            debit_base: 100.0,
            credit_base: 0.0,
        }
    }

    fn position() -> PositionRecord {
        PositionRecord {
            report_date: report_date(),
            security_id: "SI0001".to_string(),
            isin: "SI0000000001".to_string(),
            investment_name: "Test bond".to_string(),
            investment_type: "L_BONDS".to_string(),
            security_type: "BOND".to_string(),
            maturity_band: "LT".to_string(),
            quotation_currency: "EUR".to_string(),
            nominal_lot_value: 1000.0,
            lots: 3.0,
            acquisition_value_qc: 3000.0,
            acquisition_value_base: 3000.0,
            book_value_qc: 3100.0,
            book_value_base: 3100.0,
            accrued_interest_qc: 10.0,
            accrued_interest_base: 10.0,
            market_value_qc: 3150.0,
            market_value_base: 3150.0,
            coupon_rate: None,
            effective_interest_rate: None,
            coupon_frequency: None,
            purchase_date: None,
            maturity_date: None,
            issuer_rating: None,
            rating_agency: None,
        }
    }

    fn balance() -> LedgerAccountBalance {
        LedgerAccountBalance {
            account_no: "060000".to_string(),
            account_suffix: "00".to_string(),
            account_name: "Participations".to_string(),
            balance: 1200.0,
            last_posting_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        }
    }

    fn covered_snapshot() -> ReportingSnapshot {
        ReportingSnapshot {
            ledger: vec![ledger_entry()],
            positions: vec![position()],
            account_balances: vec![balance()],
            transaction_types: MappingTable::from_rows(
                "transaction types",
                vec![(
                    "0600BONDFI".to_string(),
                    TransactionTypeAttrs {
                        includes_status: true,
                        includes_change: true,
                        unrealized_kind: Some(TransactionKind::AcquisitionValue),
                        realized_kind: Some(RealizedKind::AccountingValue),
                    },
                )],
            )
            .unwrap(),
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
            investments: MappingTable::from_rows(
                "investments",
                vec![(
                    "SI0001BOND".to_string(),
                    InvestmentAttrs {
                        tag: "Bond portfolio".to_string(),
                        ifrs_classification: "FVTPL".to_string(),
                        valuation_method: "Market".to_string(),
                        valuation_method_alt: String::new(),
                        funding_source: "Own funds".to_string(),
                    },
                )],
            )
            .unwrap(),
            ledger_accounts: MappingTable::from_rows(
                "ledger accounts",
                vec![(
                    "06000000Participations".to_string(),
                    RegulatoryAttrs {
                        funding_source: "Own funds".to_string(),
                        ..Default::default()
                    },
                )],
            )
            .unwrap(),
            position_map: MappingTable::from_rows(
                "position map",
                vec![(
                    "SI0001L_BONDSLT".to_string(),
                    RegulatoryAttrs {
                        funding_source: "Own funds".to_string(),
                        ..Default::default()
                    },
                )],
            )
            .unwrap(),
            code_map: BTreeMap::new(),
        }
    }

    #[test]
    fn test_covered_snapshot_completes() {
        let snapshot = covered_snapshot();
        let period = ReportingPeriod::from_report_date(report_date());

        let outcome = build_quarterly_report(&snapshot, period).unwrap();
        assert!(outcome.is_completed());

        let report = outcome.report().unwrap();
        assert_eq!(report.tables().len(), 9);
        assert!(report.table(assemble::UNREALIZED_PROFIT_ALL).is_some());
    }

    #[test]
    fn test_unmapped_key_aborts_with_gap_tables() {
        let mut snapshot = covered_snapshot();
        snapshot.transaction_types = MappingTable::empty("transaction types");
        let period = ReportingPeriod::from_report_date(report_date());

        let outcome = build_quarterly_report(&snapshot, period).unwrap();
        assert!(!outcome.is_completed());

        let gaps = outcome.gaps().unwrap();
        assert_eq!(gaps.tables().len(), 1);
        assert_eq!(
            gaps.tables()[0].name(),
            reconcile::MISSING_TRANSACTION_TYPES
        );
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_stale_snapshot_is_fatal() {
        let snapshot = covered_snapshot();
        // Report one quarter ahead of the data.
        let period = ReportingPeriod::from_report_date(
            NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
        );

        let result = build_quarterly_report(&snapshot, period);
        assert!(matches!(
            result,
            Err(ReportBuilderError::MissingPeriodData { .. })
        ));
    }
}
