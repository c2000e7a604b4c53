//! Conversion of untyped, string-keyed source rows (as produced by a
//! database driver or CSV reader) into the typed snapshot records. Missing
//! columns and unparseable cells are fatal and reported with the offending
//! table and column.

use crate::error::{ReportBuilderError, Result};
use crate::schema::{LedgerAccountBalance, LedgerEntry, PositionRecord};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub type RawRow = BTreeMap<String, String>;

pub fn ledger_entry_from_row(table: &str, row: &RawRow) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        booking_date: parse_date(table, "BOOKING_DATE", require(table, row, "BOOKING_DATE")?)?,
        group_account: require(table, row, "GROUP_ACCOUNT")?.to_string(),
        security_type: require(table, row, "SECURITY_TYPE")?.to_string(),
        investment_class: require(table, row, "INVESTMENT_CLASS")?.to_string(),
        security_id: require(table, row, "SECURITY_ID")?.to_string(),
        maturity_band: require(table, row, "MATURITY_BAND")?.to_string(),
        purpose: require(table, row, "PURPOSE")?.to_string(),
        debit_original: parse_number(table, "DEBIT_ORIGINAL", require(table, row, "DEBIT_ORIGINAL")?)?,
        credit_original: parse_number(
            table,
            "CREDIT_ORIGINAL",
            require(table, row, "CREDIT_ORIGINAL")?,
        )?,
        debit_base: parse_number(table, "DEBIT_BASE", require(table, row, "DEBIT_BASE")?)?,
        credit_base: parse_number(table, "CREDIT_BASE", require(table, row, "CREDIT_BASE")?)?,
    })
}

pub fn position_from_row(table: &str, row: &RawRow) -> Result<PositionRecord> {
    Ok(PositionRecord {
        report_date: parse_date(table, "REPORT_DATE", require(table, row, "REPORT_DATE")?)?,
        security_id: require(table, row, "SECURITY_ID")?.to_string(),
        isin: require(table, row, "ISIN")?.to_string(),
        investment_name: require(table, row, "INVESTMENT_NAME")?.to_string(),
        investment_type: require(table, row, "INVESTMENT_TYPE")?.to_string(),
        security_type: require(table, row, "SECURITY_TYPE")?.to_string(),
        maturity_band: require(table, row, "MATURITY_BAND")?.to_string(),
        quotation_currency: require(table, row, "QUOTATION_CURRENCY")?.to_string(),
        nominal_lot_value: parse_number(
            table,
            "NOMINAL_LOT_VALUE",
            require(table, row, "NOMINAL_LOT_VALUE")?,
        )?,
        lots: parse_number(table, "NUMBER_OF_LOTS", require(table, row, "NUMBER_OF_LOTS")?)?,
        acquisition_value_qc: parse_number(
            table,
            "ACQUISITION_VALUE_QC",
            require(table, row, "ACQUISITION_VALUE_QC")?,
        )?,
        acquisition_value_base: parse_number(
            table,
            "ACQUISITION_VALUE_BASE",
            require(table, row, "ACQUISITION_VALUE_BASE")?,
        )?,
        book_value_qc: parse_number(table, "BOOK_VALUE_QC", require(table, row, "BOOK_VALUE_QC")?)?,
        book_value_base: parse_number(
            table,
            "BOOK_VALUE_BASE",
            require(table, row, "BOOK_VALUE_BASE")?,
        )?,
        accrued_interest_qc: parse_number(
            table,
            "ACCRUED_INTEREST_QC",
            require(table, row, "ACCRUED_INTEREST_QC")?,
        )?,
        accrued_interest_base: parse_number(
            table,
            "ACCRUED_INTEREST_BASE",
            require(table, row, "ACCRUED_INTEREST_BASE")?,
        )?,
        market_value_qc: parse_number(
            table,
            "MARKET_VALUE_QC",
            require(table, row, "MARKET_VALUE_QC")?,
        )?,
        market_value_base: parse_number(
            table,
            "MARKET_VALUE_BASE",
            require(table, row, "MARKET_VALUE_BASE")?,
        )?,
        coupon_rate: optional_number(table, "COUPON_RATE", row)?,
        effective_interest_rate: optional_number(table, "EFFECTIVE_INTEREST_RATE", row)?,
        coupon_frequency: optional_text(row, "COUPON_FREQUENCY"),
        purchase_date: optional_date(table, "PURCHASE_DATE", row)?,
        maturity_date: optional_date(table, "MATURITY_DATE", row)?,
        issuer_rating: optional_text(row, "ISSUER_RATING"),
        rating_agency: optional_text(row, "RATING_AGENCY"),
    })
}

pub fn account_balance_from_row(table: &str, row: &RawRow) -> Result<LedgerAccountBalance> {
    Ok(LedgerAccountBalance {
        account_no: require(table, row, "ACCOUNT_NO")?.to_string(),
        account_suffix: require(table, row, "ACCOUNT_SUFFIX")?.to_string(),
        account_name: require(table, row, "ACCOUNT_NAME")?.to_string(),
        balance: parse_number(table, "BALANCE", require(table, row, "BALANCE")?)?,
        last_posting_date: parse_date(
            table,
            "LAST_POSTING_DATE",
            require(table, row, "LAST_POSTING_DATE")?,
        )?,
    })
}

fn require<'a>(table: &str, row: &'a RawRow, column: &str) -> Result<&'a str> {
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| ReportBuilderError::SchemaViolation {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn parse_number(table: &str, column: &str, value: &str) -> Result<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    trimmed
        .parse()
        .map_err(|_| ReportBuilderError::InvalidValue {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_date(table: &str, column: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ReportBuilderError::InvalidValue {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        }
    })
}

fn optional_number(table: &str, column: &str, row: &RawRow) -> Result<Option<f64>> {
    match row.get(column).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => parse_number(table, column, value).map(Some),
    }
}

fn optional_date(table: &str, column: &str, row: &RawRow) -> Result<Option<NaiveDate>> {
    match row.get(column).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(table, column, value).map(Some),
    }
}

fn optional_text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_row() -> RawRow {
        let mut row = RawRow::new();
        row.insert("BOOKING_DATE".to_string(), "2025-06-10".to_string());
        row.insert("GROUP_ACCOUNT".to_string(), "0600".to_string());
        row.insert("SECURITY_TYPE".to_string(), "BOND".to_string());
        row.insert("INVESTMENT_CLASS".to_string(), "FI".to_string());
        row.insert("SECURITY_ID".to_string(), "SI0001".to_string());
        row.insert("MATURITY_BAND".to_string(), "LT".to_string());
        row.insert("PURPOSE".to_string(), "PORTFOLIO".to_string());
        row.insert("DEBIT_ORIGINAL".to_string(), "120.5".to_string());
        row.insert("CREDIT_ORIGINAL".to_string(), "".to_string());
        row.insert("DEBIT_BASE".to_string(), "120.5".to_string());
        row.insert("CREDIT_BASE".to_string(), "20".to_string());
        row
    }

    #[test]
    fn test_ledger_entry_parses() {
        let entry = ledger_entry_from_row("ledger entries", &ledger_row()).unwrap();
        assert_eq!(entry.group_account, "0600");
        assert_eq!(entry.credit_original, 0.0);
        assert_eq!(entry.balance_status(), 100.5);
    }

    #[test]
    fn test_missing_column_is_schema_violation() {
        let mut row = ledger_row();
        row.remove("SECURITY_ID");

        match ledger_entry_from_row("ledger entries", &row) {
            Err(ReportBuilderError::SchemaViolation { table, column }) => {
                assert_eq!(table, "ledger entries");
                assert_eq!(column, "SECURITY_ID");
            }
            other => panic!("expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_number_is_invalid_value() {
        let mut row = ledger_row();
        row.insert("DEBIT_BASE".to_string(), "abc".to_string());

        match ledger_entry_from_row("ledger entries", &row) {
            Err(ReportBuilderError::InvalidValue { column, value, .. }) => {
                assert_eq!(column, "DEBIT_BASE");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_date_is_invalid_value() {
        let mut row = ledger_row();
        row.insert("BOOKING_DATE".to_string(), "10.06.2025".to_string());
        assert!(ledger_entry_from_row("ledger entries", &row).is_err());
    }
}
