use crate::error::{ReportBuilderError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The nine investment categories of the quarterly report, in report row
/// order. The enumeration is closed: every classified fact resolves to
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    LandBuildingsOperating,
    LandBuildingsNonOperating,
    GroupEquityHoldings,
    GroupDebtSecurities,
    DebtSecuritiesUnderOneYear,
    DebtSecuritiesOverOneYear,
    OtherEquityInstruments,
    InvestmentFundShares,
    Derivatives,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::LandBuildingsOperating,
        Category::LandBuildingsNonOperating,
        Category::GroupEquityHoldings,
        Category::GroupDebtSecurities,
        Category::DebtSecuritiesUnderOneYear,
        Category::DebtSecuritiesOverOneYear,
        Category::OtherEquityInstruments,
        Category::InvestmentFundShares,
        Category::Derivatives,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::LandBuildingsOperating => {
                "I. Land and buildings used for operating activities"
            }
            Category::LandBuildingsNonOperating => {
                "II. Land and buildings not used for operating activities"
            }
            Category::GroupEquityHoldings => {
                "III. Shares and other equity interests in group subsidiaries, associates and jointly controlled companies"
            }
            Category::GroupDebtSecurities => {
                "IV. Debt securities issued by group companies"
            }
            Category::DebtSecuritiesUnderOneYear => {
                "V. Debt securities with maturity up to one year (other than those under IV)"
            }
            Category::DebtSecuritiesOverOneYear => {
                "VI. Debt securities with maturity over one year (other than those under IV)"
            }
            Category::OtherEquityInstruments => {
                "VII. Shares and other equity instruments (other than those under III)"
            }
            Category::InvestmentFundShares => {
                "VIII. Shares and units in investment funds (other than those under III)"
            }
            Category::Derivatives => "IX. Derivative financial instruments",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transaction kinds feeding the unrealized (quarter-over-quarter) report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TransactionKind {
    AcquisitionValue,
    RevaluationEffect,
    RevaluationReserve,
    FxDifference,
    Amortization,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        TransactionKind::AcquisitionValue,
        TransactionKind::RevaluationEffect,
        TransactionKind::RevaluationReserve,
        TransactionKind::FxDifference,
        TransactionKind::Amortization,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::AcquisitionValue => {
                "01 Total acquisition cost / accounting value (up to the last valuation date)"
            }
            TransactionKind::RevaluationEffect => "03 Revaluation effect",
            TransactionKind::RevaluationReserve => "04 Revaluation reserve (status)",
            TransactionKind::FxDifference => "06 Net foreign exchange difference",
            TransactionKind::Amortization => {
                "07 Amortisation of discount/premium on instruments with fixed maturity"
            }
        }
    }
}

/// Transaction kinds feeding the realized-profit report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RealizedKind {
    AccountingValue,
    RealizedProfitLoss,
}

impl RealizedKind {
    pub fn label(&self) -> &'static str {
        match self {
            RealizedKind::AccountingValue => "Accounting value",
            RealizedKind::RealizedProfitLoss => "Realised profit (loss)",
        }
    }
}

/// One general-ledger booking row, as delivered by the fact source.
/// Immutable after load; derived keys and joined attributes live on
/// `ClassifiedLedgerEntry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerEntry {
    pub booking_date: NaiveDate,
    pub group_account: String,
    pub security_type: String,
    pub investment_class: String,
    pub security_id: String,
    pub maturity_band: String,
    pub purpose: String,
    pub debit_original: f64,
    pub credit_original: f64,
    pub debit_base: f64,
    pub credit_base: f64,
}

impl LedgerEntry {
    /// Point-in-time balance measure of this booking.
    pub fn balance_status(&self) -> f64 {
        self.debit_base - self.credit_base
    }

    /// Period-delta measure: the balance with its booking sign flipped.
    pub fn balance_change(&self) -> f64 {
        -self.balance_status()
    }
}

/// One investment position as of the report date. Consolidates the position
/// list and the per-report-date holding snapshot of the upstream system:
/// lot counts, valuation figures and the classification key fields all live
/// on one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PositionRecord {
    pub report_date: NaiveDate,
    pub security_id: String,
    pub isin: String,
    pub investment_name: String,
    pub investment_type: String,
    pub security_type: String,
    pub maturity_band: String,
    pub quotation_currency: String,
    pub nominal_lot_value: f64,
    pub lots: f64,
    pub acquisition_value_qc: f64,
    pub acquisition_value_base: f64,
    pub book_value_qc: f64,
    pub book_value_base: f64,
    pub accrued_interest_qc: f64,
    pub accrued_interest_base: f64,
    pub market_value_qc: f64,
    pub market_value_base: f64,
    pub coupon_rate: Option<f64>,
    pub effective_interest_rate: Option<f64>,
    pub coupon_frequency: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub issuer_rating: Option<String>,
    pub rating_agency: Option<String>,
}

impl PositionRecord {
    pub fn accounting_value_base(&self) -> f64 {
        self.book_value_base + self.accrued_interest_base
    }

    pub fn accounting_value_original(&self) -> f64 {
        self.book_value_qc + self.accrued_interest_qc
    }
}

/// One pre-aggregated general-ledger account balance: the cumulative balance
/// of all postings up to the report date, with the latest contributing
/// posting date retained for the staleness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerAccountBalance {
    pub account_no: String,
    pub account_suffix: String,
    pub account_name: String,
    pub balance: f64,
    pub last_posting_date: NaiveDate,
}

/// Attributes behind the transaction-type key space. Maintained by hand;
/// the JSON Schema of this type is the validation contract for that file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionTypeAttrs {
    #[schemars(description = "Whether bookings of this type contribute to as-of-quarter status sums")]
    pub includes_status: bool,

    #[schemars(description = "Whether bookings of this type contribute to within-quarter change sums")]
    pub includes_change: bool,

    #[schemars(description = "Transaction kind for the unrealized (quarter-over-quarter) report, if any")]
    pub unrealized_kind: Option<TransactionKind>,

    #[schemars(description = "Transaction kind for the realized-profit report, if any")]
    pub realized_kind: Option<RealizedKind>,
}

/// Attributes behind the investment-type key space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestmentTypeAttrs {
    #[schemars(description = "Report category this investment type rolls up into")]
    pub category: Category,
}

/// Attributes behind the investment/security key space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestmentAttrs {
    #[schemars(description = "Instrument-group label used by the detailed report rows")]
    pub tag: String,
    pub ifrs_classification: String,
    pub valuation_method: String,
    #[schemars(description = "Alternate valuation method, when the primary one does not apply")]
    pub valuation_method_alt: String,
    pub funding_source: String,
}

/// Descriptive attribute set shared by the ledger-account and position key
/// spaces, feeding the cross-source lookup reports. The optional fields are
/// populated only by the ledger-account table; position rows read them from
/// the position record itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RegulatoryAttrs {
    pub funding_source: String,
    pub company_type: String,
    pub company_subtype: String,
    pub guarantee: String,
    pub issuer_name: String,
    pub issuer_name_alt: String,
    pub sector: String,
    pub characteristic: String,
    pub ifrs_classification: String,
    pub valuation_method: String,
    pub issuer_country: String,
    pub trading_country: String,
    pub regulated_market: String,
    pub valuation_source: String,
    pub coupon_type: String,
    pub isin: Option<String>,
    pub quantity: Option<f64>,
    pub currency: Option<String>,
}

/// A hand-maintained lookup table over one key space. Keys are unique;
/// a duplicate is a fatal load error, not a silent overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTable<T> {
    name: String,
    rows: BTreeMap<String, T>,
}

impl<T> MappingTable<T> {
    pub fn from_rows(
        name: impl Into<String>,
        rows: impl IntoIterator<Item = (String, T)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut map = BTreeMap::new();

        for (key, attrs) in rows {
            if map.insert(key.clone(), attrs).is_some() {
                return Err(ReportBuilderError::DuplicateMappingKey { table: name, key });
            }
        }

        Ok(Self { name, rows: map })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.rows.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// JSON Schema for a mapping-row type, for validating the hand-edited
/// mapping files in maintenance tooling.
pub fn mapping_row_schema_json<T: JsonSchema>() -> Result<String> {
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    Ok(serde_json::to_string_pretty(&schema)?)
}
