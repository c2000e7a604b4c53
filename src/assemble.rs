use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::keys::ClassifiedPosition;
use crate::period::ReportingPeriod;
use crate::schema::{Category, LedgerAccountBalance, RegulatoryAttrs};
use crate::snapshot::{ClassifiedSnapshot, ReportingSnapshot};
use crate::table::{Cell, ReportTable};
use log::debug;

pub const REALIZED_PROFIT_ALL: &str = "REALIZED_PROFIT_ALL";
pub const REALIZED_PROFIT_FUND_SHARES: &str = "REALIZED_PROFIT_FUND_SHARES";
pub const UNREALIZED_PROFIT_ALL: &str = "UNREALIZED_PROFIT_ALL";
pub const UNREALIZED_PROFIT_FUND_SHARES: &str = "UNREALIZED_PROFIT_FUND_SHARES";
pub const UNREALIZED_PROFIT_BONDS_UNDER_1Y: &str = "UNREALIZED_PROFIT_BONDS_UNDER_1Y";
pub const UNREALIZED_PROFIT_BONDS_OVER_1Y: &str = "UNREALIZED_PROFIT_BONDS_OVER_1Y";
pub const LEDGER_ACCOUNT_LOOKUP: &str = "LEDGER_ACCOUNT_LOOKUP";
pub const POSITION_LOOKUP: &str = "POSITION_LOOKUP";
pub const COMBINED_LOOKUP: &str = "COMBINED_LOOKUP";

/// Accounts whose cumulative balance is revaluation recognised in equity;
/// the lookup reports show their acquisition value as zero.
const ZERO_ACQUISITION_ACCOUNTS: &[&str] = &["020300", "020380", "021307", "021387", "0213901"];

/// Positions quoted per cent rather than per lot; their lot counts are
/// scaled down to units.
const PERCENT_QUOTED_LOT_VALUE: f64 = 100.0;

const UNREALIZED_VALUE_COLUMNS: [&str; 7] = [
    "Total acquisition cost / accounting value",
    "Objective value at last valuation date",
    "Revaluation effect",
    "Revaluation reserve (status)",
    "Value adjustment recognised directly in profit or loss",
    "Net foreign exchange difference",
    "Amortisation of discount/premium",
];

const LOOKUP_COLUMNS: [&str; 31] = [
    "Funding source",
    "Company type",
    "Company subtype",
    "Guarantee",
    "Issuer name",
    "Issuer name (if different)",
    "Sector",
    "ISIN",
    "Characteristic",
    "Quantity",
    "IFRS classification",
    "Valuation method",
    "Issuer country",
    "Trading country",
    "Regulated market",
    "Valuation source",
    "Acquisition value",
    "Accrued interest",
    "Amortised cost",
    "Objective value",
    "Accounting value",
    "Accounting value (original currency)",
    "Currency",
    "Coupon type",
    "Coupon frequency",
    "Interest rate",
    "Effective interest rate",
    "Purchase date",
    "Maturity date",
    "Rating",
    "Rating agency",
];

/// The finished report: all named tables in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    tables: Vec<ReportTable>,
}

impl ReportArtifact {
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

/// Builds the named output tables from the aggregated sums and the lookup
/// joins. Runs only after the reconciliation gate has passed.
pub struct ReportAssembler<'a> {
    classified: &'a ClassifiedSnapshot<'a>,
    aggregator: Aggregator<'a>,
    period: ReportingPeriod,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(classified: &'a ClassifiedSnapshot<'a>, period: ReportingPeriod) -> Self {
        Self {
            classified,
            aggregator: Aggregator::new(classified, &period),
            period,
        }
    }

    pub fn assemble(&self) -> ReportArtifact {
        let tables = vec![
            self.realized_all(),
            self.realized_fund_shares(),
            self.unrealized_all(),
            self.unrealized_detail(
                UNREALIZED_PROFIT_FUND_SHARES,
                Category::InvestmentFundShares,
            ),
            self.unrealized_detail(
                UNREALIZED_PROFIT_BONDS_UNDER_1Y,
                Category::DebtSecuritiesUnderOneYear,
            ),
            self.unrealized_detail(
                UNREALIZED_PROFIT_BONDS_OVER_1Y,
                Category::DebtSecuritiesOverOneYear,
            ),
            self.ledger_account_lookup(),
            self.position_lookup(),
            self.combined_lookup(),
        ];

        for table in &tables {
            debug!("Assembled table {} ({} rows)", table.name(), table.rows().len());
        }

        ReportArtifact { tables }
    }

    fn realized_all(&self) -> ReportTable {
        let mut table = ReportTable::new(
            REALIZED_PROFIT_ALL,
            &[
                "Category",
                "Number of securities",
                "Accounting value",
                "Sale value",
                "Realised profit (loss)",
            ],
        );

        for category in Category::ALL {
            let realized = self.aggregator.realized_for_category(category);
            table.push_row(vec![
                Cell::text(category.label()),
                Cell::number(realized.share_count),
                Cell::number(realized.accounting_value),
                Cell::number(realized.sell_value()),
                Cell::number(realized.realized_pnl),
            ]);
        }

        table.with_total_row()
    }

    fn realized_fund_shares(&self) -> ReportTable {
        let category = Category::InvestmentFundShares;
        let mut table = ReportTable::new(
            REALIZED_PROFIT_FUND_SHARES,
            &[
                "Tag",
                "IFRS classification",
                "Number of securities",
                "Accounting value",
                "Sale value",
                "Realised profit (loss)",
                "Funding source",
            ],
        );

        for tag in self.aggregator.realized_tags(category) {
            let attrs = self
                .aggregator
                .realized_tag_attributes(category, &tag)
                .unwrap_or_default();
            let realized = self.aggregator.realized_for_tag(category, &tag);

            table.push_row(vec![
                Cell::text(&tag),
                Cell::text_or_blank(&attrs.ifrs_classification),
                Cell::number(realized.share_count),
                Cell::number(realized.accounting_value),
                Cell::number(realized.sell_value()),
                Cell::number(realized.realized_pnl),
                Cell::text_or_blank(&attrs.funding_source),
            ]);
        }

        table
    }

    fn unrealized_all(&self) -> ReportTable {
        let columns: Vec<&str> = std::iter::once("Category")
            .chain(UNREALIZED_VALUE_COLUMNS)
            .collect();
        let mut table = ReportTable::new(UNREALIZED_PROFIT_ALL, &columns);

        for category in Category::ALL {
            let b = self.aggregator.unrealized_for_category(category);
            table.push_row(vec![
                Cell::text(category.label()),
                Cell::number(b.acquisition.total()),
                Cell::number(b.objective_value()),
                Cell::number(b.revaluation_effect()),
                Cell::number(b.revaluation_reserve.total()),
                Cell::Blank,
                Cell::number(b.fx.total()),
                Cell::number(b.amortization.total()),
            ]);
        }

        table.with_total_row()
    }

    fn unrealized_detail(&self, name: &str, category: Category) -> ReportTable {
        let columns: Vec<&str> = [
            "Tag",
            "IFRS classification",
            "Valuation method",
            "Valuation method (if other)",
            "Last valuation date",
        ]
        .into_iter()
        .chain(UNREALIZED_VALUE_COLUMNS)
        .chain(["Funding source"])
        .collect();
        let mut table = ReportTable::new(name, &columns);

        for tag in self.aggregator.tags_in_category(category) {
            let attrs = self
                .aggregator
                .tag_attributes(category, &tag)
                .unwrap_or_default();
            let b = self.aggregator.unrealized_for_tag(category, &tag);

            table.push_row(vec![
                Cell::text(&tag),
                Cell::text_or_blank(&attrs.ifrs_classification),
                Cell::text_or_blank(&attrs.valuation_method),
                Cell::text_or_blank(&attrs.valuation_method_alt),
                Cell::Date(self.period.report_date),
                Cell::number(b.acquisition.total()),
                Cell::number(b.objective_value()),
                Cell::number(b.revaluation_effect()),
                Cell::number(b.revaluation_reserve.total()),
                Cell::Blank,
                Cell::number(b.fx.total()),
                Cell::number(b.amortization.total()),
                Cell::text_or_blank(&attrs.funding_source),
            ]);
        }

        table
    }

    fn ledger_account_lookup(&self) -> ReportTable {
        let mut table = ReportTable::new(LEDGER_ACCOUNT_LOOKUP, &LOOKUP_COLUMNS);
        let snapshot = self.classified.snapshot;

        for balance in &snapshot.account_balances {
            let Some(attrs) = snapshot.ledger_accounts.get(&balance.account_key()) else {
                continue;
            };
            if attrs.funding_source.trim().is_empty() {
                continue;
            }
            table.push_row(ledger_account_row(balance, attrs));
        }

        table
    }

    fn position_lookup(&self) -> ReportTable {
        let mut table = ReportTable::new(POSITION_LOOKUP, &LOOKUP_COLUMNS);
        let snapshot = self.classified.snapshot;

        for position in &self.classified.positions {
            let Some(attrs) = position.attrs else {
                continue;
            };
            if attrs.funding_source.trim().is_empty() {
                continue;
            }
            table.push_row(position_row(position, attrs, snapshot));
        }

        table
    }

    /// Ledger-account rows followed by position rows, one column layout.
    fn combined_lookup(&self) -> ReportTable {
        let mut table = ReportTable::new(COMBINED_LOOKUP, &LOOKUP_COLUMNS);

        for source in [self.ledger_account_lookup(), self.position_lookup()] {
            for row in source.rows() {
                table.push_row(row.clone());
            }
        }

        table
    }
}

fn ledger_account_row(balance: &LedgerAccountBalance, attrs: &RegulatoryAttrs) -> Vec<Cell> {
    let acquisition_value = if ZERO_ACQUISITION_ACCOUNTS.contains(&balance.account_no.as_str()) {
        0.0
    } else {
        balance.balance
    };

    vec![
        Cell::text(&attrs.funding_source),
        Cell::text_or_blank(&attrs.company_type),
        Cell::text_or_blank(&attrs.company_subtype),
        Cell::text_or_blank(&attrs.guarantee),
        Cell::text_or_blank(&attrs.issuer_name),
        Cell::text_or_blank(&attrs.issuer_name_alt),
        Cell::text_or_blank(&attrs.sector),
        option_text(&attrs.isin),
        Cell::text_or_blank(&attrs.characteristic),
        attrs.quantity.map(Cell::number).unwrap_or(Cell::Blank),
        Cell::text_or_blank(&attrs.ifrs_classification),
        Cell::text_or_blank(&attrs.valuation_method),
        Cell::text_or_blank(&attrs.issuer_country),
        Cell::text_or_blank(&attrs.trading_country),
        Cell::text_or_blank(&attrs.regulated_market),
        Cell::text_or_blank(&attrs.valuation_source),
        Cell::number(acquisition_value),
        Cell::Blank,
        Cell::Blank,
        Cell::number(balance.balance),
        Cell::number(balance.balance),
        Cell::number(balance.balance),
        option_text(&attrs.currency),
        Cell::text_or_blank(&attrs.coupon_type),
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
    ]
}

fn position_row(
    position: &ClassifiedPosition<'_>,
    attrs: &RegulatoryAttrs,
    snapshot: &ReportingSnapshot,
) -> Vec<Cell> {
    let record = position.position;
    let lots = if record.nominal_lot_value == PERCENT_QUOTED_LOT_VALUE {
        record.lots / PERCENT_QUOTED_LOT_VALUE
    } else {
        record.lots
    };

    vec![
        Cell::text(&attrs.funding_source),
        Cell::text_or_blank(&attrs.company_type),
        Cell::text_or_blank(&attrs.company_subtype),
        Cell::text_or_blank(&attrs.guarantee),
        Cell::text_or_blank(&attrs.issuer_name),
        Cell::text_or_blank(&attrs.issuer_name_alt),
        Cell::text_or_blank(&attrs.sector),
        Cell::text_or_blank(&record.isin),
        Cell::text_or_blank(&attrs.characteristic),
        Cell::number(lots),
        Cell::text_or_blank(&attrs.ifrs_classification),
        Cell::text_or_blank(&attrs.valuation_method),
        Cell::text_or_blank(&attrs.issuer_country),
        Cell::text_or_blank(&attrs.trading_country),
        Cell::text_or_blank(&attrs.regulated_market),
        Cell::text_or_blank(&attrs.valuation_source),
        Cell::number(record.acquisition_value_base),
        Cell::number(record.accrued_interest_base),
        Cell::Blank,
        Cell::number(record.accounting_value_base()),
        Cell::number(record.accounting_value_base()),
        Cell::number(record.accounting_value_original()),
        Cell::text(snapshot.code_label(&record.quotation_currency)),
        Cell::text_or_blank(&attrs.coupon_type),
        option_text(&record.coupon_frequency),
        record.coupon_rate.map(Cell::number).unwrap_or(Cell::Blank),
        record
            .effective_interest_rate
            .map(Cell::number)
            .unwrap_or(Cell::Blank),
        record.purchase_date.map(Cell::Date).unwrap_or(Cell::Blank),
        record.maturity_date.map(Cell::Date).unwrap_or(Cell::Blank),
        option_text(&record.issuer_rating),
        record
            .rating_agency
            .as_deref()
            .map(|code| Cell::text(snapshot.code_label(code)))
            .unwrap_or(Cell::Blank),
    ]
}

fn option_text(value: &Option<String>) -> Cell {
    value
        .as_deref()
        .map(Cell::text_or_blank)
        .unwrap_or(Cell::Blank)
}
