use crate::keys::{ClassifiedLedgerEntry, ClassifiedPosition};
use crate::period::ReportingPeriod;
use crate::schema::{Category, RealizedKind, TransactionKind};
use crate::snapshot::ClassifiedSnapshot;
use crate::table::normalize_zero;
use std::collections::BTreeSet;

/// Status/change sums of one transaction kind for one category or tag.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KindSums {
    pub status: f64,
    pub change: f64,
}

impl KindSums {
    pub fn total(&self) -> f64 {
        normalize_zero(self.status + self.change)
    }
}

/// The five-kind breakdown behind one unrealized report row. The
/// revaluation-reserve status sum is stored already negated: mapping-table
/// balances carry the opposite sign to the report sign for that kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnrealizedBreakdown {
    pub acquisition: KindSums,
    pub revaluation: KindSums,
    pub revaluation_reserve: KindSums,
    pub fx: KindSums,
    pub amortization: KindSums,
}

impl UnrealizedBreakdown {
    pub fn revaluation_effect(&self) -> f64 {
        normalize_zero(self.revaluation_reserve.change + self.revaluation.change)
    }

    /// The derived fair-value line. There is no independent computation
    /// path: every consumer reads this formula.
    pub fn objective_value(&self) -> f64 {
        normalize_zero(
            self.acquisition.status
                + self.acquisition.change
                + self.revaluation_effect()
                + self.fx.status
                + self.fx.change
                + self.amortization.status
                + self.amortization.change,
        )
    }
}

/// The sums behind one realized-profit report row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealizedBreakdown {
    pub share_count: f64,
    pub accounting_value: f64,
    /// Already sign-flipped: bookings carry realized profit as a credit.
    pub realized_pnl: f64,
}

impl RealizedBreakdown {
    pub fn sell_value(&self) -> f64 {
        normalize_zero(self.accounting_value + self.realized_pnl)
    }
}

/// Descriptive attributes attached to a detailed report row, resolved by
/// the explicit tie-break policy: first row in source order wins. Rows
/// sharing a tag are assumed to agree on these; divergent data resolves to
/// the first occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagAttributes {
    pub ifrs_classification: String,
    pub valuation_method: String,
    pub valuation_method_alt: String,
    pub funding_source: String,
}

/// Read-only windowed views over the classified ledger and positions. The
/// three views are built once per run from the shared period boundaries;
/// every category/tag sum filters one of them.
pub struct Aggregator<'a> {
    status_rows: Vec<&'a ClassifiedLedgerEntry<'a>>,
    change_rows: Vec<&'a ClassifiedLedgerEntry<'a>>,
    realized_rows: Vec<&'a ClassifiedLedgerEntry<'a>>,
    positions: &'a [ClassifiedPosition<'a>],
}

impl<'a> Aggregator<'a> {
    pub fn new(classified: &'a ClassifiedSnapshot<'a>, period: &ReportingPeriod) -> Self {
        let status_rows = classified
            .ledger
            .iter()
            .filter(|e| period.in_status_window(e.entry.booking_date) && e.includes_status())
            .collect();

        let change_rows: Vec<&ClassifiedLedgerEntry<'_>> = classified
            .ledger
            .iter()
            .filter(|e| period.in_change_window(e.entry.booking_date) && e.includes_change())
            .collect();

        let realized_rows = classified
            .ledger
            .iter()
            .filter(|e| period.in_realized_window(e.entry.booking_date))
            .collect();

        Self {
            status_rows,
            change_rows,
            realized_rows,
            positions: &classified.positions,
        }
    }

    pub fn unrealized_for_category(&self, category: Category) -> UnrealizedBreakdown {
        self.unrealized(|e| e.category == Some(category))
    }

    pub fn unrealized_for_tag(&self, category: Category, tag: &str) -> UnrealizedBreakdown {
        self.unrealized(|e| e.category == Some(category) && e.tag() == Some(tag))
    }

    fn unrealized(&self, matches: impl Fn(&ClassifiedLedgerEntry<'_>) -> bool) -> UnrealizedBreakdown {
        let sums = |kind: TransactionKind| {
            let status = normalize_zero(
                self.status_rows
                    .iter()
                    .filter(|e| e.unrealized_kind() == Some(kind) && matches(e))
                    .map(|e| e.entry.balance_status())
                    .sum(),
            );
            let change = normalize_zero(
                self.change_rows
                    .iter()
                    .filter(|e| e.unrealized_kind() == Some(kind) && matches(e))
                    .map(|e| e.entry.balance_change())
                    .sum(),
            );
            KindSums { status, change }
        };

        let mut revaluation_reserve = sums(TransactionKind::RevaluationReserve);
        revaluation_reserve.status = normalize_zero(-revaluation_reserve.status);

        UnrealizedBreakdown {
            acquisition: sums(TransactionKind::AcquisitionValue),
            revaluation: sums(TransactionKind::RevaluationEffect),
            revaluation_reserve,
            fx: sums(TransactionKind::FxDifference),
            amortization: sums(TransactionKind::Amortization),
        }
    }

    /// Distinct tags of a category, drawn from the current-quarter change
    /// rows, in sorted order.
    pub fn tags_in_category(&self, category: Category) -> Vec<String> {
        let tags: BTreeSet<&str> = self
            .change_rows
            .iter()
            .filter(|e| e.category == Some(category))
            .filter_map(|e| e.tag())
            .collect();
        tags.into_iter().map(str::to_string).collect()
    }

    /// Descriptive attributes for a detailed row: first change-window row
    /// in source order carrying the tag wins.
    pub fn tag_attributes(&self, category: Category, tag: &str) -> Option<TagAttributes> {
        first_attributes(&self.change_rows, category, tag)
    }

    pub fn realized_for_category(&self, category: Category) -> RealizedBreakdown {
        self.realized(
            |e| e.category == Some(category),
            |p| p.category == Some(category),
        )
    }

    pub fn realized_for_tag(&self, category: Category, tag: &str) -> RealizedBreakdown {
        self.realized(
            |e| e.category == Some(category) && e.tag() == Some(tag),
            |p| p.category == Some(category) && p.tag == Some(tag),
        )
    }

    fn realized(
        &self,
        matches: impl Fn(&ClassifiedLedgerEntry<'_>) -> bool,
        matches_position: impl Fn(&ClassifiedPosition<'_>) -> bool,
    ) -> RealizedBreakdown {
        let accounting_value = normalize_zero(
            self.realized_rows
                .iter()
                .filter(|e| e.realized_kind() == Some(RealizedKind::AccountingValue) && matches(e))
                .map(|e| e.entry.balance_status())
                .sum(),
        );

        let realized_pnl = normalize_zero(
            -self
                .realized_rows
                .iter()
                .filter(|e| {
                    e.realized_kind() == Some(RealizedKind::RealizedProfitLoss) && matches(e)
                })
                .map(|e| e.entry.balance_status())
                .sum::<f64>(),
        );

        let share_count = normalize_zero(
            self.positions
                .iter()
                .filter(|p| matches_position(p))
                .map(|p| p.position.lots)
                .sum(),
        );

        RealizedBreakdown {
            share_count,
            accounting_value,
            realized_pnl,
        }
    }

    /// Distinct tags among the realized-window rows of a category, sorted.
    pub fn realized_tags(&self, category: Category) -> Vec<String> {
        let tags: BTreeSet<&str> = self
            .realized_rows
            .iter()
            .filter(|e| e.category == Some(category))
            .filter_map(|e| e.tag())
            .collect();
        tags.into_iter().map(str::to_string).collect()
    }

    pub fn realized_tag_attributes(&self, category: Category, tag: &str) -> Option<TagAttributes> {
        first_attributes(&self.realized_rows, category, tag)
    }
}

fn first_attributes(
    rows: &[&ClassifiedLedgerEntry<'_>],
    category: Category,
    tag: &str,
) -> Option<TagAttributes> {
    rows.iter()
        .find(|e| e.category == Some(category) && e.tag() == Some(tag))
        .and_then(|e| e.investment)
        .map(|attrs| TagAttributes {
            ifrs_classification: attrs.ifrs_classification.clone(),
            valuation_method: attrs.valuation_method.clone(),
            valuation_method_alt: attrs.valuation_method_alt.clone(),
            funding_source: attrs.funding_source.clone(),
        })
}
