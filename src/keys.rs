use crate::schema::{
    Category, InvestmentAttrs, InvestmentTypeAttrs, LedgerAccountBalance, LedgerEntry,
    MappingTable, PositionRecord, RealizedKind, RegulatoryAttrs, TransactionKind,
    TransactionTypeAttrs,
};

/// Concatenates the string form of an ordered field list into one
/// classification key, trimming surrounding whitespace from the result.
/// No separator is inserted; the same field list must be used on the fact
/// and the mapping side for a coverage check to be meaningful.
pub fn composite_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = String::new();
    for part in parts {
        key.push_str(part);
    }
    key.trim().to_string()
}

impl LedgerEntry {
    /// Key into the transaction-type mapping table.
    pub fn transaction_key(&self) -> String {
        composite_key([
            self.group_account.as_str(),
            self.security_type.as_str(),
            self.investment_class.as_str(),
        ])
    }

    /// Key into the investment-type mapping table.
    pub fn investment_type_key(&self) -> String {
        composite_key([self.security_type.as_str(), self.maturity_band.as_str()])
    }

    /// Key into the investment/security mapping table.
    pub fn investment_key(&self) -> String {
        composite_key([self.security_id.as_str(), self.security_type.as_str()])
    }
}

impl PositionRecord {
    /// Key into the position-level mapping table.
    pub fn position_key(&self) -> String {
        composite_key([
            self.security_id.as_str(),
            self.investment_type.as_str(),
            self.maturity_band.as_str(),
        ])
    }

    pub fn investment_type_key(&self) -> String {
        composite_key([self.security_type.as_str(), self.maturity_band.as_str()])
    }

    pub fn investment_key(&self) -> String {
        composite_key([self.security_id.as_str(), self.security_type.as_str()])
    }
}

impl LedgerAccountBalance {
    /// Key into the ledger-account mapping table.
    pub fn account_key(&self) -> String {
        composite_key([
            self.account_no.as_str(),
            self.account_suffix.as_str(),
            self.account_name.as_str(),
        ])
    }
}

/// A ledger entry with its derived keys and the mapping attributes each key
/// resolved to. The raw row is borrowed, never mutated; an unresolved key
/// space is `None` and surfaces through the reconciliation gate.
#[derive(Debug, Clone)]
pub struct ClassifiedLedgerEntry<'a> {
    pub entry: &'a LedgerEntry,
    pub transaction_key: String,
    pub investment_type_key: String,
    pub investment_key: String,
    pub transaction: Option<&'a TransactionTypeAttrs>,
    pub category: Option<Category>,
    pub investment: Option<&'a InvestmentAttrs>,
}

impl<'a> ClassifiedLedgerEntry<'a> {
    pub fn includes_status(&self) -> bool {
        self.transaction.is_some_and(|t| t.includes_status)
    }

    pub fn includes_change(&self) -> bool {
        self.transaction.is_some_and(|t| t.includes_change)
    }

    pub fn unrealized_kind(&self) -> Option<TransactionKind> {
        self.transaction.and_then(|t| t.unrealized_kind)
    }

    pub fn realized_kind(&self) -> Option<RealizedKind> {
        self.transaction.and_then(|t| t.realized_kind)
    }

    pub fn tag(&self) -> Option<&'a str> {
        self.investment.map(|i| i.tag.as_str())
    }
}

pub fn classify_ledger_entry<'a>(
    entry: &'a LedgerEntry,
    transaction_types: &'a MappingTable<TransactionTypeAttrs>,
    investment_types: &'a MappingTable<InvestmentTypeAttrs>,
    investments: &'a MappingTable<InvestmentAttrs>,
) -> ClassifiedLedgerEntry<'a> {
    let transaction_key = entry.transaction_key();
    let investment_type_key = entry.investment_type_key();
    let investment_key = entry.investment_key();

    ClassifiedLedgerEntry {
        entry,
        transaction: transaction_types.get(&transaction_key),
        category: investment_types.get(&investment_type_key).map(|a| a.category),
        investment: investments.get(&investment_key),
        transaction_key,
        investment_type_key,
        investment_key,
    }
}

/// A position with its derived keys, resolved category/tag and the
/// position-level regulatory attributes.
#[derive(Debug, Clone)]
pub struct ClassifiedPosition<'a> {
    pub position: &'a PositionRecord,
    pub position_key: String,
    pub category: Option<Category>,
    pub tag: Option<&'a str>,
    pub attrs: Option<&'a RegulatoryAttrs>,
}

pub fn classify_position<'a>(
    position: &'a PositionRecord,
    investment_types: &'a MappingTable<InvestmentTypeAttrs>,
    investments: &'a MappingTable<InvestmentAttrs>,
    position_map: &'a MappingTable<RegulatoryAttrs>,
) -> ClassifiedPosition<'a> {
    let position_key = position.position_key();

    ClassifiedPosition {
        position,
        category: investment_types
            .get(&position.investment_type_key())
            .map(|a| a.category),
        tag: investments
            .get(&position.investment_key())
            .map(|a| a.tag.as_str()),
        attrs: position_map.get(&position_key),
        position_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry() -> LedgerEntry {
        LedgerEntry {
            booking_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            group_account: "0600".to_string(),
            security_type: "BOND".to_string(),
            investment_class: "FI".to_string(),
            security_id: "SI0001".to_string(),
            maturity_band: "LT".to_string(),
            purpose: "PORTFOLIO".to_string(),
            debit_original: 0.0,
            credit_original: 0.0,
            debit_base: 0.0,
            credit_base: 0.0,
        }
    }

    #[test]
    fn test_composite_key_concatenates_in_order() {
        assert_eq!(composite_key(["A", "B", "C"]), "ABC");
        assert_ne!(composite_key(["B", "A"]), composite_key(["A", "B"]));
    }

    #[test]
    fn test_composite_key_trims_surrounding_whitespace() {
        assert_eq!(composite_key([" 0600", "BOND "]), "0600BOND");
        // Interior whitespace is part of the key.
        assert_eq!(composite_key(["06 00", "X"]), "06 00X");
    }

    #[test]
    fn test_ledger_entry_keys() {
        let entry = entry();
        assert_eq!(entry.transaction_key(), "0600BONDFI");
        assert_eq!(entry.investment_type_key(), "BONDLT");
        assert_eq!(entry.investment_key(), "SI0001BOND");
    }

    #[test]
    fn test_identical_fields_produce_identical_keys() {
        let a = entry();
        let mut b = entry();
        b.debit_base = 999.0;
        assert_eq!(a.transaction_key(), b.transaction_key());
    }

    #[test]
    fn test_classification_leaves_unmapped_spaces_unresolved() {
        let entry = entry();
        let transaction_types = MappingTable::empty("transaction types");
        let investment_types = MappingTable::from_rows(
            "investment types",
            vec![(
                "BONDLT".to_string(),
                InvestmentTypeAttrs {
                    category: Category::DebtSecuritiesOverOneYear,
                },
            )],
        )
        .unwrap();
        let investments = MappingTable::empty("investments");

        let classified =
            classify_ledger_entry(&entry, &transaction_types, &investment_types, &investments);

        assert!(classified.transaction.is_none());
        assert!(!classified.includes_status());
        assert_eq!(
            classified.category,
            Some(Category::DebtSecuritiesOverOneYear)
        );
        assert!(classified.tag().is_none());
    }
}
