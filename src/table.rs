use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Literal written into every non-numeric column of a totals row.
pub const TOTAL_LABEL: &str = "Total";

/// Normalizes `-0.0` to `+0.0`. Summation over an empty subset must yield a
/// plain zero so that zero-activity rows serialize identically run to run.
pub fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Blank,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        Cell::Number(normalize_zero(value))
    }

    /// Text cell, or blank when the value is empty. Mirrors how the source
    /// system blanks out empty strings before publishing lookup tables.
    pub fn text_or_blank(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Blank
        } else {
            Cell::Text(value.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => format!("{:.2}", v),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Blank => String::new(),
        }
    }
}

/// A named rectangular output table with a fixed column order. Both report
/// and gap artifacts are sets of these; persistence as a spreadsheet sheet
/// per table is the external driver's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width must match column count of table {}",
            self.name
        );
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the `Number` cells in a column; blank and text cells are
    /// neutral.
    pub fn column_sum(&self, column: usize) -> f64 {
        normalize_zero(
            self.rows
                .iter()
                .filter_map(|row| row[column].as_number())
                .sum(),
        )
    }

    fn column_is_numeric(&self, column: usize) -> bool {
        self.rows
            .iter()
            .any(|row| matches!(row[column], Cell::Number(_)))
    }

    /// Appends one synthetic totals row: columnwise sums for numeric columns,
    /// the fixed literal for the rest. A table with no numeric column is
    /// returned unchanged.
    pub fn with_total_row(mut self) -> Self {
        let has_numeric = (0..self.columns.len()).any(|c| self.column_is_numeric(c));
        if !has_numeric {
            return self;
        }

        let total_row = (0..self.columns.len())
            .map(|c| {
                if self.column_is_numeric(c) {
                    Cell::Number(self.column_sum(c))
                } else {
                    Cell::text(TOTAL_LABEL)
                }
            })
            .collect();

        self.rows.push(total_row);
        self
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(&self.columns.join(","));
        output.push('\n');

        for row in &self.rows {
            let rendered: Vec<String> = row.iter().map(Cell::render).collect();
            output.push_str(&rendered.join(","));
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ReportTable {
        let mut table = ReportTable::new("SAMPLE", &["Category", "Value", "Note"]);
        table.push_row(vec![
            Cell::text("first"),
            Cell::number(10.0),
            Cell::Blank,
        ]);
        table.push_row(vec![
            Cell::text("second"),
            Cell::number(-4.5),
            Cell::Blank,
        ]);
        table
    }

    #[test]
    fn test_total_row_sums_numeric_columns() {
        let table = sample_table().with_total_row();
        let total = table.rows().last().unwrap();

        assert_eq!(total[0], Cell::text(TOTAL_LABEL));
        assert_eq!(total[1].as_number(), Some(5.5));
        // All-blank column is non-numeric and reads the literal.
        assert_eq!(total[2], Cell::text(TOTAL_LABEL));
    }

    #[test]
    fn test_total_row_equals_column_sum() {
        let table = sample_table();
        let expected = table.column_sum(1);
        let table = table.with_total_row();
        assert_eq!(table.rows().last().unwrap()[1].as_number(), Some(expected));
    }

    #[test]
    fn test_no_total_row_without_numeric_columns() {
        let mut table = ReportTable::new("TEXT_ONLY", &["A", "B"]);
        table.push_row(vec![Cell::text("x"), Cell::text("y")]);
        let table = table.with_total_row();
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let mut table = ReportTable::new("ZEROS", &["Label", "Value"]);
        table.push_row(vec![Cell::text("a"), Cell::number(-0.0)]);
        let sum = table.column_sum(1);
        assert_eq!(sum, 0.0);
        assert!(sum.is_sign_positive());

        let cell = Cell::number(-0.0);
        assert!(cell.as_number().unwrap().is_sign_positive());
    }

    #[test]
    fn test_csv_rendering() {
        let csv = sample_table().to_csv();
        assert!(csv.starts_with("Category,Value,Note\n"));
        assert!(csv.contains("first,10.00,\n"));
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let table = ReportTable::new("EMPTY", &["Value"]);
        assert_eq!(table.column_sum(0), 0.0);
        assert!(table.column_sum(0).is_sign_positive());
    }
}
