use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportBuilderError {
    #[error("No data found in table {table} for year {year} and month {month} in column '{column}'")]
    MissingPeriodData {
        table: String,
        column: String,
        year: i32,
        month: u32,
    },

    #[error("Duplicate key '{key}' in mapping table {table}")]
    DuplicateMappingKey { table: String, key: String },

    #[error("Table {table} is missing expected column '{column}'")]
    SchemaViolation { table: String, column: String },

    #[error("Table {table}, column '{column}': cannot parse value '{value}'")]
    InvalidValue {
        table: String,
        column: String,
        value: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportBuilderError>;
