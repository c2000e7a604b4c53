use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// The four temporal boundaries every windowed computation in a run shares.
/// Computed once from the externally supplied report date and never
/// recomputed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub report_date: NaiveDate,
    pub year_start: NaiveDate,
    pub previous_quarter_end: NaiveDate,
    pub quarter_start: NaiveDate,
}

impl ReportingPeriod {
    pub fn from_report_date(report_date: NaiveDate) -> Self {
        let quarter_start = quarter_start(report_date);
        Self {
            report_date,
            year_start: NaiveDate::from_ymd_opt(report_date.year(), 1, 1).unwrap(),
            previous_quarter_end: quarter_start.checked_sub_days(Days::new(1)).unwrap(),
            quarter_start,
        }
    }

    /// Status window: on or before the previous quarter end.
    pub fn in_status_window(&self, date: NaiveDate) -> bool {
        date <= self.previous_quarter_end
    }

    /// Change window: within the current quarter up to the report date.
    pub fn in_change_window(&self, date: NaiveDate) -> bool {
        self.quarter_start <= date && date <= self.report_date
    }

    /// Realized window: from the start of the report year to the report date.
    pub fn in_realized_window(&self, date: NaiveDate) -> bool {
        self.year_start <= date && date <= self.report_date
    }
}

/// First day of the calendar quarter containing `date`.
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let quarter_first_month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), quarter_first_month, 1).unwrap()
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

/// Whether `date` falls in the same calendar month as `reference`.
pub fn same_month(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year() && date.month() == reference.month()
}
