/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The calendar date used as the lower bound for start-date validation.
///
/// Taken from the local clock, truncated to midnight.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
