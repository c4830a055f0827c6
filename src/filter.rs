use chrono::NaiveDate;
use serde::Serialize;

use crate::data::RecordView;
use crate::errors::PipelineError;
use crate::types::Keyword;

/// Inclusive calendar-date range, compared on the UTC date of each record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range; `start` after `end` is a configuration error.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::Configuration(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Single-day range.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// First included day.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last included day.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when `date` lies within the range, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// User-selected predicates applied to the scored working set.
///
/// Both predicates are optional; with neither set the filter is the identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterParams {
    /// Inclusive calendar window; `None` keeps every date.
    pub date_range: Option<DateRange>,
    /// Case-insensitive substring; `None` or empty keeps every text.
    pub keyword: Option<Keyword>,
}

impl FilterParams {
    /// Parameters that keep every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to an inclusive date range.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Restrict to records whose text contains `keyword`, ignoring case.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Lowercased keyword, or `None` when absent or empty.
    fn needle(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_lowercase)
    }

    /// True when no predicate is active.
    pub fn is_identity(&self) -> bool {
        self.date_range.is_none() && self.needle().is_none()
    }

    /// Evaluate both predicates against one record.
    ///
    /// `Unknown` timestamps never satisfy an active date range and empty text
    /// never satisfies an active keyword.
    pub fn matches<T: RecordView>(&self, record: &T) -> bool {
        self.matches_with(record, self.needle().as_deref())
    }

    fn matches_with<T: RecordView>(&self, record: &T, needle: Option<&str>) -> bool {
        if let Some(range) = &self.date_range {
            match record.timestamp().date() {
                Some(date) if range.contains(date) => {}
                _ => return false,
            }
        }
        if let Some(needle) = needle {
            let text = record.text();
            if text.is_empty() || !text.to_lowercase().contains(needle) {
                return false;
            }
        }
        true
    }

    /// Keep matching records, preserving their relative order.
    pub fn apply<T: RecordView + Clone>(&self, records: &[T]) -> Vec<T> {
        let needle = self.needle();
        records
            .iter()
            .filter(|record| self.matches_with(*record, needle.as_deref()))
            .cloned()
            .collect()
    }

    /// Owned variant of [`FilterParams::apply`] that avoids cloning.
    pub fn apply_owned<T: RecordView>(&self, records: Vec<T>) -> Vec<T> {
        let needle = self.needle();
        records
            .into_iter()
            .filter(|record| self.matches_with(record, needle.as_deref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CanonicalRecord, RecordTimestamp};
    use chrono::{TimeZone, Utc};

    fn record(text: &str, ts: Option<(i32, u32, u32)>) -> CanonicalRecord {
        CanonicalRecord {
            id: format!("google_news::{text}"),
            timestamp: ts
                .map(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap().into())
                .unwrap_or(RecordTimestamp::Unknown),
            text: text.to_string(),
            source: "Google News".into(),
            url: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let records = vec![
            record("Crypto rally", Some((2024, 1, 1))),
            record("stocks flat", Some((2024, 1, 1))),
            record("CRYPTOCURRENCY news", Some((2024, 1, 1))),
        ];
        let out = FilterParams::all().with_keyword("crypto").apply(&records);
        let texts: Vec<&str> = out.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Crypto rally", "CRYPTOCURRENCY news"]);
    }

    #[test]
    fn date_range_is_inclusive_and_skips_unknown() {
        let records = vec![
            record("before", Some((2023, 12, 31))),
            record("first", Some((2024, 1, 1))),
            record("last", Some((2024, 1, 31))),
            record("after", Some((2024, 2, 1))),
            record("undated", None),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let out = FilterParams::all().with_date_range(range).apply(&records);
        let texts: Vec<&str> = out.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "last"]);
    }

    #[test]
    fn empty_keyword_and_no_range_is_identity() {
        let records = vec![record("a", None), record("", Some((2024, 1, 1)))];
        let params = FilterParams::all().with_keyword("");
        assert!(params.is_identity());
        assert_eq!(params.apply(&records), records);
        assert_eq!(FilterParams::all().apply(&records), records);
    }

    #[test]
    fn empty_text_never_matches_keyword() {
        let records = vec![record("", Some((2024, 1, 1)))];
        assert!(FilterParams::all().with_keyword("a").apply(&records).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            record("Crypto up", Some((2024, 1, 2))),
            record("crypto down", Some((2024, 3, 2))),
            record("bonds", Some((2024, 1, 2))),
        ];
        let params = FilterParams::all()
            .with_keyword("crypto")
            .with_date_range(DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap());
        let once = params.apply(&records);
        let twice = params.apply(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
        assert_eq!(params.apply_owned(records), once);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(DateRange::day(date(2024, 1, 1)).contains(date(2024, 1, 1)));
    }
}
