//! Bounded log store with composable filters
//!
//! Records are kept in a [`RingBuffer`] and always viewed most-recent-first.
//! The filtered view is recomputed from the active [`LogFilter`] on demand;
//! every predicate must hold for a record to be shown, so applying level,
//! component and keyword predicates in any order yields the same set.

use chrono::NaiveDate;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::buffer::RingBuffer;
use crate::error::{MonitorError, MonitorResult};
use crate::format::html_escape;
use crate::types::{LogLevel, LogRecord, LogStats};

/// Default number of records retained
pub const DEFAULT_MAX_LOGS: usize = 1000;

/// Level / component / keyword predicates; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub component: Option<String>,
    pub keyword: Option<String>,
}

impl LogFilter {
    /// Normalises empty strings to "no predicate"
    pub fn new(level: Option<LogLevel>, component: Option<String>, keyword: Option<String>) -> Self {
        let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            level,
            component: non_empty(component),
            keyword: non_empty(keyword),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into()).filter(|c| !c.is_empty());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into()).filter(|k| !k.is_empty());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.component.is_none() && self.keyword.is_none()
    }

    /// Intersection of all set predicates
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = self.level {
            if record.level != level {
                return false;
            }
        }
        if let Some(component) = &self.component {
            if !record.component.eq_ignore_ascii_case(component) {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            return record.message.to_lowercase().contains(&keyword)
                || record.component.to_lowercase().contains(&keyword);
        }
        true
    }
}

/// Most-recent-first log buffer with incremental statistics
#[derive(Debug, Clone)]
pub struct LogStore {
    records: RingBuffer<LogRecord>,
    filter: LogFilter,
    stats: LogStats,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}

impl LogStore {
    pub fn new(max_logs: usize) -> Self {
        Self {
            records: RingBuffer::new(max_logs),
            filter: LogFilter::default(),
            stats: LogStats::default(),
        }
    }

    /// Prepend a pushed record; the oldest is dropped beyond capacity.
    /// Statistics are bumped incrementally.
    pub fn push(&mut self, record: LogRecord) -> Option<LogRecord> {
        self.stats.record(record.level);
        self.records.push(record)
    }

    /// Replace everything with a pulled batch given most-recent-first
    pub fn replace(&mut self, newest_first: Vec<LogRecord>) {
        self.records.replace(newest_first.into_iter().rev());
        self.stats = self.recompute_stats();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// All records, newest first
    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter_recent()
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
    }

    pub fn clear_filter(&mut self) {
        self.filter = LogFilter::default();
    }

    /// Records passing the active filter, newest first
    pub fn filtered(&self) -> Vec<&LogRecord> {
        self.records().filter(|r| self.filter.matches(r)).collect()
    }

    pub fn stats(&self) -> LogStats {
        self.stats
    }

    /// Overwrite counters with server-side figures
    pub fn set_stats(&mut self, stats: LogStats) {
        self.stats = stats;
    }

    /// Count levels over the retained records
    pub fn recompute_stats(&self) -> LogStats {
        let mut stats = LogStats::default();
        for record in self.records.iter() {
            stats.record(record.level);
        }
        stats
    }
}

/// Escape `message` and wrap case-insensitive occurrences of `keyword` in `<mark>`
pub fn highlight_keyword(message: &str, keyword: Option<&str>) -> String {
    let Some(keyword) = keyword.filter(|k| !k.is_empty()) else {
        return html_escape(message);
    };

    let pattern = RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build();
    let Ok(pattern) = pattern else {
        return html_escape(message);
    };

    let mut out = String::with_capacity(message.len() + 16);
    let mut last = 0;
    for found in pattern.find_iter(message) {
        out.push_str(&html_escape(&message[last..found.start()]));
        out.push_str("<mark>");
        out.push_str(&html_escape(found.as_str()));
        out.push_str("</mark>");
        last = found.end();
    }
    out.push_str(&html_escape(&message[last..]));
    out
}

/// A generated download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// Serialise `records` as pretty JSON named `logs_<date>.json`
pub fn export_logs(records: &[&LogRecord], date: NaiveDate) -> MonitorResult<ExportedFile> {
    let contents = serde_json::to_string_pretty(records)
        .map_err(|err| MonitorError::decode(format!("failed to serialise logs: {err}")))?;
    Ok(ExportedFile {
        filename: format!("logs_{}.json", date.format("%Y-%m-%d")),
        mime_type: "application/json",
        contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;
    use proptest::prelude::*;

    fn record(level: LogLevel, component: &str, message: &str) -> LogRecord {
        LogRecord {
            level,
            component: component.to_string(),
            message: message.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    #[test]
    fn test_store_drops_oldest() {
        let mut store = LogStore::new(3);
        for i in 0..4 {
            store.push(record(LogLevel::Info, "feed", &format!("line {i}")));
        }
        assert_eq!(store.len(), 3);
        let messages: Vec<_> = store.records().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["line 3", "line 2", "line 1"]);
    }

    #[test]
    fn test_replace_keeps_order_newest_first() {
        let mut store = LogStore::new(2);
        store.replace(vec![
            record(LogLevel::Error, "a", "newest"),
            record(LogLevel::Info, "a", "middle"),
            record(LogLevel::Info, "a", "oldest"),
        ]);
        let messages: Vec<_> = store.records().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["newest", "middle"]);
        assert_eq!(store.stats().total, 2);
        assert_eq!(store.stats().error, 1);
    }

    #[test]
    fn test_incremental_stats() {
        let mut store = LogStore::new(10);
        store.push(record(LogLevel::Info, "a", "x"));
        store.push(record(LogLevel::Warning, "a", "y"));
        store.push(record(LogLevel::Error, "a", "z"));
        store.push(record(LogLevel::Debug, "a", "w"));
        let stats = store.stats();
        assert_eq!((stats.total, stats.info, stats.warning, stats.error), (4, 1, 1, 1));
    }

    #[test]
    fn test_keyword_matches_component_too() {
        let filter = LogFilter::default().with_keyword("GATE");
        assert!(filter.matches(&record(LogLevel::Info, "gateway", "ok")));
        assert!(filter.matches(&record(LogLevel::Info, "risk", "gate closed")));
        assert!(!filter.matches(&record(LogLevel::Info, "risk", "ok")));
    }

    #[test]
    fn test_component_is_exact_case_insensitive() {
        let filter = LogFilter::new(None, Some("Gateway".into()), Some("  ".into()));
        assert!(filter.keyword.is_none());
        assert!(filter.matches(&record(LogLevel::Info, "gateway", "x")));
        assert!(!filter.matches(&record(LogLevel::Info, "gateway-2", "x")));
    }

    #[test]
    fn test_highlight_escapes_and_marks() {
        assert_eq!(
            highlight_keyword("Order <42> FILLED, filled again", Some("filled")),
            "Order &lt;42&gt; <mark>FILLED</mark>, <mark>filled</mark> again"
        );
        assert_eq!(highlight_keyword("a.b", Some(".")), "a<mark>.</mark>b");
        assert_eq!(highlight_keyword("<x>", None), "&lt;x&gt;");
    }

    #[test]
    fn test_export_filename_and_contents() {
        let a = record(LogLevel::Error, "risk", "limit breached");
        let file = export_logs(&[&a], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).unwrap();
        assert_eq!(file.filename, "logs_2024-02-29.json");
        assert_eq!(file.mime_type, "application/json");
        let parsed: Vec<LogRecord> = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(parsed[0].message, "limit breached");
    }

    fn arb_level() -> impl Strategy<Value = LogLevel> {
        prop_oneof![
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warning),
            Just(LogLevel::Error),
        ]
    }

    proptest! {
        #[test]
        fn prop_level_and_keyword_filters_commute(
            rows in prop::collection::vec((arb_level(), "[a-c]{1,3}", "[a-d ]{0,8}"), 0..40),
            level in arb_level(),
            keyword in "[a-d]{1,2}",
        ) {
            let records: Vec<LogRecord> = rows
                .iter()
                .map(|(lvl, comp, msg)| record(*lvl, comp, msg))
                .collect();

            let by_level = LogFilter::default().with_level(level);
            let by_keyword = LogFilter::default().with_keyword(keyword.clone());

            let level_then_keyword: Vec<&LogRecord> = records
                .iter()
                .filter(|r| by_level.matches(r))
                .filter(|r| by_keyword.matches(r))
                .collect();
            let keyword_then_level: Vec<&LogRecord> = records
                .iter()
                .filter(|r| by_keyword.matches(r))
                .filter(|r| by_level.matches(r))
                .collect();
            let combined = LogFilter::default().with_level(level).with_keyword(keyword);
            let at_once: Vec<&LogRecord> = records.iter().filter(|r| combined.matches(r)).collect();

            prop_assert_eq!(&level_then_keyword, &keyword_then_level);
            prop_assert_eq!(&level_then_keyword, &at_once);
        }
    }
}
