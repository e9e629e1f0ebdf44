/*!
 * Central sink for subtitle loading and provider failures.
 *
 * Every failure is classified into an `ErrorKind`, stored as an
 * `ErrorRecord` under its resource key (subtitle URL or provider id) and
 * counted against that resource's retry counter. Records are bounded per
 * resource; the oldest are dropped first.
 */

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::cue::SubtitleFormat;
use crate::errors::{ErrorKind, ParseError};

// @const: Records kept per resource before the oldest is evicted
pub const DEFAULT_MAX_RECORDS_PER_URL: usize = 100;

// @const: Retries after which a resource counts as critical
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Subtitle URL or provider id
    pub resource: String,
    pub kind: ErrorKind,
    pub message: String,
    /// What the caller was doing, e.g. `load` or `retry`
    pub context: Option<String>,
    /// Retry counter of the resource when this record was stored
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
    pub format: Option<SubtitleFormat>,
    pub line_number: Option<usize>,
}

impl ErrorRecord {
    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.resource, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " (during {})", context)?;
        }
        Ok(())
    }
}

/// Aggregate view over every stored record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub resources_with_errors: usize,
    pub critical_errors: usize,
    pub by_kind: HashMap<ErrorKind, usize>,
}

#[derive(Debug, Default)]
struct ErrorStore {
    records: HashMap<String, VecDeque<ErrorRecord>>,
    retry_counts: HashMap<String, u32>,
}

/// Classifies, stores and counts failures per resource
#[derive(Debug)]
pub struct ErrorHandler {
    store: Mutex<ErrorStore>,
    max_records_per_url: usize,
    max_retries: u32,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(ErrorStore::default()),
            max_records_per_url: DEFAULT_MAX_RECORDS_PER_URL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_limits(max_records_per_url: usize, max_retries: u32) -> Self {
        Self {
            max_records_per_url: max_records_per_url.max(1),
            max_retries,
            ..Self::new()
        }
    }

    fn record(&self, mut record: ErrorRecord) -> ErrorRecord {
        let mut store = self.store.lock();
        let count = store.retry_counts.entry(record.resource.clone()).or_insert(0);
        *count += 1;
        record.retry_count = *count;

        let records = store.records.entry(record.resource.clone()).or_default();
        if records.len() >= self.max_records_per_url {
            records.pop_front();
        }
        records.push_back(record.clone());
        record
    }

    /// Record a subtitle grammar failure for `url`
    pub fn handle_parsing_error(&self, url: &str, error: &ParseError) -> ErrorRecord {
        warn!("Failed to parse {}: {}", url, error);
        self.record(ErrorRecord {
            resource: url.to_string(),
            kind: ErrorKind::Parse,
            message: error.message.clone(),
            context: Some("parse".to_string()),
            retry_count: 0,
            timestamp: Utc::now(),
            format: Some(error.format),
            line_number: error.line_number,
        })
    }

    /// Classify and record any error that maps onto `ErrorKind`
    pub fn handle_error<E>(&self, resource: &str, cause: &E, context: &str) -> ErrorRecord
    where
        E: fmt::Display,
        for<'a> ErrorKind: From<&'a E>,
    {
        let kind = ErrorKind::from(cause);
        if kind.is_critical() {
            error!("{} failed for {}: {}", context, resource, cause);
        } else {
            warn!("{} failed for {}: {}", context, resource, cause);
        }
        self.record(ErrorRecord {
            resource: resource.to_string(),
            kind,
            message: cause.to_string(),
            context: Some(context.to_string()),
            retry_count: 0,
            timestamp: Utc::now(),
            format: None,
            line_number: None,
        })
    }

    /// Run `action` for `url`; success clears the URL's history, failure is recorded
    pub async fn retry_url<T, E, F, Fut>(&self, url: &str, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        for<'a> ErrorKind: From<&'a E>,
    {
        debug!("Retrying {} (attempt {})", url, self.retry_count(url) + 1);
        match action().await {
            Ok(value) => {
                self.clear_errors_for_url(url);
                Ok(value)
            }
            Err(e) => {
                self.handle_error(url, &e, "retry");
                Err(e)
            }
        }
    }

    pub fn errors_for_url(&self, url: &str) -> Vec<ErrorRecord> {
        self.store
            .lock()
            .records
            .get(url)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every record, oldest first
    pub fn all_errors(&self) -> Vec<ErrorRecord> {
        let store = self.store.lock();
        let mut all: Vec<ErrorRecord> = store.records.values().flatten().cloned().collect();
        all.sort_by_key(|r| r.timestamp);
        all
    }

    pub fn retry_count(&self, url: &str) -> u32 {
        self.store.lock().retry_counts.get(url).copied().unwrap_or(0)
    }

    /// Whether any record needs user attention or any resource ran out of retries
    pub fn has_critical_errors(&self) -> bool {
        let store = self.store.lock();
        store.records.values().flatten().any(ErrorRecord::is_critical)
            || store.retry_counts.values().any(|&count| count >= self.max_retries)
    }

    pub fn clear_errors(&self) {
        let mut store = self.store.lock();
        store.records.clear();
        store.retry_counts.clear();
    }

    pub fn clear_errors_for_url(&self, url: &str) {
        let mut store = self.store.lock();
        store.records.remove(url);
        store.retry_counts.remove(url);
    }

    pub fn error_summary(&self) -> ErrorSummary {
        let store = self.store.lock();
        let mut summary = ErrorSummary {
            resources_with_errors: store.records.values().filter(|r| !r.is_empty()).count(),
            ..ErrorSummary::default()
        };
        for record in store.records.values().flatten() {
            summary.total_errors += 1;
            if record.is_critical() {
                summary.critical_errors += 1;
            }
            *summary.by_kind.entry(record.kind).or_insert(0) += 1;
        }
        summary
    }
}
