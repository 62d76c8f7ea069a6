//! Paginated window over the syslog stream.

use std::time::Duration;

use tracing::debug;

use switchyard_core::config::{SYSLOG_STREAM, SYSLOG_SUBJECT_PREFIX};
use switchyard_core::{Error, Log, Result};

use crate::reader::{plan_read, RawRecord, ReadMode, StreamReader};

/// Page size and hard cap for windowed queries.
pub const LOG_PAGE_SIZE: u64 = 100;

/// Wall-clock bound on one syslog read.
const LOG_FETCH_TIMEOUT: Duration = Duration::from_millis(500);

const KNOWN_LOG_TYPES: &[&str] = &["all", "info", "warn", "err", "sys", "ext"];

/// Which slice of the stream a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWindow {
    /// Newest page.
    Tail,
    /// Page ending just below a previously seen sequence.
    FromSeq(u64),
    /// The whole retained stream, ascending (export).
    All,
}

/// Syslog query layer over [`StreamReader`].
#[derive(Clone)]
pub struct LogQuery {
    reader: StreamReader,
}

impl LogQuery {
    pub fn new(reader: StreamReader) -> Self {
        Self { reader }
    }

    /// Fetch one window of system logs.
    ///
    /// `log_type` filters by subject; `"all"` disables the filter. Windowed
    /// queries return newest-first capped at [`LOG_PAGE_SIZE`]; [`LogWindow::All`]
    /// returns the full retained stream oldest-first.
    pub async fn fetch(&self, log_type: &str, window: LogWindow) -> Result<Vec<Log>> {
        let filter = subject_filter(log_type)?;
        let mode = match window {
            LogWindow::Tail => ReadMode::TailLastN,
            LogWindow::FromSeq(seq) => ReadMode::FromSeqBack {
                last_known_seq: seq,
            },
            LogWindow::All => ReadMode::All,
        };

        let totals = self.reader.stream_totals(SYSLOG_STREAM).await?;
        let plan = plan_read(mode, LOG_PAGE_SIZE, &totals);
        let mut records = self
            .reader
            .read_recent(SYSLOG_STREAM, LOG_PAGE_SIZE, LOG_FETCH_TIMEOUT, mode, filter.clone())
            .await?;

        // With a subject filter the window [start, last] can hold fewer
        // matches than requested even though older ones exist. One doubled
        // retry widens the window; never more than one.
        if (records.len() as u64) < plan.want
            && totals.messages > plan.want
            && totals.first_seq < plan.start_seq
        {
            debug!(
                got = records.len(),
                want = plan.want,
                "log window under-filled, refetching with a doubled window"
            );
            records = self
                .reader
                .read_recent(
                    SYSLOG_STREAM,
                    plan.want * 2,
                    LOG_FETCH_TIMEOUT,
                    mode,
                    filter,
                )
                .await?;
        }

        let mut logs: Vec<Log> = records.iter().map(to_log).collect();
        sort_and_cap(&mut logs, window);
        Ok(logs)
    }
}

/// Subject filter for a requested log type. Unknown types are an input error.
fn subject_filter(log_type: &str) -> Result<Option<String>> {
    if !KNOWN_LOG_TYPES.contains(&log_type) {
        return Err(Error::InvalidInput(format!(
            "unknown log type '{log_type}'"
        )));
    }
    Ok(match log_type {
        "all" => None,
        "ext" => Some(format!("{SYSLOG_SUBJECT_PREFIX}.extern.>")),
        t => Some(format!("{SYSLOG_SUBJECT_PREFIX}.*.{t}")),
    })
}

/// Split a syslog subject into (source, type).
///
/// Shapes: `prefix.type` (broker-originated), `prefix.source.type`, and
/// `prefix.source.app.type` for external producers.
pub fn parse_subject(subject: &str) -> (String, String) {
    let tokens: Vec<&str> = subject.split('.').collect();
    match tokens.len() {
        2 => ("broker".to_string(), tokens[1].to_string()),
        3 => (tokens[1].to_string(), tokens[2].to_string()),
        n if n >= 4 => (tokens[1].to_string(), tokens[3].to_string()),
        _ => ("broker".to_string(), subject.to_string()),
    }
}

fn to_log(record: &RawRecord) -> Log {
    let (source, log_type) = parse_subject(&record.subject);
    Log {
        seq: record.seq,
        log_type,
        source,
        payload_text: String::from_utf8_lossy(&record.payload).into_owned(),
        time: record.time,
    }
}

/// `All` exports ascending; windowed queries are newest-first and capped.
fn sort_and_cap(logs: &mut Vec<Log>, window: LogWindow) {
    match window {
        LogWindow::All => logs.sort_by_key(|l| l.seq),
        _ => {
            logs.sort_by(|a, b| b.seq.cmp(&a.seq));
            logs.truncate(LOG_PAGE_SIZE as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log(seq: u64) -> Log {
        Log {
            seq,
            log_type: "info".into(),
            source: "broker".into(),
            payload_text: String::new(),
            time: Utc::now(),
        }
    }

    #[test]
    fn test_parse_two_token_subject_is_broker_sourced() {
        let (source, log_type) = parse_subject("syslogs.err");
        assert_eq!(source, "broker");
        assert_eq!(log_type, "err");
    }

    #[test]
    fn test_parse_three_token_subject() {
        let (source, log_type) = parse_subject("syslogs.rest-gateway.warn");
        assert_eq!(source, "rest-gateway");
        assert_eq!(log_type, "warn");
    }

    #[test]
    fn test_parse_four_token_subject() {
        let (source, log_type) = parse_subject("syslogs.extern.billing-app.err");
        assert_eq!(source, "extern");
        assert_eq!(log_type, "err");
    }

    #[test]
    fn test_subject_filter_shapes() {
        assert_eq!(subject_filter("all").unwrap(), None);
        assert_eq!(
            subject_filter("err").unwrap(),
            Some("syslogs.*.err".to_string())
        );
        assert_eq!(
            subject_filter("sys").unwrap(),
            Some("syslogs.*.sys".to_string())
        );
        assert_eq!(
            subject_filter("ext").unwrap(),
            Some("syslogs.extern.>".to_string())
        );
    }

    #[test]
    fn test_subject_filter_rejects_unknown_type() {
        let err = subject_filter("debug").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.is_showable());
    }

    #[test]
    fn test_windowed_logs_descending_and_capped() {
        let mut logs: Vec<Log> = (1..=250).map(log).collect();
        sort_and_cap(&mut logs, LogWindow::Tail);
        assert_eq!(logs.len(), LOG_PAGE_SIZE as usize);
        assert_eq!(logs[0].seq, 250);
        assert!(logs.windows(2).all(|w| w[0].seq > w[1].seq));
    }

    #[test]
    fn test_all_mode_ascending_uncapped() {
        let mut logs: Vec<Log> = (1..=150).rev().map(log).collect();
        sort_and_cap(&mut logs, LogWindow::All);
        assert_eq!(logs.len(), 150);
        assert!(logs.windows(2).all(|w| w[0].seq < w[1].seq));
    }
}
