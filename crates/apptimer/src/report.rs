//! Finalized, serializable snapshots of a timing session.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::round_duration;
use crate::extras::Extras;
use crate::interval::{Interval, IntervalId};
use crate::timer::{RequestInfo, SessionMeta};

/// The finalized snapshot of a timing session.
///
/// Produced once by [`Timer::report`](crate::Timer::report), which transfers
/// ownership of the interval forest; read-only afterwards. The text form is
/// available through [`Display`](fmt::Display) (and therefore `to_string`),
/// the machine-readable form through [`to_json`](Report::to_json) and
/// [`to_doc`](Report::to_doc).
#[derive(Debug)]
pub struct Report {
    meta: SessionMeta,
    arena: Vec<Interval>,
    roots: Vec<IntervalId>,
    duration: f64,
    intervals_count: usize,
}

impl Report {
    pub(crate) fn new(meta: SessionMeta, arena: Vec<Interval>, roots: Vec<IntervalId>) -> Self {
        let total: f64 = roots
            .iter()
            .map(|id| arena[id.0].duration.unwrap_or(0.0))
            .sum();
        let mut report = Self {
            meta,
            arena,
            roots,
            duration: round_duration(total),
            intervals_count: 0,
        };
        report.intervals_count = report.flatten().len();
        report
    }

    /// Session description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.meta.description
    }

    /// Session start time, formatted `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.meta.time
    }

    /// Request/environment metadata recorded for the session.
    #[must_use]
    pub fn request(&self) -> &RequestInfo {
        &self.meta.request
    }

    /// Session-level annotations.
    #[must_use]
    pub fn session_extras(&self) -> &Extras {
        &self.meta.extras
    }

    /// Sum of top-level interval durations, in seconds, rounded to four
    /// fractional digits.
    ///
    /// Nested time is not double-counted: a parent's duration already
    /// subsumes its children's.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Total number of intervals across the whole forest, at every depth.
    #[must_use]
    pub fn intervals_count(&self) -> usize {
        self.intervals_count
    }

    /// Top-level intervals in start order.
    pub fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.roots.iter().map(|id| &self.arena[id.0])
    }

    /// Read access to any interval of the forest.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different session.
    #[must_use]
    pub fn interval(&self, id: IntervalId) -> &Interval {
        &self.arena[id.0]
    }

    /// The interval with the largest duration, or `None` for an empty forest.
    ///
    /// Candidates are visited depth-first with parents before children; ties
    /// go to the interval encountered first.
    #[must_use]
    pub fn longest_interval(&self) -> Option<&Interval> {
        let mut longest: Option<&Interval> = None;
        for interval in self.flatten() {
            match longest {
                Some(current)
                    if interval.duration.unwrap_or(0.0) <= current.duration.unwrap_or(0.0) => {}
                _ => longest = Some(interval),
            }
        }
        longest
    }

    /// Every interval in the forest, depth-first, parents before children.
    fn flatten(&self) -> Vec<&Interval> {
        let mut all = Vec::with_capacity(self.arena.len());
        for root in &self.roots {
            self.visit(*root, &mut all);
        }
        all
    }

    fn visit<'a>(&'a self, id: IntervalId, all: &mut Vec<&'a Interval>) {
        let interval = &self.arena[id.0];
        all.push(interval);
        for child in &interval.children {
            self.visit(*child, all);
        }
    }

    /// Builds the machine-readable document form of this report.
    #[must_use]
    pub fn to_doc(&self) -> ReportDoc {
        ReportDoc {
            time: self.meta.time.clone(),
            http_method: self.meta.request.http_method.clone(),
            uri: self.meta.request.uri.clone(),
            params: self.meta.request.params.clone(),
            description: self.meta.description.clone(),
            ip_address: self.meta.request.ip_address.clone(),
            extras: self.meta.extras.entries().clone(),
            duration: self.duration,
            intervals_count: self.intervals_count,
            intervals: self.roots.iter().map(|id| self.interval_doc(*id)).collect(),
        }
    }

    fn interval_doc(&self, id: IntervalId) -> IntervalDoc {
        let interval = &self.arena[id.0];
        IntervalDoc {
            description: interval.description.clone(),
            duration: interval.duration.unwrap_or(0.0),
            start: round_duration(interval.start),
            end: round_duration(interval.end.unwrap_or(interval.start)),
            extras: interval.extras.entries().clone(),
            children: interval
                .children
                .iter()
                .map(|child| self.interval_doc(*child))
                .collect(),
        }
    }

    /// Report as a pretty-printed JSON string.
    ///
    /// Forward slashes and non-ASCII text are emitted as-is; empty extras
    /// maps serialize as `{}`.
    #[must_use]
    pub fn to_json(&self) -> String {
        match serde_json::to_string_pretty(&self.to_doc()) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "report serialization failed");
                String::from("\"\"")
            }
        }
    }

    fn fmt_interval(&self, f: &mut fmt::Formatter<'_>, id: IntervalId, depth: usize) -> fmt::Result {
        let interval = &self.arena[id.0];
        let indent = "  ".repeat(depth);
        writeln!(
            f,
            "{indent}- {} | {} sec.",
            interval.description,
            interval.duration.unwrap_or(0.0)
        )?;
        for (key, value) in interval.extras.iter() {
            writeln!(f, "{indent}  {key}: {value}")?;
        }
        for child in &interval.children {
            self.fmt_interval(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.meta.time)?;
        if !self.meta.request.http_method.is_empty() && !self.meta.request.uri.is_empty() {
            write!(
                f,
                " {} {}",
                self.meta.request.http_method.to_uppercase(),
                self.meta.request.uri
            )?;
        }
        writeln!(f)?;

        if !self.meta.request.params.is_empty() {
            let params =
                serde_json::to_string_pretty(&self.meta.request.params).map_err(|_| fmt::Error)?;
            writeln!(f, "Params:")?;
            writeln!(f, "{params}")?;
        }
        if !self.meta.request.ip_address.is_empty() {
            writeln!(f, "IP address: {}", self.meta.request.ip_address)?;
        }
        if !self.meta.description.is_empty() {
            writeln!(f, "Description: {}", self.meta.description)?;
        }
        for (key, value) in self.meta.extras.iter() {
            writeln!(f, "{key}: {value}")?;
        }

        writeln!(f, "Duration: {} sec.", self.duration)?;
        writeln!(f, "---------------------")?;
        writeln!(f, "Intervals: {}", self.intervals_count)?;

        for root in &self.roots {
            self.fmt_interval(f, *root, 1)?;
        }
        writeln!(f)
    }
}

/// JSON document layout of a serialized report.
///
/// Field order matches the serialized output. The struct derives
/// [`Deserialize`] as well, so a report written with
/// [`Report::to_json`] can be parsed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDoc {
    pub time: String,
    pub http_method: String,
    pub uri: String,
    pub params: BTreeMap<String, String>,
    pub description: String,
    pub ip_address: String,
    pub extras: BTreeMap<String, String>,
    pub duration: f64,
    pub intervals_count: usize,
    pub intervals: Vec<IntervalDoc>,
}

/// One interval node inside a [`ReportDoc`].
///
/// `start` and `end` are fractional seconds since the Unix epoch, rounded to
/// four digits like `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalDoc {
    pub description: String,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
    pub extras: BTreeMap<String, String>,
    pub children: Vec<IntervalDoc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn stopped(
        id: usize,
        description: &str,
        start: f64,
        end: f64,
        parent: Option<usize>,
        children: &[usize],
    ) -> Interval {
        Interval {
            id: IntervalId(id),
            description: description.to_string(),
            start,
            end: Some(end),
            duration: Some(round_duration(end - start)),
            parent: parent.map(IntervalId),
            children: children.iter().copied().map(IntervalId).collect(),
            extras: Extras::new(),
        }
    }

    fn meta() -> SessionMeta {
        SessionMeta {
            description: "checkout request".to_string(),
            time: "2026-08-06 10:30:00".to_string(),
            request: RequestInfo {
                ip_address: "203.0.113.7".to_string(),
                uri: "https://shop.example/checkout".to_string(),
                http_method: "get".to_string(),
                params: BTreeMap::from([("user".to_string(), "42".to_string())]),
                runtime: "cli".to_string(),
            },
            extras: Extras::from_iter([("Build", "42")]),
        }
    }

    /// load cart (1.25s, one extra) > fetch prices (0.4s, nested); render (0.5s).
    fn checkout_report() -> Report {
        let mut cart = stopped(0, "load cart", 100.0, 101.25, None, &[1]);
        cart.extras.add("Source", "db");
        let prices = stopped(1, "fetch prices", 100.2, 100.6, Some(0), &[]);
        let render = stopped(2, "render", 101.25, 101.75, None, &[]);

        Report::new(
            meta(),
            vec![cart, prices, render],
            vec![IntervalId(0), IntervalId(2)],
        )
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "fixture durations are exact")]
    fn duration_sums_top_level_only() {
        let report = checkout_report();
        // 1.25 + 0.5; the nested 0.4 is already inside its parent.
        assert_eq!(report.duration(), 1.75);
    }

    #[test]
    fn intervals_count_includes_every_depth() {
        let report = checkout_report();
        assert_eq!(report.intervals_count(), 3);
    }

    #[test]
    fn empty_forest_report() {
        let report = Report::new(SessionMeta::default(), Vec::new(), Vec::new());
        assert_eq!(report.intervals_count(), 0);
        assert!(report.duration().abs() < f64::EPSILON);
        assert!(report.longest_interval().is_none());
    }

    #[test]
    fn longest_interval_finds_unique_maximum() {
        let report = checkout_report();
        let longest = report.longest_interval().unwrap();
        assert_eq!(longest.description(), "load cart");
    }

    #[test]
    fn longest_interval_reaches_nested_nodes() {
        let outer = stopped(0, "outer", 10.0, 10.2, None, &[1]);
        let inner = stopped(1, "inner", 10.0, 10.9, Some(0), &[]);
        let report = Report::new(SessionMeta::default(), vec![outer, inner], vec![IntervalId(0)]);

        assert_eq!(report.longest_interval().unwrap().description(), "inner");
    }

    #[test]
    fn longest_interval_tie_goes_to_first_in_depth_first_order() {
        let a = stopped(0, "a", 10.0, 10.5, None, &[]);
        let b = stopped(1, "b", 11.0, 11.5, None, &[]);
        let report = Report::new(
            SessionMeta::default(),
            vec![a, b],
            vec![IntervalId(0), IntervalId(1)],
        );

        assert_eq!(report.longest_interval().unwrap().description(), "a");
    }

    #[test]
    fn text_report_layout() {
        let report = checkout_report();
        assert_snapshot!(report.to_string(), @r#"
        [2026-08-06 10:30:00] GET https://shop.example/checkout
        Params:
        {
          "user": "42"
        }
        IP address: 203.0.113.7
        Description: checkout request
        Build: 42
        Duration: 1.75 sec.
        ---------------------
        Intervals: 3
          - load cart | 1.25 sec.
            Source: db
            - fetch prices | 0.4 sec.
          - render | 0.5 sec.
        "#);
    }

    #[test]
    fn text_report_omits_empty_metadata() {
        let meta = SessionMeta {
            time: "2026-08-06 10:30:00".to_string(),
            ..SessionMeta::default()
        };
        let report = Report::new(meta, Vec::new(), Vec::new());
        assert_snapshot!(report.to_string(), @r"
        [2026-08-06 10:30:00]
        Duration: 0 sec.
        ---------------------
        Intervals: 0
        ");
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "fixture durations are exact")]
    fn json_round_trips_through_document() {
        let report = checkout_report();
        let doc: ReportDoc = serde_json::from_str(&report.to_json()).unwrap();

        assert_eq!(doc.description, "checkout request");
        assert_eq!(doc.duration, 1.75);
        assert_eq!(doc.intervals_count, 3);
        assert_eq!(doc.extras, report.meta.extras.entries().clone());

        assert_eq!(doc.intervals.len(), 2);
        let cart = &doc.intervals[0];
        assert_eq!(cart.description, "load cart");
        assert_eq!(cart.duration, 1.25);
        assert_eq!(cart.start, 100.0);
        assert_eq!(cart.end, 101.25);
        assert_eq!(cart.extras.get("Source").map(String::as_str), Some("db"));

        assert_eq!(cart.children.len(), 1);
        assert_eq!(cart.children[0].description, "fetch prices");
        assert_eq!(cart.children[0].duration, 0.4);

        assert_eq!(doc.intervals[1].description, "render");
        assert!(doc.intervals[1].children.is_empty());

        // The parsed document re-serializes to the same tree.
        let again: ReportDoc =
            serde_json::from_str(&serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn json_empty_extras_serialize_as_object() {
        let interval = stopped(0, "plain", 10.0, 10.5, None, &[]);
        let report = Report::new(SessionMeta::default(), vec![interval], vec![IntervalId(0)]);

        let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value["extras"], serde_json::json!({}));
        assert_eq!(value["intervals"][0]["extras"], serde_json::json!({}));
    }

    #[test]
    fn json_keeps_slashes_and_non_ascii_literal() {
        let meta = SessionMeta {
            description: "поиск".to_string(),
            request: RequestInfo {
                uri: "https://example.com/path/to/resource".to_string(),
                ..RequestInfo::default()
            },
            ..SessionMeta::default()
        };
        let report = Report::new(meta, Vec::new(), Vec::new());
        let json = report.to_json();

        assert!(json.contains("https://example.com/path/to/resource"));
        assert!(json.contains("поиск"));
        assert!(!json.contains("\\/"));
        assert!(!json.contains("\\u"));
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact fixtures")]
    fn json_rounds_timestamps_to_four_digits() {
        let interval = stopped(0, "work", 100.123_456, 100.987_654_3, None, &[]);
        let report = Report::new(SessionMeta::default(), vec![interval], vec![IntervalId(0)]);

        let doc = report.to_doc();
        assert_eq!(doc.intervals[0].start, 100.1235);
        assert_eq!(doc.intervals[0].end, 100.9877);
    }

    #[test]
    fn runtime_is_absent_from_both_renderings() {
        let report = checkout_report();
        assert!(!report.to_string().contains("cli"));
        assert!(!report.to_json().contains("runtime"));
        assert_eq!(report.request().runtime, "cli");
    }
}
