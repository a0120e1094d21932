//! The interval stack engine.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::clock::{Clock, round_duration};
use crate::extras::Extras;
use crate::interval::{Interval, IntervalId};
use crate::report::Report;

/// Errors raised by [`Timer`] operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// An interval was started with an empty description.
    #[error("interval description cannot be empty")]
    InvalidInterval,

    /// `stop` was called while no interval was open.
    #[error("no open interval to stop")]
    NoOpenInterval,
}

/// Request and environment metadata recorded alongside a session.
///
/// All values are opaque pass-through strings supplied by the caller; the
/// timer never consults the ambient environment itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Client address, e.g. `203.0.113.7`.
    pub ip_address: String,
    /// Full request URI.
    pub uri: String,
    /// HTTP method; upper-cased in the text report.
    pub http_method: String,
    /// Request parameters.
    pub params: BTreeMap<String, String>,
    /// Runtime or server identifier, e.g. `cli`. Carried as metadata only;
    /// it appears in neither rendered report form.
    pub runtime: String,
}

/// Session metadata captured when a [`Timer`] is created.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionMeta {
    pub(crate) description: String,
    /// Session start time, formatted `YYYY-MM-DD HH:MM:SS` in local time.
    pub(crate) time: String,
    pub(crate) request: RequestInfo,
    pub(crate) extras: Extras,
}

/// Measures elapsed wall-clock time across nested, named code sections of a
/// single execution.
///
/// Calling [`start`](Timer::start) while another interval is open nests the
/// new interval under it; nesting is exactly "whatever is open when `start`
/// is called". An interval goes created → running → stopped and is never
/// restarted. [`report`](Timer::report) consumes the timer, so a finished
/// session cannot be measured into again.
#[derive(Debug)]
pub struct Timer {
    meta: SessionMeta,
    clock: Clock,
    /// Owns every interval of the session; ids are indices into this arena.
    arena: Vec<Interval>,
    /// Top-level intervals in start order.
    roots: Vec<IntervalId>,
    /// Currently open intervals, innermost last.
    open: Vec<IntervalId>,
}

impl Timer {
    /// Creates a timer for a new measurement session.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_request(description, RequestInfo::default())
    }

    /// Creates a timer carrying request/environment metadata.
    #[must_use]
    pub fn with_request(description: impl Into<String>, request: RequestInfo) -> Self {
        let meta = SessionMeta {
            description: description.into(),
            time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            request,
            extras: Extras::new(),
        };
        tracing::debug!(description = %meta.description, time = %meta.time, "session started");
        Self {
            meta,
            clock: Clock::new(),
            arena: Vec::new(),
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Annotations for the whole session.
    #[must_use]
    pub fn session_extras(&self) -> &Extras {
        &self.meta.extras
    }

    pub fn session_extras_mut(&mut self) -> &mut Extras {
        &mut self.meta.extras
    }

    /// Creates and starts a new interval.
    ///
    /// If another interval is currently open, the new one becomes its child;
    /// otherwise it is appended to the top level. Either way it becomes the
    /// currently open interval.
    pub fn start(&mut self, description: impl Into<String>) -> Result<IntervalId, TimerError> {
        self.start_inner(description.into(), Extras::new())
    }

    /// Like [`start`](Timer::start), with initial extras for the interval.
    pub fn start_with_extras<K, V>(
        &mut self,
        description: impl Into<String>,
        extras: impl IntoIterator<Item = (K, V)>,
    ) -> Result<IntervalId, TimerError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.start_inner(description.into(), extras.into_iter().collect())
    }

    fn start_inner(&mut self, description: String, extras: Extras) -> Result<IntervalId, TimerError> {
        if description.is_empty() {
            return Err(TimerError::InvalidInterval);
        }

        let id = IntervalId(self.arena.len());
        let parent = self.open.last().copied();
        let mut interval = Interval::new(id, description, parent);
        interval.extras = extras;

        match parent {
            Some(parent_id) => self.arena[parent_id.0].children.push(id),
            None => self.roots.push(id),
        }
        self.arena.push(interval);
        self.open.push(id);

        tracing::trace!(
            id = id.0,
            description = %self.arena[id.0].description,
            depth = self.open.len(),
            "interval started"
        );

        // Timestamp capture happens last so bookkeeping is not measured.
        let now = self.clock.now();
        self.arena[id.0].start = now;

        Ok(id)
    }

    /// Stops the currently open interval and returns its id.
    ///
    /// The stopped interval's parent (if any) becomes the open interval
    /// again. Fails with [`TimerError::NoOpenInterval`] when nothing is open,
    /// leaving the timer untouched. The returned interval's extras stay
    /// editable even though its timing is now final.
    pub fn stop(&mut self) -> Result<IntervalId, TimerError> {
        // End timestamp is taken before any bookkeeping so the measured
        // window does not include our own work.
        let end = self.clock.now();

        let id = self.open.last().copied().ok_or(TimerError::NoOpenInterval)?;
        self.open.pop();

        let interval = &mut self.arena[id.0];
        interval.end = Some(end);
        interval.duration = Some(round_duration(end - interval.start));

        tracing::trace!(
            id = id.0,
            description = %interval.description,
            duration = ?interval.duration,
            "interval stopped"
        );

        Ok(id)
    }

    /// Stops every open interval, innermost first.
    ///
    /// A no-op when nothing is open. The loop is bounded by the open stack's
    /// length, so it terminates regardless of the forest's shape.
    pub fn stop_all(&mut self) {
        while !self.open.is_empty() {
            // Cannot fail: the stack is non-empty.
            let _ = self.stop();
        }
    }

    /// Finalizes the session into an immutable [`Report`].
    ///
    /// Any interval still open is force-closed first with whatever time has
    /// elapsed up to this call. Consuming the timer means no further
    /// intervals can be started for this session.
    #[must_use]
    pub fn report(mut self) -> Report {
        self.stop_all();
        Report::new(self.meta, self.arena, self.roots)
    }

    /// Read access to any interval created by this timer.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different timer.
    #[must_use]
    pub fn interval(&self, id: IntervalId) -> &Interval {
        &self.arena[id.0]
    }

    /// Mutable access to an interval's extras.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different timer.
    pub fn extras_mut(&mut self, id: IntervalId) -> &mut Extras {
        &mut self.arena[id.0].extras
    }

    /// Id of the innermost currently open interval.
    #[must_use]
    pub fn current(&self) -> Option<IntervalId> {
        self.open.last().copied()
    }
}
