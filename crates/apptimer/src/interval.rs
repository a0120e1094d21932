//! Named timed spans forming the measurement forest.

use crate::extras::Extras;

/// Handle to an [`Interval`] owned by a [`Timer`](crate::Timer) or a
/// [`Report`](crate::Report).
///
/// Ids are arena indices, unique within the timer that issued them, and only
/// meaningful for that timer and the report built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalId(pub(crate) usize);

/// A named timed span, possibly containing nested sub-spans.
///
/// Timing fields are written exclusively by the owning timer; callers read
/// them through the accessors here. Extras stay editable (via
/// [`Timer::extras_mut`](crate::Timer::extras_mut)) even after the interval
/// has been stopped.
#[derive(Debug, Clone)]
pub struct Interval {
    pub(crate) id: IntervalId,
    pub(crate) description: String,
    pub(crate) start: f64,
    pub(crate) end: Option<f64>,
    pub(crate) duration: Option<f64>,
    pub(crate) parent: Option<IntervalId>,
    pub(crate) children: Vec<IntervalId>,
    pub(crate) extras: Extras,
}

impl Interval {
    pub(crate) fn new(id: IntervalId, description: String, parent: Option<IntervalId>) -> Self {
        Self {
            id,
            description,
            start: 0.0,
            end: None,
            duration: None,
            parent,
            children: Vec::new(),
            extras: Extras::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> IntervalId {
        self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Start time, fractional seconds since the Unix epoch.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time; `None` until the interval has been stopped.
    #[must_use]
    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Elapsed seconds, rounded to four fractional digits.
    /// `None` until the interval has been stopped.
    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Id of the enclosing interval, `None` for top-level intervals.
    #[must_use]
    pub fn parent(&self) -> Option<IntervalId> {
        self.parent
    }

    /// Ids of directly nested intervals, in start order.
    #[must_use]
    pub fn children(&self) -> &[IntervalId] {
        &self.children
    }

    #[must_use]
    pub fn extras(&self) -> &Extras {
        &self.extras
    }
}
