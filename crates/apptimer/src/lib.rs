//! Wall-clock instrumentation for nested, named code sections.
//!
//! A [`Timer`] measures one logical execution: a web request, a job, a
//! script run. Calling [`Timer::start`] while another interval is open nests
//! the new interval under it, so the recorded forest mirrors the call
//! structure. [`Timer::report`] finalizes the session into an immutable
//! [`Report`] with derived totals, renderable as human-readable text or as a
//! pretty-printed JSON document. Arbitrary `key: value` annotations
//! ([`Extras`]) can be attached to the session or to any interval, including
//! after the interval has been stopped.
//!
//! ```
//! use apptimer::Timer;
//!
//! # fn main() -> Result<(), apptimer::TimerError> {
//! let mut timer = Timer::new("checkout request");
//!
//! timer.start("load cart")?;
//! let prices = timer.start("fetch prices")?;
//! timer.extras_mut(prices).add("Source", "db");
//! timer.stop()?;
//! timer.stop()?;
//!
//! let report = timer.report();
//! assert_eq!(report.intervals_count(), 2);
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! One timer belongs to one logical execution flow; `&mut self` receivers
//! make concurrent mutation a compile error. For persistence, [`ReportFile`]
//! writes the text form to a log file, optionally appending with a separator
//! between sessions.

mod clock;
mod extras;
mod interval;
mod report;
mod sink;
mod timer;

pub use extras::Extras;
pub use interval::{Interval, IntervalId};
pub use report::{IntervalDoc, Report, ReportDoc};
pub use sink::{ReportFile, SinkError};
pub use timer::{RequestInfo, Timer, TimerError};
