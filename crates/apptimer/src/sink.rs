//! Plain-text report persistence.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::Report;

/// Separator appended after each report when the file is opened in append
/// mode, keeping consecutive sessions readable in one file.
const REPORT_FOOTER: &str =
    "======================================================\n\n";

/// Errors raised when writing a report file.
///
/// These are boundary errors: a failed write never disturbs the in-memory
/// report.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The report directory does not exist or is not a directory.
    #[error("report directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    /// The report file could not be created or written.
    #[error("failed to write report file")]
    Io(#[from] std::io::Error),
}

/// Writes finalized reports to a plain-text file.
///
/// ```no_run
/// use apptimer::{ReportFile, Timer};
///
/// let timer = Timer::new("nightly import");
/// let report = timer.report();
/// let sink = ReportFile::new("/var/log/myapp", "timings.log").append(true);
/// sink.write(&report)?;
/// # Ok::<(), apptimer::SinkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReportFile {
    dir: PathBuf,
    filename: String,
    append: bool,
}

impl ReportFile {
    /// A sink writing `filename` inside `dir`, overwriting by default.
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
            append: false,
        }
    }

    /// Appends to the file instead of overwriting it.
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// The path this sink writes to.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Writes the report's text form. Returns the path written to.
    pub fn write(&self, report: &Report) -> Result<PathBuf, SinkError> {
        if !self.dir.is_dir() {
            return Err(SinkError::MissingDir(self.dir.clone()));
        }

        let path = self.path();
        let mut file = open_report_file(&path, self.append)?;
        file.write_all(report.to_string().as_bytes())?;
        if self.append {
            file.write_all(REPORT_FOOTER.as_bytes())?;
        }

        tracing::debug!(path = %path.display(), append = self.append, "report written");
        Ok(path)
    }
}

fn open_report_file(path: &Path, append: bool) -> std::io::Result<std::fs::File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path)
}
