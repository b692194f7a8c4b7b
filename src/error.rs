//! Error type shared by graph construction, configuration and rendering

/// Errors reported while building, running or rendering a rack
#[derive(Debug)]
pub enum Error {
    /// A step or pattern table whose rows do not all have the same length
    HeterogeneousTable {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A table or candidate list with nothing to select from
    EmptyTable(&'static str),
    /// A fan-out produced a different number of outputs than the caller
    /// destructures
    ColumnCount { expected: usize, found: usize },
    /// A node thread panicked; carries the thread name
    NodePanicked(String),
    /// The OS refused to start a node thread; carries the thread name
    SpawnFailed(String),
    /// Sample rates must be finite, positive and whole
    InvalidSampleRate(f64),
    /// The terminal stream ended before the requested length was rendered
    ShortRender { requested: usize, written: usize },
    Config(serde_json::Error),
    Io(std::io::Error),
    Wav(hound::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::HeterogeneousTable {
                row,
                expected,
                found,
            } => write!(
                f,
                "Heterogeneous table: row {} has {} columns, expected {}",
                row, found, expected
            ),
            Error::EmptyTable(what) => write!(f, "Empty table given to {}", what),
            Error::ColumnCount { expected, found } => {
                write!(f, "Expected {} columns, found {}", expected, found)
            }
            Error::NodePanicked(name) => write!(f, "Node {} panicked", name),
            Error::SpawnFailed(name) => write!(f, "Failed to spawn node {}", name),
            Error::InvalidSampleRate(rate) => write!(f, "Invalid sample rate: {}", rate),
            Error::ShortRender { requested, written } => write!(
                f,
                "Output ended after {} of {} samples",
                written, requested
            ),
            Error::Config(e) => write!(f, "Invalid configuration: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Wav(e) => write!(f, "WAV error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Wav(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Wav(e)
    }
}

/// Return the common row length of a rectangular table.
pub(crate) fn table_width<T>(table: &[Vec<T>], what: &'static str) -> Result<usize, Error> {
    let first = table.first().ok_or(Error::EmptyTable(what))?;
    let expected = first.len();
    for (row, values) in table.iter().enumerate() {
        if values.len() != expected {
            return Err(Error::HeterogeneousTable {
                row,
                expected,
                found: values.len(),
            });
        }
    }
    Ok(expected)
}
