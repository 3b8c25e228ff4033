use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire replay crate.
pub type Result<T> = std::result::Result<T, ReplayErr>;

/// The replay crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayErr {
    /// A caller supplied an argument outside of its domain.
    InvalidArgument(ArgumentErr),
    /// A batch was requested from a partition without examples.
    EmptyDataset,
    /// Two matrices that must agree on a dimension don't.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

/// The reasons an argument can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentErr {
    NegativePriority { index: usize, priority: f64 },
    NonFinitePriority { index: usize, priority: f64 },
    IndexOutOfBounds { index: usize, len: usize },
    LengthMismatch { got: usize, expected: usize },
    InvalidExponent { name: &'static str, value: f64 },
    ZeroBatchSize,
    ZeroWorkers,
    InvalidSplit(f64),
}

impl Display for ArgumentErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentErr::NegativePriority { index, priority } => {
                write!(f, "priority {priority} for example {index} is negative")
            }
            ArgumentErr::NonFinitePriority { index, priority } => {
                write!(f, "priority {priority} for example {index} is not finite")
            }
            ArgumentErr::IndexOutOfBounds { index, len } => {
                write!(f, "example index {index} is out of bounds for {len} examples")
            }
            ArgumentErr::LengthMismatch { got, expected } => write!(
                f,
                "got {got} priorities for {expected} indices, the lengths must match"
            ),
            ArgumentErr::InvalidExponent { name, value } => {
                write!(f, "{name} must be a finite non-negative number, got {value}")
            }
            ArgumentErr::ZeroBatchSize => f.write_str("batch size must be greater than zero"),
            ArgumentErr::ZeroWorkers => f.write_str("at least one collection worker is required"),
            ArgumentErr::InvalidSplit(split) => {
                write!(f, "train split must be within [0, 1], got {split}")
            }
        }
    }
}

impl Display for ReplayErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayErr::InvalidArgument(e) => write!(f, "invalid argument: {e}"),
            ReplayErr::EmptyDataset => f.write_str("the dataset has no examples to sample from"),
            ReplayErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
        }
    }
}

impl Error for ArgumentErr {}

impl Error for ReplayErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplayErr::InvalidArgument(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArgumentErr> for ReplayErr {
    fn from(value: ArgumentErr) -> Self {
        Self::InvalidArgument(value)
    }
}

/// Rejects `value` unless it is a finite non-negative exponent.
pub(crate) fn check_exponent(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ArgumentErr::InvalidExponent { name, value }.into());
    }

    Ok(value)
}

/// Rejects `priority` unless it is finite and non-negative.
pub(crate) fn check_priority(index: usize, priority: f64) -> Result<f64> {
    if priority.is_nan() || priority.is_infinite() {
        return Err(ArgumentErr::NonFinitePriority { index, priority }.into());
    }

    if priority < 0.0 {
        return Err(ArgumentErr::NegativePriority { index, priority }.into());
    }

    Ok(priority)
}
