use std::{
    error::Error,
    fmt::{self, Display},
};

use replay::ReplayErr;

/// The result type used in the entire training crate.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// The training crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainErr {
    /// The batch source or dataset rejected a request.
    Replay(ReplayErr),
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidConfig {
        field: &'static str,
        value: f64,
    },
    /// A score was requested over zero examples.
    NothingToScore,
}

impl Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::Replay(e) => write!(f, "{e}"),
            TrainErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            TrainErr::InvalidConfig { field, value } => {
                write!(f, "{field} must be a finite non-negative number, got {value}")
            }
            TrainErr::NothingToScore => f.write_str("there are no examples to score"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Replay(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReplayErr> for TrainErr {
    fn from(value: ReplayErr) -> Self {
        Self::Replay(value)
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(TrainErr::InvalidConfig { field, value });
    }

    Ok(value)
}
