use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::initialization::RandErr;

/// The result type used in the entire sparse ftrl crate.
pub type Result<T> = std::result::Result<T, KernelErr>;

/// The sparse ftrl crate's error type.
///
/// Every variant but `IndexOutOfRange` and `DuplicateIndex` is a configuration error,
/// these are always detected before a single tensor element is written.
#[derive(Debug)]
pub enum KernelErr {
    ShapeMismatch {
        a: &'static str,
        b: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    ZeroRank {
        operand: &'static str,
    },
    DimMismatch {
        dim: usize,
        var: usize,
        grad: usize,
    },
    InvalidRank {
        operand: &'static str,
        got: usize,
        expected: usize,
    },
    LeadingDimMismatch {
        grad: usize,
        indices: usize,
    },
    InvalidAttr {
        name: &'static str,
        value: f32,
        constraint: &'static str,
    },
    MissingAttr {
        name: &'static str,
    },
    MissingInput {
        index: usize,
    },
    InputCount {
        got: usize,
        expected: usize,
    },
    OperandType {
        index: usize,
        expected: &'static str,
    },
    SizeMismatch {
        operand: &'static str,
        got: usize,
        expected: usize,
    },
    IndexOutOfRange {
        index: i32,
        rows: usize,
    },
    DuplicateIndex {
        index: i32,
    },
    Init(RandErr),
}

impl KernelErr {
    /// Whether this error was raised by shape, attribute or operand validation.
    ///
    /// # Returns
    /// `false` for the runtime data errors found while updating rows.
    pub fn is_config(&self) -> bool {
        !matches!(
            self,
            KernelErr::IndexOutOfRange { .. } | KernelErr::DuplicateIndex { .. }
        )
    }
}

impl Display for KernelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelErr::ShapeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "{a} and {b} should have the same shape, got {got:?} and expected {expected:?}"
            ),
            KernelErr::ZeroRank { operand } => write!(f, "{operand} must be at least 1D"),
            KernelErr::DimMismatch { dim, var, grad } => write!(
                f,
                "the shape of var and grad must equal in dimension {dim}, got {var} and {grad}"
            ),
            KernelErr::InvalidRank {
                operand,
                got,
                expected,
            } => write!(f, "{operand} must have rank {expected}, got rank {got}"),
            KernelErr::LeadingDimMismatch { grad, indices } => write!(
                f,
                "the first dimension of grad ({grad}) must be equal to the indices length ({indices})"
            ),
            KernelErr::InvalidAttr {
                name,
                value,
                constraint,
            } => write!(f, "{name} should be a {constraint} scalar, got {value}"),
            KernelErr::MissingAttr { name } => write!(f, "missing attribute {name}"),
            KernelErr::MissingInput { index } => write!(f, "missing shape for input {index}"),
            KernelErr::InputCount { got, expected } => {
                write!(f, "expected at least {expected} inputs, got {got}")
            }
            KernelErr::OperandType { index, expected } => {
                write!(f, "input {index} should be a {expected} buffer")
            }
            KernelErr::SizeMismatch {
                operand,
                got,
                expected,
            } => write!(
                f,
                "{operand} buffer has {got} elements, expected {expected}"
            ),
            KernelErr::IndexOutOfRange { index, rows } => write!(
                f,
                "index {index} in indices is out of range [0, {rows}) after unique process"
            ),
            KernelErr::DuplicateIndex { index } => {
                write!(f, "index {index} appears twice after unique process")
            }
            KernelErr::Init(e) => write!(f, "initialization error: {e}"),
        }
    }
}

impl Error for KernelErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KernelErr::Init(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RandErr> for KernelErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<KernelErr> for io::Error {
    fn from(value: KernelErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let config = KernelErr::InputCount {
            got: 4,
            expected: 5,
        };
        let data = KernelErr::IndexOutOfRange { index: 9, rows: 4 };

        assert!(config.is_config());
        assert!(!data.is_config());
        assert!(!KernelErr::DuplicateIndex { index: 1 }.is_config());
    }

    #[test]
    fn io_boundary_keeps_message() {
        let err: io::Error = KernelErr::IndexOutOfRange { index: -1, rows: 3 }.into();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("index -1"));
    }
}
