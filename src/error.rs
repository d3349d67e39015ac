// sfpd-align/src/error.rs

use std::{error, fmt, io};

/// Failure raised while locating or loading the calibration record.
#[derive(Debug)]
pub enum CalibrationError {
    /// No sfpd partition in the scanned range, or the item does not exist.
    NotFound(String),
    /// The item size differs from the fixed record size.
    Corrupt { expected: u64, actual: u64 },
    /// The disk stayed busy for every open attempt.
    DeviceBusy { attempts: u32 },
    /// The partition layout did not fit even the largest allowed buffer.
    ResourceExhausted(String),
    /// A component was handed an empty buffer or path.
    InvalidArgument(&'static str),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::NotFound(what) => write!(f, "not found: {}", what),
            CalibrationError::Corrupt { expected, actual } => write!(
                f,
                "corrupt item: expected {} bytes, found {} bytes",
                expected, actual
            ),
            CalibrationError::DeviceBusy { attempts } => {
                write!(f, "device still busy after {} open attempts", attempts)
            }
            CalibrationError::ResourceExhausted(what) => write!(f, "resources exhausted: {}", what),
            CalibrationError::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            CalibrationError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CalibrationError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CalibrationError {
    fn from(err: io::Error) -> Self {
        match err.downcast::<CalibrationError>() {
            Ok(inner) => inner,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                CalibrationError::NotFound(err.to_string())
            }
            Err(err) => CalibrationError::Io(err),
        }
    }
}

/// Wraps the error so that converting back yields the same variant.
impl From<CalibrationError> for io::Error {
    fn from(err: CalibrationError) -> Self {
        let kind = match err {
            CalibrationError::Io(inner) => return inner,
            CalibrationError::NotFound(_) => io::ErrorKind::NotFound,
            CalibrationError::Corrupt { .. } => io::ErrorKind::InvalidData,
            CalibrationError::DeviceBusy { .. } => io::ErrorKind::ResourceBusy,
            CalibrationError::ResourceExhausted(_) => io::ErrorKind::OutOfMemory,
            CalibrationError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}
