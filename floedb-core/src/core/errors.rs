use std::fmt;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 1000-1099: Dimension/Vector errors
    DimensionMismatch = 1001,

    /// 1100-1199: Configuration errors
    InvalidConfig = 1101,

    /// 1200-1299: Batch/Schema errors
    SchemaMismatch = 1201,

    /// 1300-1399: Storage errors
    StorageCorrupt = 1301,
    NotFound = 1302,

    /// 1400-1499: Index errors
    CorruptIndex = 1401,

    /// 1500-1599: Resource errors
    OutOfMemory = 1501,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DimensionMismatch => "DIMENSION_MISMATCH",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::SchemaMismatch => "SCHEMA_MISMATCH",
            ErrorCode::StorageCorrupt => "STORAGE_CORRUPT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::CorruptIndex => "CORRUPT_INDEX",
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
        }
    }
}

#[derive(Debug, Clone)]
pub enum FloeError {
    /// Vector length differs from the engine dimension
    DimensionMismatch { expected: usize, got: usize },
    /// Invalid engine or operation configuration
    InvalidConfig(String),
    /// Batch missing a required column or carrying a wrong column type
    SchemaMismatch(String),
    /// Segment file unreadable, wrong magic, or size mismatch
    StorageCorrupt { message: String },
    /// Snapshot or segment not present
    NotFound(String),
    /// Graph adjacency references a node outside the payload arena
    CorruptIndex(String),
    /// Allocation failure during rebuild
    OutOfMemory,
}

impl FloeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FloeError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            FloeError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            FloeError::SchemaMismatch(_) => ErrorCode::SchemaMismatch,
            FloeError::StorageCorrupt { .. } => ErrorCode::StorageCorrupt,
            FloeError::NotFound(_) => ErrorCode::NotFound,
            FloeError::CorruptIndex(_) => ErrorCode::CorruptIndex,
            FloeError::OutOfMemory => ErrorCode::OutOfMemory,
        }
    }
}

impl fmt::Display for FloeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloeError::DimensionMismatch { expected, got } => {
                write!(
                    f,
                    "[{}] Vector dimension mismatch: expected {}, got {}",
                    self.code().as_str(),
                    expected,
                    got
                )
            }
            FloeError::InvalidConfig(msg) => {
                write!(f, "[{}] Invalid configuration: {}", self.code().as_str(), msg)
            }
            FloeError::SchemaMismatch(msg) => {
                write!(f, "[{}] Batch schema mismatch: {}", self.code().as_str(), msg)
            }
            FloeError::StorageCorrupt { message } => {
                write!(f, "[{}] Storage corrupt: {}", self.code().as_str(), message)
            }
            FloeError::NotFound(context) => {
                write!(f, "[{}] Not found: {}", self.code().as_str(), context)
            }
            FloeError::CorruptIndex(context) => {
                write!(f, "[{}] Corrupt index: {}", self.code().as_str(), context)
            }
            FloeError::OutOfMemory => {
                write!(f, "[{}] Allocation failure during rebuild", self.code().as_str())
            }
        }
    }
}

impl std::error::Error for FloeError {}

pub type Result<T> = std::result::Result<T, FloeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_variants() {
        let err = FloeError::DimensionMismatch {
            expected: 4,
            got: 2,
        };
        assert_eq!(err.code(), ErrorCode::DimensionMismatch);

        let err = FloeError::StorageCorrupt {
            message: "bad magic".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::StorageCorrupt);
    }

    #[test]
    fn test_display_includes_code_string() {
        let err = FloeError::DimensionMismatch {
            expected: 4,
            got: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("DIMENSION_MISMATCH"));
        assert!(msg.contains("expected 4"));
    }
}
