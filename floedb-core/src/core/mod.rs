pub mod errors;

pub use errors::{ErrorCode, FloeError, Result};
