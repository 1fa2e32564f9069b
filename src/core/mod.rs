pub mod error;

pub use error::{ErrorDetail, FieldErrors, FreezeError, Result};
