pub mod diagnostics;
pub mod error;
