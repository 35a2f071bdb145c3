//! Domain layer for conduct-guard
//!
//! Architecture: Domain Model - Pure data for conformance checking
//! - Source facts, violations and reports
//! - Independent of the file system and of any source language

pub mod source;
pub mod violations;

pub use source::*;
pub use violations::*;
