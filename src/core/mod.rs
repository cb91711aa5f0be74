//! Core functionality for megacloud

pub mod extractor;
pub mod models;

pub use extractor::*;
pub use models::*;
