//! Utility functions for megacloud

pub mod cache;
pub mod url;

pub use self::cache::*;
pub use self::url::*;
