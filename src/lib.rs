//! # megacloud - embed source extractor
//!
//! Recovers playable video sources, subtitle tracks and intro/outro markers
//! from megacloud-style embed links.
//!
//! ## Features
//!
//! - Plain and encrypted source manifests
//! - Numeric variable recovery from the obfuscated player script
//! - Secret carving and AES-256-CBC decryption of the source list
//! - Optional caching of script variables across extractions
//!
//! ## Example
//!
//! ```rust,no_run
//! use megacloud::Extractor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = Extractor::new()?;
//!     let data = extractor
//!         .extract("https://megacloud.tv/embed-2/e-1/dBqCr5BcOhnD?k=1")
//!         .await?;
//!
//!     for source in &data.sources {
//!         println!("{} ({})", source.url, source.kind);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{ExtractedData, Extractor, Interval, Manifest, Source, Track};
pub use error::ExtractError;
pub use platform::{EmbedClient, EmbedSource, HttpClientConfig, ScriptPattern, VariableSequence};

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
