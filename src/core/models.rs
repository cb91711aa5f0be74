//! Manifest and extraction result structures

use serde::{Deserialize, Serialize};

/// Subtitle or thumbnail track, passed through unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track URL
    pub file: String,
    /// Track kind (e.g. "captions", "thumbnails")
    pub kind: String,
    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Whether the player selects this track by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

/// Time interval in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Source entry as the upstream host describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSource {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The `sources` field of a manifest: either the plain list or one encrypted string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceField {
    Plain(Vec<RawSource>),
    Encrypted(String),
}

/// Raw manifest returned by the sources endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub encrypted: bool,
    pub sources: SourceField,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub intro: Interval,
    #[serde(default)]
    pub outro: Interval,
    #[serde(default)]
    pub server: Option<u32>,
}

/// Playable source in the canonical output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<RawSource> for Source {
    fn from(raw: RawSource) -> Self {
        Self {
            url: raw.file,
            kind: raw.kind,
        }
    }
}

/// Final extraction result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub sources: Vec<Source>,
    pub tracks: Vec<Track>,
    pub intro: Interval,
    pub outro: Interval,
}

impl ExtractedData {
    /// Assemble the output from resolved sources and the manifest's metadata
    pub fn from_manifest(manifest: Manifest, sources: Vec<RawSource>) -> Self {
        Self {
            sources: sources.into_iter().map(Source::from).collect(),
            tracks: manifest.tracks,
            intro: manifest.intro,
            outro: manifest.outro,
        }
    }

}
