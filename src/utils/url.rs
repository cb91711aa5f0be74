//! URL utilities for embed links

use crate::error::ExtractError;
use url::Url;

/// Extract the video ID from an embed URL.
///
/// The ID is the final path segment with any query string stripped,
/// e.g. `https://megacloud.tv/embed-2/e-1/dBqCr5BcOhnD?k=1` yields `dBqCr5BcOhnD`.
pub fn extract_video_id(embed_url: &str) -> Result<String, ExtractError> {
    let parsed = Url::parse(embed_url)?;

    let id = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();

    if id.is_empty() {
        return Err(ExtractError::InvalidUrl(format!(
            "No video ID in embed URL: {}",
            embed_url
        )));
    }

    Ok(id.to_string())
}
