//! Extraction orchestrator: manifest fetch, branch, decrypt, assemble

use crate::core::models::{ExtractedData, Manifest, RawSource, SourceField};
use crate::error::ExtractError;
use crate::platform::client::{EmbedClient, EmbedSource, HttpClientConfig};
use crate::platform::crypto;
use crate::platform::script::{ScriptExtractor, ScriptPattern, VariableSequence};
use crate::platform::secret::derive_secret;
use crate::utils::cache::VariableCache;
use crate::utils::url::extract_video_id;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Recovers sources, tracks and intro/outro markers from an embed URL
#[derive(Clone)]
pub struct Extractor {
    source: Arc<dyn EmbedSource>,
    script: ScriptExtractor,
    cache: Option<VariableCache>,
}

impl Extractor {
    /// Create an extractor talking to the default endpoints
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self::with_source(EmbedClient::new()?))
    }

    /// Create an extractor with a custom HTTP configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ExtractError> {
        Ok(Self::with_source(EmbedClient::with_config(config)?))
    }

    /// Create an extractor over any transport
    pub fn with_source(source: impl EmbedSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            script: ScriptExtractor::new(),
            cache: None,
        }
    }

    /// Use a different declaration pattern when reading the player script
    pub fn with_script_pattern(mut self, pattern: ScriptPattern) -> Self {
        self.script = ScriptExtractor::with_pattern(pattern);
        self
    }

    /// Reuse recovered variable sequences for `ttl` instead of refetching the script
    pub fn with_script_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(VariableCache::new(ttl));
        self
    }

    /// Extract playable sources and metadata for `embed_url`
    pub async fn extract(&self, embed_url: &str) -> Result<ExtractedData, ExtractError> {
        let video_id = extract_video_id(embed_url)?;
        info!("Extracting sources for video {}", video_id);

        let manifest = self.fetch_manifest(&video_id, embed_url).await?;
        debug!(
            "Manifest for {}: encrypted={}, server={:?}, {} tracks",
            video_id,
            manifest.encrypted,
            manifest.server,
            manifest.tracks.len()
        );

        let sources = match &manifest.sources {
            SourceField::Plain(sources) => {
                debug!("Manifest carries a plain source list");
                sources.clone()
            }
            SourceField::Encrypted(encrypted) => self.decrypt_sources(encrypted).await?,
        };

        info!("Resolved {} sources for video {}", sources.len(), video_id);
        Ok(ExtractedData::from_manifest(manifest, sources))
    }

    async fn fetch_manifest(&self, video_id: &str, referer: &str) -> Result<Manifest, ExtractError> {
        let body = self
            .source
            .fetch_manifest(video_id, referer)
            .await?
            .ok_or_else(|| {
                ExtractError::NotFound(format!("Url may have an invalid video id: {}", video_id))
            })?;

        match serde_json::from_str::<Option<Manifest>>(&body) {
            Ok(Some(manifest)) => Ok(manifest),
            Ok(None) => Err(ExtractError::NotFound(format!(
                "Empty manifest for video id: {}",
                video_id
            ))),
            Err(e) => Err(ExtractError::NotFound(format!(
                "Unusable manifest for video id {}: {}",
                video_id, e
            ))),
        }
    }

    /// Script fetch, variable extraction, secret derivation, decryption, JSON parse.
    ///
    /// A cached sequence that no longer opens the payload is dropped and the
    /// script is fetched again once.
    async fn decrypt_sources(&self, encrypted: &str) -> Result<Vec<RawSource>, ExtractError> {
        if let Some(cache) = &self.cache {
            let key = self.source.script_key();
            if let Some(vars) = cache.get(key).await {
                debug!("Variable sequence cache hit");
                match open_sources(encrypted, &vars) {
                    Err(e) if is_stale_script(&e) => {
                        warn!("Cached script variables failed ({}), refetching script", e);
                        cache.invalidate(key).await;
                    }
                    result => return result,
                }
            }
        }

        let vars = self.fresh_variables().await?;
        open_sources(encrypted, &vars)
    }

    async fn fresh_variables(&self) -> Result<VariableSequence, ExtractError> {
        let script = self.source.fetch_script().await?.ok_or_else(|| {
            ExtractError::UpstreamUnavailable(
                "Couldn't fetch script to decrypt resource".to_string(),
            )
        })?;

        let vars = self.script.extract(&script)?;
        if vars.is_empty() {
            return Err(ExtractError::PatternNotMatched);
        }

        if let Some(cache) = &self.cache {
            cache.insert(self.source.script_key(), vars.clone()).await;
        }
        Ok(vars)
    }
}

/// Failures that point at a rotated player script rather than a bad manifest
fn is_stale_script(error: &ExtractError) -> bool {
    matches!(
        error,
        ExtractError::PatternNotMatched
            | ExtractError::DerivationOutOfRange(_)
            | ExtractError::DecryptionFailure(_)
    )
}

fn open_sources(encrypted: &str, vars: &VariableSequence) -> Result<Vec<RawSource>, ExtractError> {
    let derived = derive_secret(encrypted, vars)?;
    let plaintext = crypto::decrypt(&derived.residual, &derived.secret, None)?;

    serde_json::from_str::<Vec<RawSource>>(&plaintext).map_err(|e| {
        ExtractError::DecryptionFailure(format!("decrypted sources are not a source list: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Interval, Source};
    use crate::platform::crypto::tests::encrypt_with_password;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SCRIPT: &str =
        "var z=0;const k=new URLSearchParams(location.search),a=1,b=64,c=4;function p(){}";
    const SECRET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const SOURCES_JSON: &str = r#"[{"file":"https://cdn.example/hls/master.m3u8","type":"hls"}]"#;

    /// Payload as the host would serve it: vars `[1, 64, 4]` carve one piece
    /// of 64 chars starting at offset 4. The secret is valid base64 with no
    /// repeated characters, so leaving it in place still decodes to whole blocks.
    fn encrypted_fixture() -> String {
        hide_secret(&encrypt_with_password(SOURCES_JSON, SECRET, *b"12345678"), SECRET, 4)
    }

    fn hide_secret(payload: &str, secret: &str, at: usize) -> String {
        format!("{}{}{}", &payload[..at], secret, &payload[at..])
    }

    struct StubSource {
        manifest: Option<String>,
        script: Option<String>,
        script_fetches: AtomicUsize,
    }

    impl StubSource {
        fn new(manifest: Option<String>, script: Option<&str>) -> Self {
            Self {
                manifest,
                script: script.map(str::to_string),
                script_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbedSource for Arc<StubSource> {
        async fn fetch_manifest(
            &self,
            _video_id: &str,
            _referer: &str,
        ) -> Result<Option<String>, ExtractError> {
            Ok(self.manifest.clone())
        }

        async fn fetch_script(&self) -> Result<Option<String>, ExtractError> {
            self.script_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.script.clone())
        }

        fn script_key(&self) -> &str {
            "stub"
        }
    }

    fn encrypted_manifest() -> String {
        serde_json::json!({
            "sources": encrypted_fixture(),
            "tracks": [{"file": "https://cdn.example/en.vtt", "kind": "captions", "label": "English", "default": true}],
            "encrypted": true,
            "intro": {"start": 5, "end": 90},
            "outro": {"start": 0, "end": 0},
            "server": 1
        })
        .to_string()
    }

    const EMBED_URL: &str = "https://megacloud.tv/embed-2/e-1/dBqCr5BcOhnD?k=1";

    #[tokio::test]
    async fn test_plain_sources_skip_script() {
        let manifest = r#"{"sources":[{"file":"https://x/a.m3u8","type":"hls"}],"tracks":[],"encrypted":false,"intro":{"start":0,"end":0},"outro":{"start":0,"end":0},"server":1}"#;
        let stub = Arc::new(StubSource::new(Some(manifest.to_string()), None));
        let extractor = Extractor::with_source(stub.clone());

        let data = extractor.extract(EMBED_URL).await.unwrap();
        assert_eq!(
            data.sources,
            vec![Source {
                url: "https://x/a.m3u8".to_string(),
                kind: "hls".to_string(),
            }]
        );
        assert!(data.tracks.is_empty());
        assert_eq!(data.intro, Interval::default());
        assert_eq!(data.outro, Interval::default());
        assert_eq!(stub.script_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_encrypted_flag_with_plain_array() {
        let manifest = r#"{"sources":[{"file":"https://x/b.m3u8","type":"hls"}],"encrypted":true,"intro":{"start":1,"end":2}}"#;
        let stub = Arc::new(StubSource::new(Some(manifest.to_string()), None));
        let extractor = Extractor::with_source(stub.clone());

        let data = extractor.extract(EMBED_URL).await.unwrap();
        assert_eq!(data.sources[0].url, "https://x/b.m3u8");
        assert_eq!(data.intro, Interval::new(1.0, 2.0));
        assert_eq!(stub.script_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_encrypted_sources_are_decrypted() {
        let stub = Arc::new(StubSource::new(Some(encrypted_manifest()), Some(SCRIPT)));
        let extractor = Extractor::with_source(stub.clone());

        let data = extractor.extract(EMBED_URL).await.unwrap();
        assert_eq!(data.sources.len(), 1);
        assert_eq!(data.sources[0].url, "https://cdn.example/hls/master.m3u8");
        assert_eq!(data.sources[0].kind, "hls");
        assert_eq!(data.intro, Interval::new(5.0, 90.0));
        assert_eq!(data.outro, Interval::default());
        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].label.as_deref(), Some("English"));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_not_found() {
        let stub = Arc::new(StubSource::new(None, Some(SCRIPT)));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_null_manifest_is_not_found() {
        let stub = Arc::new(StubSource::new(Some("null".to_string()), Some(SCRIPT)));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_script_is_upstream_unavailable() {
        let stub = Arc::new(StubSource::new(Some(encrypted_manifest()), None));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unmatched_script_is_pattern_failure() {
        let stub = Arc::new(StubSource::new(
            Some(encrypted_manifest()),
            Some("function nothing(){}"),
        ));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::PatternNotMatched)));
    }

    #[tokio::test]
    async fn test_short_sequence_is_out_of_range() {
        let script = "const k=new URLSearchParams(s),a=3,b=1;function p(){}";
        let stub = Arc::new(StubSource::new(Some(encrypted_manifest()), Some(script)));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::DerivationOutOfRange(_))));
    }

    #[tokio::test]
    async fn test_zero_count_decryption_fails() {
        // Nothing is carved: the residual is the whole block-aligned string
        // and the cipher runs with an empty password
        let script = "const k=new URLSearchParams(s),a=0;function p(){}";
        let stub = Arc::new(StubSource::new(Some(encrypted_manifest()), Some(script)));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::DecryptionFailure(_))));
    }

    #[tokio::test]
    async fn test_non_json_plaintext_is_decryption_failure() {
        let payload = encrypt_with_password("not json", SECRET, *b"12345678");
        let encrypted = hide_secret(&payload, SECRET, 4);
        let manifest = serde_json::json!({"sources": encrypted, "encrypted": true}).to_string();
        let stub = Arc::new(StubSource::new(Some(manifest), Some(SCRIPT)));
        let extractor = Extractor::with_source(stub);

        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::DecryptionFailure(_))));
    }

    #[tokio::test]
    async fn test_script_cache_avoids_refetch() {
        let stub = Arc::new(StubSource::new(Some(encrypted_manifest()), Some(SCRIPT)));
        let extractor =
            Extractor::with_source(stub.clone()).with_script_cache(Duration::from_secs(60));

        extractor.extract(EMBED_URL).await.unwrap();
        extractor.extract(EMBED_URL).await.unwrap();
        assert_eq!(stub.script_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_embed_url() {
        let stub = Arc::new(StubSource::new(None, None));
        let extractor = Extractor::with_source(stub);

        assert!(extractor.extract("not a url").await.is_err());
    }

    fn mock_config(server: &mockito::ServerGuard) -> HttpClientConfig {
        HttpClientConfig {
            sources_endpoint: format!("{}/embed-2/ajax/e-1/getSources?id=", server.url()),
            script_endpoint: format!("{}/js/player/a/prod/e1-player.min.js?v=", server.url()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_http_plain_manifest() {
        let mut server = mockito::Server::new_async().await;
        let manifest_mock = server
            .mock("GET", "/embed-2/ajax/e-1/getSources?id=dBqCr5BcOhnD")
            .match_header("referer", EMBED_URL)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sources":[{"file":"https://x/a.m3u8","type":"hls"}],"tracks":[],"encrypted":false,"intro":{"start":0,"end":0},"outro":{"start":0,"end":0},"server":1}"#)
            .create_async()
            .await;
        let script_mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/js/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let extractor = Extractor::with_config(mock_config(&server)).unwrap();
        let data = extractor.extract(EMBED_URL).await.unwrap();

        assert_eq!(data.sources.len(), 1);
        assert_eq!(data.sources[0].url, "https://x/a.m3u8");
        assert_eq!(data.sources[0].kind, "hls");
        assert!(data.tracks.is_empty());
        assert_eq!(data.intro, Interval::default());
        manifest_mock.assert_async().await;
        script_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_encrypted_manifest() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/embed-2/ajax/e-1/getSources?id=dBqCr5BcOhnD")
            .with_status(200)
            .with_body(encrypted_manifest())
            .create_async()
            .await;
        let script_mock = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/js/player/a/prod/e1-player\.min\.js\?v=\d+$".to_string()),
            )
            .with_status(200)
            .with_body(SCRIPT)
            .create_async()
            .await;

        let extractor = Extractor::with_config(mock_config(&server)).unwrap();
        let data = extractor.extract(EMBED_URL).await.unwrap();

        assert_eq!(data.sources[0].url, "https://cdn.example/hls/master.m3u8");
        assert_eq!(data.intro, Interval::new(5.0, 90.0));
        script_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_unknown_video_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/embed-2/ajax/e-1/getSources?id=dBqCr5BcOhnD")
            .with_status(404)
            .create_async()
            .await;

        let extractor = Extractor::with_config(mock_config(&server)).unwrap();
        let result = extractor.extract(EMBED_URL).await;
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    /// Serves one manifest/script pair until `rotate` swaps in the next one
    struct RotatingSource {
        current: Mutex<(String, String)>,
        script_fetches: AtomicUsize,
    }

    impl RotatingSource {
        fn rotate(&self, manifest: String, script: &str) {
            *self.current.lock().unwrap() = (manifest, script.to_string());
        }
    }

    #[async_trait]
    impl EmbedSource for Arc<RotatingSource> {
        async fn fetch_manifest(
            &self,
            _video_id: &str,
            _referer: &str,
        ) -> Result<Option<String>, ExtractError> {
            Ok(Some(self.current.lock().unwrap().0.clone()))
        }

        async fn fetch_script(&self) -> Result<Option<String>, ExtractError> {
            self.script_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.current.lock().unwrap().1.clone()))
        }

        fn script_key(&self) -> &str {
            "rotating"
        }
    }

    #[tokio::test]
    async fn test_script_rotation_drops_cached_variables() {
        let source = Arc::new(RotatingSource {
            current: Mutex::new((encrypted_manifest(), SCRIPT.to_string())),
            script_fetches: AtomicUsize::new(0),
        });
        let extractor =
            Extractor::with_source(source.clone()).with_script_cache(Duration::from_secs(600));
        extractor.extract(EMBED_URL).await.unwrap();

        // New player: the secret now sits at offset 8 with a different key
        let rotated_secret = "zyxwvutsrqponmlkjihgfedcbaZYXWVUTSRQPONMLKJIHGFEDCBA9876543210/+";
        let payload = encrypt_with_password(SOURCES_JSON, rotated_secret, *b"87654321");
        let manifest = serde_json::json!({
            "sources": hide_secret(&payload, rotated_secret, 8),
            "encrypted": true
        })
        .to_string();
        source.rotate(
            manifest,
            "const k=new URLSearchParams(s),a=1,b=64,c=8;function p(){}",
        );

        for _ in 0..3 {
            let data = extractor.extract(EMBED_URL).await.unwrap();
            assert_eq!(data.sources[0].url, "https://cdn.example/hls/master.m3u8");
        }
        assert_eq!(source.script_fetches.load(Ordering::SeqCst), 2);
    }
}
