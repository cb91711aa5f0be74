//! Command line argument parsing

use crate::platform::client::{
    HttpClientConfig, DEFAULT_SCRIPT_ENDPOINT, DEFAULT_SOURCES_ENDPOINT, DEFAULT_USER_AGENT,
};
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Megacloud extractor - recover video sources, subtitles and intro/outro markers from embed links
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// One or more embed URLs
    #[arg(required = true, value_name = "EMBED_URL")]
    pub urls: Vec<String>,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Sources endpoint, the video ID is appended
    #[arg(long, value_name = "URL", default_value = DEFAULT_SOURCES_ENDPOINT)]
    pub sources_endpoint: String,

    /// Player script endpoint, a timestamp is appended
    #[arg(long, value_name = "URL", default_value = DEFAULT_SCRIPT_ENDPOINT)]
    pub script_endpoint: String,

    /// Declaration pattern to look for in the player script
    #[arg(long, value_enum, default_value = "url-search-params")]
    pub pattern: PatternArg,

    /// Reuse script variables across URLs for this long (e.g., 10m)
    #[arg(long, value_name = "DURATION")]
    pub script_cache_ttl: Option<humantime::Duration>,

    /// Number of URLs extracted at once
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Script declaration pattern
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PatternArg {
    /// `const x=new URLSearchParams(...),...;function`
    UrlSearchParams,
    /// `const a='..',b=c(..),...;`
    ConstTable,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            sources_endpoint: DEFAULT_SOURCES_ENDPOINT.to_string(),
            script_endpoint: DEFAULT_SCRIPT_ENDPOINT.to_string(),
            pattern: PatternArg::UrlSearchParams,
            script_cache_ttl: None,
            concurrency: 1,
            pretty: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get script cache TTL as Duration
    pub fn script_cache_duration(&self) -> Option<Duration> {
        self.script_cache_ttl.map(Into::into)
    }

    /// Effective concurrency, never zero
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Build the HTTP client configuration
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.timeout_duration(),
            user_agent: self.user_agent.clone(),
            proxy_url: self.proxy.clone(),
            sources_endpoint: self.sources_endpoint.clone(),
            script_endpoint: self.script_endpoint.clone(),
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbosity_level() {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}
