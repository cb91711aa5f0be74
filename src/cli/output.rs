//! Output formatting

use crate::cli::args::VerbosityLevel;
use crate::core::models::ExtractedData;
use colored::Colorize;
use std::time::Duration;

/// Output formatter for the extractor CLI
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    pretty: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel, pretty: bool) -> Self {
        Self { verbosity, pretty }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "info:".cyan().bold(), message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "done:".green().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Per-URL summary of the extraction, only produced in verbose mode
    pub fn summary(&self, url: &str, data: &ExtractedData) -> Option<String> {
        if self.verbosity != VerbosityLevel::Verbose {
            return None;
        }

        let mut lines = vec![url.bold().to_string()];
        for source in &data.sources {
            lines.push(format!("  source   [{}] {}", source.kind, source.url));
        }
        for track in &data.tracks {
            let label = track.label.as_deref().unwrap_or("-");
            lines.push(format!("  track    [{}] {} {}", track.kind, label, track.file));
        }
        lines.push(format!(
            "  intro    {}..{}  outro {}..{}",
            data.intro.start, data.intro.end, data.outro.start, data.outro.end
        ));
        Some(lines.join("\n"))
    }

    /// Print the per-URL summary
    pub fn print_summary(&self, url: &str, data: &ExtractedData) {
        if let Some(summary) = self.summary(url, data) {
            eprintln!("{}", summary);
        }
    }

    /// Render results as JSON. A single-URL run prints a bare object, a batch
    /// run always prints an array, even when only one URL succeeded.
    pub fn render_json(
        &self,
        results: &[ExtractedData],
        as_array: bool,
    ) -> serde_json::Result<String> {
        match results {
            [single] if !as_array && self.pretty => serde_json::to_string_pretty(single),
            [single] if !as_array => serde_json::to_string(single),
            many if self.pretty => serde_json::to_string_pretty(many),
            many => serde_json::to_string(many),
        }
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();

    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    }
}
