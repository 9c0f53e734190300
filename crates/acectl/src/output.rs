//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use acectl_core::{Notice, NoticeLevel};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// A notice line, colored by level when enabled.
pub fn format_notice(notice: &Notice, color: bool) -> String {
    let text = notice.to_string();
    if !color {
        return format!("[{}] {text}", notice.level());
    }
    match notice.level() {
        NoticeLevel::Success => format!("{} {text}", "✓".green()),
        NoticeLevel::Info => format!("{} {text}", "•".cyan()),
        NoticeLevel::Error => format!("{} {}", "✗".red(), text.red()),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`; plain uses `plain_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

// ── Time formatting ──────────────────────────────────────────────────

/// Remaining dryer time as `Xm Ys`.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn format_remaining(minutes: f64) -> String {
    let total_secs = (minutes.max(0.0) * 60.0).round() as i64;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

/// Configured duration as `Xh Ym`.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time() {
        assert_eq!(format_remaining(0.0), "0m 0s");
        assert_eq!(format_remaining(119.5), "119m 30s");
        assert_eq!(format_remaining(2.0 + 1.0 / 60.0), "2m 1s");
        assert_eq!(format_remaining(-3.0), "0m 0s");
    }

    #[test]
    fn configured_duration() {
        assert_eq!(format_duration(240), "4h 0m");
        assert_eq!(format_duration(95), "1h 35m");
        assert_eq!(format_duration(0), "0h 0m");
    }

    #[test]
    fn uncolored_notice_carries_level() {
        let line = format_notice(&Notice::StatusRefreshed, false);
        assert_eq!(line, "[success] Status refreshed");
    }
}
