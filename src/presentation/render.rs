//! Plain-text rendering of analysis results.

use std::io::{self, Write};
use std::time::Duration;

use crate::application::services::{COMPARISON_PROMPTS, CacheStats, QUICK_PROMPTS};
use crate::domain::entities::{AnalysisOutcome, ChatHistory};

const BAR_WIDTH: usize = 10;
const RULE_WIDTH: usize = 60;
const PREVIEW_CHARS: usize = 80;

/// Section heading padded with a rule.
#[must_use]
pub fn heading(title: &str) -> String {
    let used = title.chars().count() + 4;
    format!("── {title} {}", "─".repeat(RULE_WIDTH.saturating_sub(used)))
}

/// Renders `confidence` as a bar, e.g. `[█████████░] 90%`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn confidence_bar(confidence: Option<f32>) -> String {
    let Some(confidence) = confidence else {
        return "not stated".to_string();
    };
    let confidence = confidence.clamp(0.0, 1.0);
    let filled = (confidence * BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        confidence * 100.0
    )
}

/// Formats a duration for humans: `850ms`, `1.42s`, `2m 05s`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else if elapsed.as_secs() < 60 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        let secs = elapsed.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Formats a byte count with a binary unit: `512 B`, `1.5 KiB`, `20.0 MiB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Writes the answer section and its metadata.
///
/// # Errors
/// Returns error if writing fails.
pub fn render_outcome<W: Write>(
    out: &mut W,
    title: &str,
    outcome: &AnalysisOutcome,
    model: &str,
) -> io::Result<()> {
    writeln!(out, "{}", heading(title))?;
    writeln!(out, "{}", outcome.answer().trim_end())?;
    writeln!(out)?;
    writeln!(out, "Confidence   {}", confidence_bar(outcome.confidence()))?;
    if outcome.source.is_cached() {
        writeln!(out, "Source       {}", outcome.source)?;
    } else {
        writeln!(out, "Source       {} ({model})", outcome.source)?;
    }
    writeln!(out, "Elapsed      {}", format_elapsed(outcome.elapsed))?;
    if let Some(fingerprint) = outcome.fingerprint {
        writeln!(out, "Fingerprint  {}", fingerprint.short())?;
    }
    Ok(())
}

/// Writes every turn of the session, oldest first.
///
/// # Errors
/// Returns error if writing fails.
pub fn render_history<W: Write>(out: &mut W, history: &ChatHistory) -> io::Result<()> {
    writeln!(out, "{}", heading(&format!("History ({})", history.len())))?;
    if history.is_empty() {
        writeln!(out, "No questions asked yet.")?;
        return Ok(());
    }
    for turn in history.turns() {
        let label = turn.time_label();
        writeln!(out, "[{label}] Q: {}", turn.question())?;
        writeln!(
            out,
            "{:width$} A: {}",
            "",
            preview(turn.answer()),
            width = label.len() + 2
        )?;
    }
    Ok(())
}

/// Writes both preset catalogs, numbered from 1.
///
/// # Errors
/// Returns error if writing fails.
pub fn render_presets<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", heading("Quick prompts"))?;
    for (i, prompt) in QUICK_PROMPTS.iter().enumerate() {
        writeln!(out, "{:>3}. {prompt}", i + 1)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", heading("Comparison prompts"))?;
    for (i, prompt) in COMPARISON_PROMPTS.iter().enumerate() {
        writeln!(out, "{:>3}. {prompt}", i + 1)?;
    }
    Ok(())
}

/// Writes memory cache statistics.
///
/// # Errors
/// Returns error if writing fails.
pub fn render_stats<W: Write>(out: &mut W, stats: &CacheStats) -> io::Result<()> {
    writeln!(out, "{}", heading("Cache"))?;
    writeln!(out, "{stats}")
}

/// First line of `text`, shortened to a fixed width.
fn preview(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let mut short: String = line.chars().take(PREVIEW_CHARS - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Local, TimeZone};
    use test_case::test_case;

    use crate::domain::entities::{AnalysisResult, ChatTurn, Fingerprint, ResultSource};

    fn render_to_string(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test_case(Some(0.9), "[█████████░] 90%" ; "high")]
    #[test_case(Some(0.3), "[███░░░░░░░] 30%" ; "low")]
    #[test_case(Some(0.0), "[░░░░░░░░░░] 0%" ; "zero")]
    #[test_case(Some(1.0), "[██████████] 100%" ; "full")]
    #[test_case(None, "not stated" ; "missing")]
    fn test_confidence_bar(confidence: Option<f32>, expected: &str) {
        assert_eq!(confidence_bar(confidence), expected);
    }

    #[test_case(Duration::from_millis(850), "850ms" ; "millis")]
    #[test_case(Duration::from_millis(1420), "1.42s" ; "seconds")]
    #[test_case(Duration::from_secs(125), "2m 05s" ; "minutes")]
    fn test_format_elapsed(elapsed: Duration, expected: &str) {
        assert_eq!(format_elapsed(elapsed), expected);
    }

    #[test_case(512, "512 B" ; "bytes")]
    #[test_case(1536, "1.5 KiB" ; "kib")]
    #[test_case(20 * 1024 * 1024, "20.0 MiB" ; "mib")]
    fn test_format_bytes(bytes: u64, expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }

    #[test]
    fn test_render_outcome() {
        let fingerprint = Fingerprint::from_parts(b"img", "prompt");
        let outcome = AnalysisOutcome {
            result: Arc::new(AnalysisResult::new("A red bicycle.").with_confidence(Some(0.6))),
            fingerprint: Some(fingerprint),
            source: ResultSource::Remote,
            elapsed: Duration::from_millis(1500),
        };

        let text = render_to_string(|out| render_outcome(out, "Answer", &outcome, "gemini-test"));

        assert!(text.starts_with("── Answer "));
        assert!(text.contains("A red bicycle."));
        assert!(text.contains("[██████░░░░] 60%"));
        assert!(text.contains("remote (gemini-test)"));
        assert!(text.contains("1.50s"));
        assert!(text.contains(&fingerprint.short()));
    }

    #[test]
    fn test_render_cached_outcome_without_fingerprint() {
        let outcome = AnalysisOutcome {
            result: Arc::new(AnalysisResult::new("cached")),
            fingerprint: None,
            source: ResultSource::MemoryCache,
            elapsed: Duration::from_millis(2),
        };

        let text = render_to_string(|out| render_outcome(out, "Answer", &outcome, "m"));

        assert!(text.contains("Source       memory cache\n"));
        assert!(!text.contains("Fingerprint"));
    }

    #[test]
    fn test_render_history() {
        let mut history = ChatHistory::new();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 5, 3).unwrap();
        history.push(ChatTurn::at(
            "What is this?",
            "\n1. Direct Answer: A lighthouse.\n2. Details: ...",
            at,
        ));

        let text = render_to_string(|out| render_history(out, &history));

        assert!(text.contains("History (1)"));
        assert!(text.contains("[09:05:03] Q: What is this?"));
        assert!(text.contains("A: 1. Direct Answer: A lighthouse."));
        assert!(!text.contains("Details"));
    }

    #[test]
    fn test_render_empty_history() {
        let text = render_to_string(|out| render_history(out, &ChatHistory::new()));
        assert!(text.contains("No questions asked yet."));
    }

    #[test]
    fn test_render_presets_numbers_from_one() {
        let text = render_to_string(|out| render_presets(out));

        assert!(text.contains("  1. Describe the scene"));
        assert!(text.contains(" 15. Which image is more professional?"));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(200);
        let short = preview(&long);

        assert_eq!(short.chars().count(), PREVIEW_CHARS);
        assert!(short.ends_with('…'));
    }
}
