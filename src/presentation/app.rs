//! Command execution and the interactive chat session.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use color_eyre::eyre::{WrapErr, eyre};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::render::{render_history, render_outcome, render_presets, render_stats};
use crate::application::services::{
    AnalysisMode, COMPARISON_PROMPTS, QUICK_PROMPTS, combine_questions, find_preset,
};
use crate::application::use_cases::AnalysisClient;
use crate::domain::entities::ChatHistory;
use crate::domain::errors::AnalysisError;

const QUIT_COMMANDS: &[&str] = &[":quit", ":q", ":exit"];

/// Builds the question from free text and preset selections.
///
/// Selected presets are joined with `" & "` and replace the typed question.
///
/// # Errors
/// Returns error if a preset cannot be resolved or nothing was asked.
pub fn resolve_question(
    question: Option<&str>,
    presets: &[String],
    catalog: &[&'static str],
) -> color_eyre::Result<String> {
    let question = question.map(str::trim).filter(|q| !q.is_empty());

    if presets.is_empty() {
        return question
            .map(str::to_string)
            .ok_or_else(|| eyre!("no question given; pass a QUESTION or at least one --preset"));
    }

    let parts: Vec<&str> = presets
        .iter()
        .map(|query| {
            find_preset(catalog, query).ok_or_else(|| eyre!("unknown preset '{query}'"))
        })
        .collect::<color_eyre::Result<_>>()?;

    if let Some(question) = question {
        warn!(question, "Presets selected, ignoring typed question");
    }

    Ok(combine_questions(&parts))
}

/// Reads an image file fully into memory.
///
/// # Errors
/// Returns error if the file cannot be read.
pub async fn read_image(path: &Path) -> color_eyre::Result<Bytes> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("failed to read image {}", path.display()))?;
    debug!(path = %path.display(), size = bytes.len(), "Read image file");
    Ok(Bytes::from(bytes))
}

/// Runs analysis commands against an [`AnalysisClient`].
pub struct App {
    client: Arc<AnalysisClient>,
    cancel: CancellationToken,
}

impl App {
    /// Creates the front end over a shared client.
    #[must_use]
    pub fn new(client: Arc<AnalysisClient>, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Answers one question about one image.
    ///
    /// # Errors
    /// Returns error if the image cannot be read or analysis fails.
    pub async fn analyze<W: Write>(
        &self,
        out: &mut W,
        image: &Path,
        question: Option<&str>,
        presets: &[String],
        mode: AnalysisMode,
    ) -> color_eyre::Result<()> {
        let question = resolve_question(question, presets, QUICK_PROMPTS)?;
        let bytes = read_image(image).await?;

        info!(image = %image.display(), mode = %mode, "Analyzing image");

        let outcome = self
            .client
            .analyze_with_cancel(bytes, &question, mode, &self.cancel)
            .await?;

        writeln!(out, "Q: {question}")?;
        render_outcome(out, &mode.to_string(), &outcome, self.client.model_name())?;
        Ok(())
    }

    /// Answers one question comparing two images.
    ///
    /// # Errors
    /// Returns error if either image cannot be read or the comparison fails.
    pub async fn compare<W: Write>(
        &self,
        out: &mut W,
        first: &Path,
        second: &Path,
        question: Option<&str>,
        presets: &[String],
    ) -> color_eyre::Result<()> {
        let question = resolve_question(question, presets, COMPARISON_PROMPTS)?;
        let (first_bytes, second_bytes) = tokio::try_join!(read_image(first), read_image(second))?;

        info!(first = %first.display(), second = %second.display(), "Comparing images");

        let outcome = self
            .client
            .compare_with_cancel(first_bytes, second_bytes, &question, &self.cancel)
            .await?;

        writeln!(out, "Q: {question}")?;
        render_outcome(out, "Comparison", &outcome, self.client.model_name())?;
        Ok(())
    }

    /// Interactive session: one question per input line.
    ///
    /// Lines starting with `#` select a preset by number. `:history`,
    /// `:stats` and `:presets` print session information; `:quit` ends the
    /// session, as does end of input.
    ///
    /// # Errors
    /// Returns error if an image cannot be read or output cannot be written.
    /// Failed questions are reported and the session continues.
    pub async fn chat<R, W>(
        &self,
        input: R,
        out: &mut W,
        image: &Path,
        compare_with: Option<&Path>,
        mode: AnalysisMode,
    ) -> color_eyre::Result<ChatHistory>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let first = read_image(image).await?;
        let second = match compare_with {
            Some(path) => Some(read_image(path).await?),
            None => None,
        };
        let catalog = if second.is_some() {
            COMPARISON_PROMPTS
        } else {
            QUICK_PROMPTS
        };

        let mut history = ChatHistory::new();
        let mut lines = input.lines();

        writeln!(
            out,
            "Ask about {}. Type :help for commands, :quit to leave.",
            compare_with.map_or_else(
                || image.display().to_string(),
                |other| format!("{} and {}", image.display(), other.display())
            )
        )?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let line = tokio::select! {
                () = self.cancel.cancelled() => break,
                line = lines.next_line() => line.wrap_err("failed to read input")?,
            };
            let Some(line) = line else { break };
            let line = line.trim();

            match line {
                "" => continue,
                cmd if QUIT_COMMANDS.contains(&cmd) => break,
                ":history" => {
                    render_history(out, &history)?;
                    continue;
                }
                ":stats" => {
                    render_stats(out, &self.client.cache_stats())?;
                    continue;
                }
                ":presets" => {
                    render_presets(out)?;
                    continue;
                }
                ":help" => {
                    writeln!(
                        out,
                        "#N asks preset N. Commands: :history :stats :presets :quit"
                    )?;
                    continue;
                }
                _ => {}
            }

            let question = match line.strip_prefix('#') {
                Some(index) => match find_preset(catalog, index) {
                    Some(preset) => preset.to_string(),
                    None => {
                        writeln!(out, "No preset {index}. Try :presets.")?;
                        continue;
                    }
                },
                None => line.to_string(),
            };

            let result = match &second {
                Some(second) => {
                    self.client
                        .compare_with_cancel(first.clone(), second.clone(), &question, &self.cancel)
                        .await
                }
                None => {
                    self.client
                        .analyze_with_cancel(first.clone(), &question, mode, &self.cancel)
                        .await
                }
            };

            match result {
                Ok(outcome) => {
                    render_outcome(out, "Answer", &outcome, self.client.model_name())?;
                    history.record(question, outcome.answer());
                }
                Err(AnalysisError::Cancelled) => break,
                Err(e @ (AnalysisError::InvalidImage { .. } | AnalysisError::Configuration { .. })) => {
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "Chat question failed");
                    writeln!(out, "Error: {e}")?;
                }
            }
        }

        writeln!(out)?;
        render_history(out, &history)?;
        Ok(history)
    }
}
