//! Structured prompts and preset questions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Preset questions for a single image.
pub const QUICK_PROMPTS: &[&str] = &[
    "Describe the scene",
    "List main objects",
    "Analyze colors",
    "Detect emotions",
    "Identify text",
];

/// Preset questions for comparing two images.
pub const COMPARISON_PROMPTS: &[&str] = &[
    "Compare the overall composition",
    "What are the main differences?",
    "Which image has better lighting?",
    "Compare the colors and contrast",
    "Compare the objects present",
    "Which image appears older?",
    "Compare the styles",
    "Compare the emotions conveyed",
    "Which image is more detailed?",
    "Compare the backgrounds",
    "Which image is more vibrant?",
    "Compare the focal points",
    "Which image tells a better story?",
    "Compare the time periods",
    "Which image is more professional?",
];

/// Separator used when several presets are asked at once.
pub const PROMPT_JOINER: &str = " & ";

/// Emphasis applied to single-image analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// No extra emphasis.
    #[default]
    General,
    /// Camera, exposure, and composition details.
    Technical,
    /// Style, mood, and artistic technique.
    Artistic,
    /// Enumerate and locate objects.
    ObjectDetection,
}

impl AnalysisMode {
    /// Extra instruction added to the prompt, if any.
    #[must_use]
    pub const fn focus(self) -> Option<&'static str> {
        match self {
            Self::General => None,
            Self::Technical => Some(
                "Focus on technical details such as lighting, exposure, focus, resolution and composition.",
            ),
            Self::Artistic => Some(
                "Focus on artistic qualities such as style, mood, color palette and technique.",
            ),
            Self::ObjectDetection => Some(
                "Focus on identifying every distinct object, with its approximate position in the image.",
            ),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "General Analysis"),
            Self::Technical => write!(f, "Technical Details"),
            Self::Artistic => write!(f, "Artistic Analysis"),
            Self::ObjectDetection => write!(f, "Object Detection"),
        }
    }
}

/// Builds the three-part single-image prompt.
#[must_use]
pub fn analysis_prompt(question: &str, mode: AnalysisMode) -> String {
    let focus = mode
        .focus()
        .map(|focus| format!("{focus}\n"))
        .unwrap_or_default();

    format!(
        "Please analyze this image and answer the following question:\n\
         {question}\n\
         {focus}\n\
         Provide your response in this format:\n\
         1. Direct Answer: [Concise answer to the question]\n\
         2. Details: [Additional relevant details]\n\
         3. Confidence: [High/Medium/Low based on clarity of visual elements]\n"
    )
}

/// Builds the four-part two-image comparison prompt.
#[must_use]
pub fn comparison_prompt(question: &str) -> String {
    format!(
        "Please compare these two images and answer the following question:\n\
         {question}\n\
         \n\
         Provide your response in this format:\n\
         1. Image 1: [Description of first image]\n\
         2. Image 2: [Description of second image]\n\
         3. Comparison: [Key differences and similarities]\n\
         4. Answer: [Direct answer to the question]\n"
    )
}

/// Joins several questions into one, in the given order.
#[must_use]
pub fn combine_questions<S: AsRef<str>>(questions: &[S]) -> String {
    questions
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PROMPT_JOINER)
}

/// Resolves a preset by its text (case-insensitive) or its 1-based index.
#[must_use]
pub fn find_preset(presets: &[&'static str], query: &str) -> Option<&'static str> {
    let query = query.trim();
    if let Ok(index) = usize::from_str(query) {
        return index.checked_sub(1).and_then(|i| presets.get(i)).copied();
    }
    presets
        .iter()
        .find(|preset| preset.eq_ignore_ascii_case(query))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_prompt_embeds_question_and_shape() {
        let prompt = analysis_prompt("What breed is the dog?", AnalysisMode::General);

        assert!(prompt.contains("What breed is the dog?"));
        assert!(prompt.contains("1. Direct Answer:"));
        assert!(prompt.contains("2. Details:"));
        assert!(prompt.contains("3. Confidence:"));
        assert!(!prompt.contains("Focus on"));
    }

    #[test]
    fn test_mode_changes_prompt() {
        let general = analysis_prompt("q", AnalysisMode::General);
        let technical = analysis_prompt("q", AnalysisMode::Technical);

        assert_ne!(general, technical);
        assert!(technical.contains("Focus on technical details"));
    }

    #[test]
    fn test_comparison_prompt_has_four_parts() {
        let prompt = comparison_prompt("Which is brighter?");

        assert!(prompt.contains("Which is brighter?"));
        for part in ["1. Image 1:", "2. Image 2:", "3. Comparison:", "4. Answer:"] {
            assert!(prompt.contains(part), "missing {part}");
        }
    }

    #[test]
    fn test_combine_questions() {
        assert_eq!(
            combine_questions(&["Describe the scene", "Analyze colors"]),
            "Describe the scene & Analyze colors"
        );
        assert_eq!(combine_questions::<&str>(&[]), "");
    }

    #[test]
    fn test_find_preset() {
        assert_eq!(
            find_preset(QUICK_PROMPTS, "describe the scene"),
            Some("Describe the scene")
        );
        assert_eq!(find_preset(QUICK_PROMPTS, "2"), Some("List main objects"));
        assert_eq!(find_preset(QUICK_PROMPTS, "0"), None);
        assert_eq!(find_preset(COMPARISON_PROMPTS, "99"), None);
        assert_eq!(find_preset(QUICK_PROMPTS, "unknown"), None);
    }
}
