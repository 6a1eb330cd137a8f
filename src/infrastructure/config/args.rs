use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::app_config::LogLevel;
use crate::application::services::AnalysisMode;

#[derive(Debug, Parser)]
#[command(
    name = "clarity",
    version,
    about = "Ask questions about images using a vision-language model",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Also write logs to stderr.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Google API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Vision model name.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// API base URL.
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Longest image side after resizing.
    #[arg(long, value_name = "PX", global = true)]
    pub max_dimension: Option<u32>,

    /// JPEG quality of normalized images (1-100).
    #[arg(long, global = true)]
    pub jpeg_quality: Option<u8>,

    /// Number of responses cached in memory.
    #[arg(long, global = true)]
    pub cache_capacity: Option<usize>,

    /// Do not read or write persisted responses.
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Directory for persisted responses.
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Attempts per remote call, including the first.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Retry failed comparisons as well.
    #[arg(long, global = true)]
    pub retry_comparisons: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question about one image.
    Analyze {
        /// Image file.
        image: PathBuf,

        /// Question to ask.
        question: Option<String>,

        /// Preset question, by number or text. Repeatable.
        #[arg(short, long = "preset", value_name = "PRESET")]
        presets: Vec<String>,

        /// Analysis emphasis.
        #[arg(short, long, value_enum, default_value_t)]
        mode: AnalysisMode,
    },

    /// Ask a question comparing two images.
    Compare {
        /// First image file.
        image1: PathBuf,

        /// Second image file.
        image2: PathBuf,

        /// Question to ask.
        question: Option<String>,

        /// Preset comparison question, by number or text. Repeatable.
        #[arg(short, long = "preset", value_name = "PRESET")]
        presets: Vec<String>,
    },

    /// Ask successive questions about an image.
    Chat {
        /// Image file.
        image: PathBuf,

        /// Second image; questions become comparisons.
        #[arg(long, value_name = "IMAGE")]
        compare_with: Option<PathBuf>,

        /// Analysis emphasis for single-image questions.
        #[arg(short, long, value_enum, default_value_t)]
        mode: AnalysisMode,
    },

    /// List preset questions.
    Presets,

    /// Manage persisted responses.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CacheCommand {
    /// Delete every persisted response.
    Clear,
    /// Show where responses are persisted and how much space they use.
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let args = CliArgs::parse_from([
            "clarity",
            "analyze",
            "cat.png",
            "What breed?",
            "--preset",
            "1",
            "-p",
            "Analyze colors",
            "--mode",
            "object-detection",
        ]);

        match args.command {
            Command::Analyze {
                image,
                question,
                presets,
                mode,
            } => {
                assert_eq!(image, PathBuf::from("cat.png"));
                assert_eq!(question.as_deref(), Some("What breed?"));
                assert_eq!(presets, ["1", "Analyze colors"]);
                assert_eq!(mode, AnalysisMode::ObjectDetection);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_compare_defaults() {
        let args = CliArgs::parse_from(["clarity", "compare", "a.jpg", "b.jpg"]);

        assert!(matches!(
            args.command,
            Command::Compare { question: None, ref presets, .. } if presets.is_empty()
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["clarity", "cache", "clear", "--no-persist"]);

        assert!(args.no_persist);
        assert!(matches!(
            args.command,
            Command::Cache {
                action: CacheCommand::Clear
            }
        ));
    }
}
