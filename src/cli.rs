//! Command-line interface definitions for wind_intel.
//!
//! All arguments can be provided via command-line flags; the LLM endpoint,
//! credential and model can also come from environment variables.

use clap::Parser;

/// Command-line arguments for wind_intel.
///
/// # Examples
///
/// ```sh
/// # Scan the default listing page
/// OPENAI_API_KEY=sk-... wind_intel
///
/// # Scan another site, analysing only the first 5 candidates
/// wind_intel --start-url https://fd.bjx.com.cn/ --limit 5 -o ./reports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing page to scan for articles
    #[arg(long, default_value = "https://www.woodmac.com/events/global/")]
    pub start_url: String,

    /// Directory that receives one timestamped folder per run
    #[arg(short, long, default_value = "wind_intelligence_data")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Analyse at most this many candidates (default: all)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of detail pages fetched and analysed at the same time
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Base URL of the OpenAI-compatible LLM API
    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.deepseek.com")]
    pub api_base: String,

    /// API key for the LLM service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name; overrides the config file
    #[arg(long, env = "OPENAI_MODEL")]
    pub model: Option<String>,
}
