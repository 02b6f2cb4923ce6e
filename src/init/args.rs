use crate::watcher::WatchMode;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args, Clone)]
pub struct AgentRun {
    /// Files to tail, separated by commas
    #[arg(
        long,
        env = "TAILGRAM_FILE",
        value_delimiter = ',',
        required = true
    )]
    pub file: Vec<PathBuf>,

    /// Keywords to watch for, separated by commas (case-sensitive)
    #[arg(
        long,
        env = "TAILGRAM_KEYWORD",
        value_delimiter = ',',
        required = true
    )]
    pub keyword: Vec<String>,

    /// Number of words of a matching line to include in the message
    #[arg(long, env = "TAILGRAM_WORDS", required = true)]
    pub words: usize,

    /// Telegram bot token
    #[arg(long, env = "TAILGRAM_BOT_TOKEN", required = true)]
    pub bot_token: String,

    /// Telegram chat ids to deliver alerts to, separated by commas
    #[arg(
        long,
        env = "TAILGRAM_CHAT_ID",
        value_delimiter = ',',
        required = true
    )]
    pub chat_id: Vec<String>,

    /// Telegram API endpoint
    #[arg(
        long,
        env = "TAILGRAM_API_ENDPOINT",
        default_value = "https://api.telegram.org"
    )]
    pub api_endpoint: String,

    /// File watch mode
    #[arg(long, env = "TAILGRAM_WATCH_MODE", default_value = "auto")]
    pub watch_mode: WatchMode,

    /// Log every detection and delivery attempt
    #[arg(long, env = "TAILGRAM_DEBUG", default_value = "false")]
    pub debug: bool,
}
