use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// AI recommendation endpoint base URL
    #[serde(default = "default_ai_api_url")]
    pub ai_api_url: String,

    /// AI recommendation API key; when unset the AI tier is disabled and
    /// the engine goes straight to the algorithmic fallback
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// Upper bound on a single AI call, in seconds
    #[serde(default = "default_ai_timeout_secs")]
    pub ai_timeout_secs: u64,

    /// Reminder scheduler tick interval, in seconds
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    10
}

fn default_reminder_interval_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
