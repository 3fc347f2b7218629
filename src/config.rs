use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REMOTE_TABLE: &str = "Test Table";

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Present only when both the remote URL and key are set.
    pub remote: Option<RemoteConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = non_empty("PORT")
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_dir = non_empty("APP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let remote = match (non_empty("QUEST_REMOTE_URL"), non_empty("QUEST_REMOTE_KEY")) {
            (Some(url), Some(api_key)) => Some(RemoteConfig {
                url,
                api_key,
                table: non_empty("QUEST_REMOTE_TABLE")
                    .unwrap_or_else(|| DEFAULT_REMOTE_TABLE.to_string()),
            }),
            _ => None,
        };

        Self {
            port,
            data_dir,
            remote,
        }
    }
}
