use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "nanshan";
const ENV_PREFIX: &str = "NANSHAN";

/// Runtime settings: defaults, then `nanshan.toml`, then `NANSHAN_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub series_name: String,
    pub first_page: u32,
    pub last_page: u32,
    pub concurrency: usize,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub db_path: PathBuf,
    pub corpus_path: PathBuf,
    pub search_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://www.amrtf.org/zh-hant/nanshan-vinaya-transcripts1991-".into(),
            series_name: "南山律在家備覽略編".into(),
            first_page: 1,
            last_page: 160,
            concurrency: 2,
            request_delay_ms: 1000,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            db_path: PathBuf::from("data/nanshan.sqlite"),
            corpus_path: PathBuf::from("data/nanshan_data.json"),
            search_limit: 5,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}{:03}/", self.base_url, page)
    }

    /// `(page, url)` for every page in the inclusive range.
    pub fn page_range(&self, from: u32, to: u32) -> Vec<(u32, String)> {
        (from..=to).map(|p| (p, self.page_url(p))).collect()
    }
}
