use serde::{Deserialize, Serialize};

/// Persistence layout (spec.md §6). The recognized SQL-compat fields
/// (`host`/`port`/`user`/`password`/`dbname`/`sslmode`/`connect_timeout`) are
/// accepted so existing deployment configs parse unchanged, but are unused —
/// the JSONL+in-memory store (§4.6) only consults `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub dbname: Option<String>,
    #[serde(default)]
    pub sslmode: Option<String>,
    #[serde(default)]
    pub connect_timeout: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: d_data_dir(),
            host: None,
            port: None,
            user: None,
            password: None,
            dbname: None,
            sslmode: None,
            connect_timeout: None,
        }
    }
}

fn d_data_dir() -> String {
    "./data/market-insight".to_string()
}
