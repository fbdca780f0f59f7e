use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "d_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bearer token compared via constant-time hash comparison (§6.AMBIENT).
    /// `None` disables auth, which is only acceptable outside production.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "d_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: d_bind_addr(),
            request_timeout_secs: d_request_timeout_secs(),
            auth_token: None,
            cors_allowed_origins: Vec::new(),
            rate_limit_per_sec: d_rate_limit_per_sec(),
        }
    }
}

fn d_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn d_request_timeout_secs() -> u64 {
    120
}
fn d_rate_limit_per_sec() -> u32 {
    10
}
