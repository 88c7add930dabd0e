use crate::session::SessionCookie;
use crate::statics;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Where the control data API lives and how the editor talks to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Overrides the default session cookie location.
    pub session_file: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_url: statics::CONFIG_DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: statics::CONFIG_DEFAULT_TIMEOUT_SECS,
            session_file: None,
        }
    }
}

impl EditorConfig {
    /// Read a JSON config file. A missing file means defaults.
    /// `BRIDGE_EDITOR_URL` overrides the base URL either way.
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let text =
                std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
            serde_json::from_str::<EditorConfig>(&text)
                .with_context(|| format!("parsing {path:?}"))?
        } else {
            log::info!("Config file not found at {}, using defaults", path.display());
            EditorConfig::default()
        };
        Ok(config.with_base_url_override(std::env::var(statics::ENV_BASE_URL).ok()))
    }

    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn session_cookie(&self) -> Option<SessionCookie> {
        self.session_file
            .clone()
            .or_else(SessionCookie::default_path)
            .map(SessionCookie::new)
    }
}
