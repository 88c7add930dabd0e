use crate::statics;
use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The `lb-db` session cookie, kept in a small file between runs.
///
/// Only used to tell whether someone logged in before; the server decides whether the
/// token is still good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    path: PathBuf,
}

impl SessionCookie {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(statics::CONFIG_DIR_NAME)
                .join(statics::CONFIG_SESSION_FILE)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {:?}", self.path))?;
        Ok(text.lines().find_map(cookie_value))
    }

    pub fn store(&self, token: &str) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
        }
        let line = format!("{}={token}\n", statics::SESSION_COOKIE_NAME);
        fs::write(&self.path, line).with_context(|| format!("writing {:?}", self.path))
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| format!("removing {:?}", self.path))?;
        }
        Ok(())
    }
}

/// Value of our cookie in a `Set-Cookie` header, e.g. `lb-db=abc; Path=/`.
pub fn parse_set_cookie(header: &str) -> Option<String> {
    header.split(';').next().and_then(cookie_value)
}

fn cookie_value(pair: &str) -> Option<String> {
    let (name, value) = pair.trim().split_once('=')?;
    (name.trim() == statics::SESSION_COOKIE_NAME)
        .then(|| value.trim().to_string())
        .filter(|v| !v.is_empty())
}
