use anyhow::{Context, Result, bail};
use book_markup::BookMeta;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level book.json schema.
///
/// Every field is optional; relative paths are resolved against the
/// directory holding the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookConfig {
    #[serde(default = "default_manuscript")]
    pub manuscript: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Chrome/Chromium binary; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default)]
    pub book: BookMeta,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    #[serde(default = "default_font_timeout_secs")]
    pub font_timeout_secs: u64,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_manuscript() -> PathBuf {
    PathBuf::from("manuscript.md")
}
fn default_output() -> PathBuf {
    PathBuf::from("book.pdf")
}
fn default_navigation_timeout_secs() -> u64 {
    120
}
fn default_capture_timeout_secs() -> u64 {
    300
}
fn default_font_timeout_secs() -> u64 {
    10
}
fn default_settle_delay_ms() -> u64 {
    2000
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            manuscript: default_manuscript(),
            output: default_output(),
            chrome_path: None,
            book: BookMeta::default(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            capture_timeout_secs: default_capture_timeout_secs(),
            font_timeout_secs: default_font_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl BookConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn font_timeout(&self) -> Duration {
        Duration::from_secs(self.font_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.navigation_timeout_secs == 0 {
            bail!("navigationTimeoutSecs must be greater than zero");
        }
        if self.capture_timeout_secs == 0 {
            bail!("captureTimeoutSecs must be greater than zero");
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.manuscript = base.join(&self.manuscript);
        self.output = base.join(&self.output);
        if let Some(chrome) = &self.chrome_path {
            self.chrome_path = Some(base.join(chrome));
        }
    }
}

/// Load config from `path`, or return defaults if the file is missing.
pub fn load_config(path: &Path) -> Result<BookConfig> {
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<BookConfig>(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        BookConfig::default()
    };

    config.validate()?;
    config.resolve_paths(base);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "manuscript": "drafts/book-v2.md",
            "output": "dist/book.pdf",
            "chromePath": "/usr/bin/google-chrome",
            "book": {
                "title": "Rust in Print",
                "subtitle": "Typesetting with Cargo",
                "author": "Ada Example",
                "authorRole": "Engineer",
                "aboutAuthor": ["Ada Example writes."],
                "runningHeader": "Rust in Print"
            },
            "navigationTimeoutSecs": 60,
            "captureTimeoutSecs": 600,
            "fontTimeoutSecs": 5,
            "settleDelayMs": 500
        }"#;

        let config: BookConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.manuscript, PathBuf::from("drafts/book-v2.md"));
        assert_eq!(config.chrome_path.as_deref(), Some(Path::new("/usr/bin/google-chrome")));
        assert_eq!(config.book.full_title(), "Rust in Print: Typesetting with Cargo");
        assert_eq!(config.book.author_role, "Engineer");
        assert_eq!(config.book.about_author.len(), 1);
        // Unset meta fields keep their defaults
        assert_eq!(config.book.edition, "First Edition");
        assert_eq!(config.navigation_timeout(), Duration::from_secs(60));
        assert_eq!(config.capture_timeout(), Duration::from_secs(600));
        assert_eq!(config.font_timeout(), Duration::from_secs(5));
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_defaults() {
        let config: BookConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.manuscript, PathBuf::from("manuscript.md"));
        assert_eq!(config.output, PathBuf::from("book.pdf"));
        assert_eq!(config.chrome_path, None);
        assert_eq!(config.navigation_timeout_secs, 120);
        assert_eq!(config.capture_timeout_secs, 300);
        assert_eq!(config.settle_delay_ms, 2000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("book.json")).unwrap();
        assert_eq!(config.manuscript, dir.path().join("manuscript.md"));
        assert_eq!(config.output, dir.path().join("book.pdf"));
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, r#"{ "manuscript": "src/book.md", "output": "/tmp/out.pdf" }"#)
            .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.manuscript, dir.path().join("src/book.md"));
        assert_eq!(config.output, PathBuf::from("/tmp/out.pdf"));
    }

    #[test]
    fn test_zero_capture_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, r#"{ "captureTimeoutSecs": 0 }"#).unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("captureTimeoutSecs"));
    }

    #[test]
    fn test_malformed_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("book.json"));
    }
}
