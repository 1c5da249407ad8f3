//! Headless-browser PDF rendering.
//!
//! One Chrome instance is launched per run and reused for every pass; each
//! pass gets its own tab, closed when the pass ends however it ends.

use anyhow::{Context, Result, anyhow};
use book_markup::layout::{
    MARGIN_BOTTOM_IN, MARGIN_LEFT_IN, MARGIN_RIGHT_IN, MARGIN_TOP_IN, TRIM_HEIGHT_IN, TRIM_WIDTH_IN,
};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::ffi::OsStr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Characters escaped in the path component of a `file://` URL.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Header/footer configuration for one pass. Trim size and margins are
/// fixed for the whole book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintSettings {
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
}

impl PrintSettings {
    fn displays_header_footer(&self) -> bool {
        self.header_template.is_some() || self.footer_template.is_some()
    }
}

/// Result of printing one document.
#[derive(Debug, Clone)]
pub struct Capture {
    pub pdf: Vec<u8>,
    /// Laid-out document height in CSS pixels, if it could be measured.
    pub scroll_height: Option<u64>,
    /// `false` when the font-readiness wait timed out and printing went
    /// ahead anyway.
    pub fonts_ready: bool,
}

/// Something that turns an HTML file into PDF bytes.
pub trait PdfEngine {
    fn print(&self, html_path: &Path, settings: &PrintSettings) -> Result<Capture>;
}

/// Bounds on every wait a pass performs.
#[derive(Debug, Clone, Copy)]
pub struct EngineTimeouts {
    pub navigation: Duration,
    pub capture: Duration,
    pub fonts: Duration,
    pub settle: Duration,
}

impl EngineTimeouts {
    /// Longest a single pass can keep the browser busy.
    fn pass_ceiling(&self) -> Duration {
        self.navigation + self.fonts + self.settle + self.capture
    }
}

pub struct ChromeEngine {
    browser: Browser,
    timeouts: EngineTimeouts,
}

impl ChromeEngine {
    pub fn launch(chrome_path: Option<&Path>, timeouts: EngineTimeouts) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .path(chrome_path.map(Path::to_path_buf))
            .sandbox(false)
            .args(vec![OsStr::new("--disable-gpu")])
            .idle_browser_timeout(timeouts.pass_ceiling())
            .build()
            .map_err(|e| anyhow!("Invalid browser launch options: {}", e))?;

        let browser = Browser::new(options).with_context(|| match chrome_path {
            Some(path) => format!("Failed to launch Chrome at '{}'", path.display()),
            None => "Failed to launch Chrome (set chromePath in the config)".to_string(),
        })?;
        Ok(Self { browser, timeouts })
    }

    fn open_tab(&self) -> Result<TabGuard> {
        let tab = self.browser.new_tab().context("Failed to open browser tab")?;
        Ok(TabGuard(tab))
    }

    /// Resolve `document.fonts.ready`, giving up after the font timeout.
    ///
    /// This is a heuristic: a resolved promise means the fonts requested so
    /// far are loaded, not that layout has settled. The fixed settle delay
    /// that follows covers the rest, and on slow machines may not.
    fn wait_for_fonts(&self, tab: &Tab) -> Result<bool> {
        let script = format!(
            "Promise.race([document.fonts.ready.then(() => 'ready'), \
             new Promise(resolve => setTimeout(() => resolve('timeout'), {}))])",
            self.timeouts.fonts.as_millis()
        );
        let result = tab
            .evaluate(&script, true)
            .context("Failed waiting for fonts")?;
        Ok(result.value.as_ref().and_then(|v| v.as_str()) == Some("ready"))
    }

    fn scroll_height(tab: &Tab) -> Option<u64> {
        tab.evaluate("document.body.scrollHeight", false)
            .ok()?
            .value?
            .as_u64()
    }
}

impl PdfEngine for ChromeEngine {
    fn print(&self, html_path: &Path, settings: &PrintSettings) -> Result<Capture> {
        let tab = self.open_tab()?;
        let url = file_url(html_path)?;

        tab.set_default_timeout(self.timeouts.navigation);
        tab.navigate_to(&url)
            .and_then(|t| t.wait_until_navigated())
            .with_context(|| format!("Failed to load {}", url))?;

        let fonts_ready = self.wait_for_fonts(&tab)?;
        std::thread::sleep(self.timeouts.settle);
        let scroll_height = Self::scroll_height(&tab);

        tab.set_default_timeout(self.timeouts.capture);
        let display_header_footer = settings.displays_header_footer();
        let options = PrintToPdfOptions {
            display_header_footer: Some(display_header_footer),
            print_background: Some(true),
            paper_width: Some(TRIM_WIDTH_IN),
            paper_height: Some(TRIM_HEIGHT_IN),
            margin_top: Some(MARGIN_TOP_IN),
            margin_bottom: Some(MARGIN_BOTTOM_IN),
            margin_left: Some(MARGIN_LEFT_IN),
            margin_right: Some(MARGIN_RIGHT_IN),
            header_template: display_header_footer
                .then(|| settings.header_template.clone().unwrap_or_default()),
            footer_template: display_header_footer
                .then(|| settings.footer_template.clone().unwrap_or_default()),
            ..Default::default()
        };
        let pdf = tab
            .print_to_pdf(Some(options))
            .with_context(|| format!("Failed to print {}", html_path.display()))?;

        Ok(Capture {
            pdf,
            scroll_height,
            fonts_ready,
        })
    }
}

/// Closes its tab when dropped.
struct TabGuard(Arc<Tab>);

impl Deref for TabGuard {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.0
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        let _ = self.0.close(false);
    }
}

/// Absolute `file://` URL for a local path.
pub fn file_url(path: &Path) -> Result<String> {
    let absolute: PathBuf = std::path::absolute(path)
        .map_err(|e| anyhow!("Cannot resolve path '{}': {}", path.display(), e))?;
    let text = absolute.to_string_lossy().replace('\\', "/");
    let text = if text.starts_with('/') {
        text
    } else {
        format!("/{text}")
    };
    Ok(format!("file://{}", utf8_percent_encode(&text, PATH_ESCAPES)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(unix)]
    #[test]
    fn file_url_escapes_spaces_and_hashes() {
        let url = file_url(Path::new("/tmp/my book/#1.html")).unwrap();
        assert_eq!(url, "file:///tmp/my%20book/%231.html");
    }

    #[test]
    fn file_url_is_absolute() {
        let url = file_url(Path::new("pass.html")).unwrap();
        assert!(url.starts_with("file:///"), "got {url}");
        assert!(url.ends_with("/pass.html"));
    }

    #[test]
    fn header_footer_shown_only_when_templated() {
        assert!(!PrintSettings::default().displays_header_footer());
        let body = PrintSettings {
            header_template: Some("<div></div>".into()),
            footer_template: None,
        };
        assert!(body.displays_header_footer());
    }

    #[test]
    fn pass_ceiling_sums_every_wait() {
        let timeouts = EngineTimeouts {
            navigation: Duration::from_secs(120),
            capture: Duration::from_secs(300),
            fonts: Duration::from_secs(10),
            settle: Duration::from_millis(2000),
        };
        assert_eq!(timeouts.pass_ceiling(), Duration::from_secs(432));
    }
}
