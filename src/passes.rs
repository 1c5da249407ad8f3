//! Sequential rendering passes: front matter first, then each body batch.

use anyhow::{Context, Result};
use book_markup::assemble::{EMPTY_FOOTER, batch_html, front_matter_html, running_header};
use book_markup::layout::MAX_RENDER_HEIGHT_PX;
use book_markup::{BodyBatch, BookMeta, TocEntry};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::engine::{Capture, PdfEngine, PrintSettings};

/// One document to render.
#[derive(Debug, Clone)]
pub struct Pass {
    /// Human-readable name used in progress lines and errors.
    pub name: String,
    pub html: String,
    pub settings: PrintSettings,
    /// Body passes are measured against the engine's height ceiling.
    pub is_body: bool,
}

/// A rendered pass waiting to be merged.
#[derive(Debug, Clone)]
pub struct IntermediateDocument {
    pub pass: String,
    pub path: PathBuf,
}

/// Front matter pass followed by one pass per body batch, in order.
pub fn plan_passes(meta: &BookMeta, toc: &[TocEntry], batches: &[BodyBatch]) -> Vec<Pass> {
    let mut passes = Vec::with_capacity(batches.len() + 1);
    passes.push(Pass {
        name: "front matter".to_string(),
        html: front_matter_html(meta, toc),
        settings: PrintSettings::default(),
        is_body: false,
    });

    let body_settings = PrintSettings {
        header_template: Some(running_header(meta)),
        footer_template: Some(EMPTY_FOOTER.to_string()),
    };
    for batch in batches {
        passes.push(Pass {
            name: format!("body batch {}/{}", batch.index + 1, batches.len()),
            html: batch_html(meta, batch),
            settings: body_settings.clone(),
            is_body: true,
        });
    }
    passes
}

/// Removes the pass's HTML file when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Render every pass in order into `scratch`.
///
/// Stops at the first failure; the error names the pass. Each pass's HTML
/// is deleted once the pass is over, whether it succeeded or not.
pub fn run_passes(
    engine: &dyn PdfEngine,
    scratch: &Path,
    passes: &[Pass],
    quiet: bool,
) -> Result<Vec<IntermediateDocument>> {
    let mut rendered = Vec::with_capacity(passes.len());

    for (i, pass) in passes.iter().enumerate() {
        let number = i + 1;
        if !quiet {
            println!(
                "{} {}: {}",
                "Rendering".cyan().bold(),
                format!("pass {number}").bold(),
                pass.name
            );
        }

        let html_path = scratch.join(format!("pass-{number:02}.html"));
        std::fs::write(&html_path, &pass.html)
            .with_context(|| format!("Pass {} ({}): failed to write {}", number, pass.name, html_path.display()))?;
        let _html = ScratchFile(html_path.clone());

        let capture = engine
            .print(&html_path, &pass.settings)
            .with_context(|| format!("Pass {} ({}) failed", number, pass.name))?;

        if pass.is_body && !quiet {
            if let Some(height) = capture.scroll_height {
                println!("  {} {}px", "height:".dimmed(), height);
            }
        }
        for warning in capture_warnings(number, pass, &capture) {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }

        let pdf_path = scratch.join(format!("pass-{number:02}.pdf"));
        std::fs::write(&pdf_path, &capture.pdf)
            .with_context(|| format!("Pass {} ({}): failed to write {}", number, pass.name, pdf_path.display()))?;

        rendered.push(IntermediateDocument {
            pass: pass.name.clone(),
            path: pdf_path,
        });
    }

    Ok(rendered)
}

/// Problems with a capture that do not stop the build.
fn capture_warnings(number: usize, pass: &Pass, capture: &Capture) -> Vec<String> {
    let mut warnings = Vec::new();
    if !capture.fonts_ready {
        warnings.push(format!(
            "pass {} ({}): fonts not ready before timeout, printing anyway",
            number, pass.name
        ));
    }
    if pass.is_body {
        if let Some(height) = capture.scroll_height.filter(|h| *h > MAX_RENDER_HEIGHT_PX) {
            warnings.push(format!(
                "pass {} ({}) is {}px tall, above the ~{}px the engine renders reliably; output may be truncated",
                number, pass.name, height, MAX_RENDER_HEIGHT_PX
            ));
        }
    }
    warnings
}
