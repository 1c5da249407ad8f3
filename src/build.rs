//! `bookgen build`: manuscript to finished PDF.
//!
//! Render the manuscript, split the body into batches, print every pass
//! through the engine, then merge the passes into the output file. With
//! `--watch` the build reruns whenever the manuscript's content changes.

use anyhow::{Context, Result};
use book_markup::assemble::about_author;
use book_markup::layout::SECTIONS_PER_BATCH;
use book_markup::{Diagnostic, Severity, batch_sections};
use colored::Colorize;
use notify::{EventKind, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::config::BookConfig;
use crate::engine::{ChromeEngine, EngineTimeouts, PdfEngine};
use crate::merge::{MergeSummary, merge_book};
use crate::passes::{plan_passes, run_passes};

/// Outcome of one successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub output: PathBuf,
    pub merge: MergeSummary,
}

impl BuildReport {
    pub fn print_summary(&self) {
        println!(
            "{} {} ({:.2} MB, {} pages: {} front + {} body)",
            "Built".green().bold(),
            self.output.display(),
            self.merge.bytes as f64 / (1024.0 * 1024.0),
            self.merge.total_pages(),
            self.merge.front_pages,
            self.merge.body_pages,
        );
        println!(
            "  {} {} bookmarks, {} link targets",
            "outline:".dimmed(),
            self.merge.outline_entries,
            self.merge.destinations,
        );
    }
}

/// Build the book with a freshly launched Chrome.
pub fn handle_build(config: &BookConfig, quiet: bool) -> Result<BuildReport> {
    let timeouts = EngineTimeouts {
        navigation: config.navigation_timeout(),
        capture: config.capture_timeout(),
        fonts: config.font_timeout(),
        settle: config.settle_delay(),
    };
    // Fail on a missing manuscript before paying for a browser launch.
    read_manuscript(&config.manuscript)?;
    if !quiet {
        println!("{} headless Chrome", "Launching".cyan().bold());
    }
    let engine = ChromeEngine::launch(config.chrome_path.as_deref(), timeouts)?;
    build_with_engine(config, &engine, quiet)
}

/// The build pipeline against any engine.
///
/// Intermediates live in a per-run scratch directory that is removed on
/// every exit path; the output file is only replaced once the merge has
/// fully succeeded.
pub fn build_with_engine(
    config: &BookConfig,
    engine: &dyn PdfEngine,
    quiet: bool,
) -> Result<BuildReport> {
    let manuscript = read_manuscript(&config.manuscript)?;
    let body = book_markup::render_manuscript(&manuscript);
    print_diagnostics(&config.manuscript, &body.diagnostics);

    if !quiet {
        println!(
            "{} {} ({} chapters, {} TOC entries)",
            "Rendered".green().bold(),
            config.manuscript.display(),
            body.chapter_count(),
            body.toc.len(),
        );
    }

    let about = about_author(&config.book);
    let batches = batch_sections(body.sections.clone(), SECTIONS_PER_BATCH, about)?;
    if batches.is_empty() {
        eprintln!(
            "{} {}: no body content, the book will contain front matter only",
            "warning:".yellow().bold(),
            config.manuscript.display()
        );
    } else if !quiet {
        println!(
            "  {} {} sections in {} batches",
            "split:".dimmed(),
            batches.iter().map(|b| b.sections.len()).sum::<usize>(),
            batches.len()
        );
    }

    let passes = plan_passes(&config.book, &body.toc, &batches);

    let scratch = tempfile::Builder::new()
        .prefix("bookgen-")
        .tempdir()
        .context("Failed to create scratch directory")?;
    let documents = run_passes(engine, scratch.path(), &passes, quiet)?;

    let (front, bodies) = documents
        .split_first()
        .context("Front matter pass produced no document")?;
    let body_paths: Vec<PathBuf> = bodies.iter().map(|d| d.path.clone()).collect();

    if !quiet {
        println!(
            "{} {} documents: {}",
            "Merging".cyan().bold(),
            documents.len(),
            documents
                .iter()
                .map(|d| d.pass.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    let merge = merge_book(
        &front.path,
        &body_paths,
        &config.book,
        &body.toc,
        chrono::Utc::now(),
        &config.output,
    )?;

    for document in &documents {
        std::fs::remove_file(&document.path)
            .with_context(|| {
                format!(
                    "Failed to remove {} intermediate {}",
                    document.pass,
                    document.path.display()
                )
            })?;
    }
    scratch
        .close()
        .context("Failed to remove scratch directory")?;

    Ok(BuildReport {
        output: config.output.clone(),
        merge,
    })
}

fn read_manuscript(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read manuscript '{}': {}", path.display(), e))
}

/// Print content diagnostics to stderr as `file:line: severity: [code] message`.
pub fn print_diagnostics(file: &Path, diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let severity = match diag.severity {
            Severity::Warning => format!("{}", "warning".yellow().bold()),
            Severity::Info => format!("{}", "info".cyan().bold()),
        };
        let line_info = match diag.line {
            Some(line) => format!("{}:{}", file.display(), line),
            None => file.display().to_string(),
        };
        let code = match &diag.code {
            Some(c) => format!("[{}] ", c),
            None => String::new(),
        };
        eprintln!("{line_info}: {severity}: {code}{}", diag.message);
    }
}

/// SHA-256 of the manuscript text.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build once, then watch the manuscript and rebuild on each save.
///
/// Debounces rapid events (e.g. editors that write in stages) with a 200ms
/// window, and skips rebuilds when the content hash has not changed since
/// the last successful build. Ctrl+C exits.
pub fn watch_and_rebuild(config: &BookConfig, quiet: bool) -> Result<()> {
    let file_path = std::fs::canonicalize(&config.manuscript).map_err(|e| {
        anyhow::anyhow!("Cannot resolve path '{}': {}", config.manuscript.display(), e)
    })?;
    let watch_dir = file_path.parent().ok_or_else(|| {
        anyhow::anyhow!(
            "Cannot determine parent directory of '{}'",
            config.manuscript.display()
        )
    })?;

    let mut last_hash = None;
    rebuild(config, quiet, &mut last_hash);

    println!(
        "{} {} for changes (Ctrl+C to stop)",
        "Watching".cyan().bold(),
        config.manuscript.display()
    );

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let mut last_rebuild = Instant::now();
    let debounce = Duration::from_millis(200);

    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => {
                let is_write = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
                let affects_manuscript = event
                    .paths
                    .iter()
                    .any(|p| p.canonicalize().ok().as_ref() == Some(&file_path));

                if is_write && affects_manuscript && last_rebuild.elapsed() > debounce {
                    // Let the editor finish writing
                    std::thread::sleep(Duration::from_millis(50));
                    rebuild(config, quiet, &mut last_hash);
                    last_rebuild = Instant::now();
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// One watch-mode build. Errors are reported, never propagated, so the
/// watcher keeps running.
fn rebuild(config: &BookConfig, quiet: bool, last_hash: &mut Option<String>) {
    let hash = match read_manuscript(&config.manuscript) {
        Ok(content) => content_hash(&content),
        Err(e) => {
            eprintln!("{} {}", "Build error:".red().bold(), e);
            return;
        }
    };
    if last_hash.as_deref() == Some(hash.as_str()) {
        if !quiet {
            println!("  {} manuscript unchanged", "skip:".dimmed());
        }
        return;
    }

    match handle_build(config, quiet) {
        Ok(report) => {
            *last_hash = Some(hash);
            if !quiet {
                report.print_summary();
            }
        }
        Err(e) => eprintln!("{} {:#}", "Build error:".red().bold(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Capture, PrintSettings};
    use lopdf::{Document, Object, Stream, dictionary};
    use std::cell::Cell;

    /// Prints every pass as a two-page PDF.
    struct FakeEngine {
        passes: Cell<usize>,
        fail: bool,
    }

    impl PdfEngine for FakeEngine {
        fn print(&self, _html_path: &Path, _settings: &PrintSettings) -> Result<Capture> {
            self.passes.set(self.passes.get() + 1);
            if self.fail {
                anyhow::bail!("browser crashed");
            }
            Ok(Capture {
                pdf: two_page_pdf(),
                scroll_height: Some(1000),
                fonts_ready: true,
            })
        }
    }

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..2 {
            let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 504.into(), 720.into()],
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save");
        bytes
    }

    fn config_in(dir: &Path, chapters: usize) -> BookConfig {
        let manuscript: String = (1..=chapters)
            .map(|n| format!("## Chapter {n}: Part {n}\n\nText.\n\n"))
            .collect();
        let path = dir.join("manuscript.md");
        std::fs::write(&path, manuscript).unwrap();
        BookConfig {
            manuscript: path,
            output: dir.join("out/book.pdf"),
            ..BookConfig::default()
        }
    }

    #[test]
    fn builds_front_plus_batches() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 7);
        let engine = FakeEngine {
            passes: Cell::new(0),
            fail: false,
        };

        let report = build_with_engine(&config, &engine, true).unwrap();

        // 7 chapters → 2 body batches, plus the front matter pass.
        assert_eq!(engine.passes.get(), 3);
        assert_eq!(report.merge.front_pages, 2);
        assert_eq!(report.merge.body_pages, 4);
        assert!(config.output.exists());
    }

    #[test]
    fn failed_pass_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 2);
        let engine = FakeEngine {
            passes: Cell::new(0),
            fail: true,
        };

        let err = build_with_engine(&config, &engine, true).unwrap_err();
        assert!(format!("{err:#}").contains("Pass 1 (front matter) failed"));
        assert_eq!(engine.passes.get(), 1);
        assert!(!config.output.exists());
    }

    #[test]
    fn missing_manuscript_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BookConfig {
            manuscript: dir.path().join("nope.md"),
            output: dir.path().join("book.pdf"),
            ..BookConfig::default()
        };
        let engine = FakeEngine {
            passes: Cell::new(0),
            fail: false,
        };

        let err = build_with_engine(&config, &engine, true).unwrap_err();
        assert!(err.to_string().contains("Failed to read manuscript"));
        assert_eq!(engine.passes.get(), 0);
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("").len(), 64);
    }
}
