//! End-to-end tests that run the fixture manuscript through every stage.

use book_markup::assemble::{batch_html, front_matter_html, full_html};
use book_markup::layout::SECTIONS_PER_BATCH;
use book_markup::{BookMeta, FragmentKind, Severity, TocKind, batch_sections};

fn read_fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture '{}': {}", path.display(), e))
}

#[test]
fn fixture_toc_follows_document_order() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));

    let titles: Vec<String> = body.toc.iter().map(|e| e.display_title()).collect();
    assert_eq!(
        titles,
        vec![
            "Preface",
            "Chapter 1: Foundations",
            "Project Layout",
            "Architecture",
            "Chapter 2: Storage",
            "Summary",
            "Appendix A: Tooling",
            "Summary",
        ]
    );
    assert_eq!(body.chapter_count(), 2);
    assert_eq!(body.toc[6].kind, TocKind::Appendix);
    assert_eq!(body.toc[7].slug, "summary-1");
}

#[test]
fn fixture_strips_authoring_artifacts() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));
    let html = body.html();

    assert!(!html.contains("Shipping Services in Rust"), "title block should be stripped");
    assert!(!html.contains("Table of Contents"), "inline TOC should be stripped");
    assert!(!html.contains("TODO"), "comments should be stripped");
    assert!(!html.contains("flowchart"), "block comments should be stripped");
}

#[test]
fn fixture_renders_styled_blocks() {
    let html = book_markup::render_manuscript(&read_fixture("manuscript.md")).html();

    assert!(html.contains("<code class=\"inline-code\">main</code>"));
    assert!(html.contains("<span class=\"code-lang\">rust</span>"));
    assert!(html.contains("<div class=\"diagram\">"));
    assert!(html.contains("class=\"task-item\""));
    assert!(html.contains("<blockquote class=\"styled-quote\">"));
    assert!(html.contains("<th style=\"text-align:center\">Durable</th>"));
    assert!(html.contains("<hr class=\"section-divider\" />"));
}

#[test]
fn fixture_produces_one_batch_with_about_page() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));
    let meta = BookMeta::default();

    let kinds: Vec<FragmentKind> = body.sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FragmentKind::Preamble,
            FragmentKind::Preface,
            FragmentKind::Chapter,
            FragmentKind::Chapter,
            FragmentKind::Appendix,
        ]
    );

    let about = book_markup::assemble::about_author(&meta);
    let batches = batch_sections(body.sections.clone(), SECTIONS_PER_BATCH, about).unwrap();
    assert_eq!(batches.len(), 1, "the divider-only preamble should be dropped");
    assert_eq!(batches[0].sections.len(), 4);
    assert!(batches[0].about.is_some());

    let html = batch_html(&meta, &batches[0]);
    for entry in &body.toc {
        assert!(
            html.contains(&format!("id=\"{}\"", entry.slug)),
            "missing target for {}",
            entry.slug
        );
        assert!(html.contains(&format!("<a href=\"#{}\">", entry.slug)));
    }
    assert!(html.contains("About the Author"));
}

#[test]
fn fixture_front_matter_links_every_entry() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));
    let html = front_matter_html(&BookMeta::default(), &body.toc);

    assert!(html.contains("class=\"title-page\""));
    assert!(html.contains("class=\"copyright-page\""));
    assert!(html.contains("<a href=\"#chapter-2-storage\">Chapter 2: Storage</a>"));
    assert!(html.contains("<a href=\"#appendix-a-tooling\">Appendix A: Tooling</a>"));
    assert!(!html.contains("book-body"));
}

#[test]
fn fixture_preview_contains_everything() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));
    let html = full_html(&BookMeta::default(), &body);

    assert!(html.contains("class=\"toc-page\""));
    assert!(html.contains("chapter-1-foundations"));
    assert!(html.contains("About the Author"));
}

#[test]
fn fixture_reports_duplicate_anchor() {
    let body = book_markup::render_manuscript(&read_fixture("manuscript.md"));
    let warnings: Vec<_> = body
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1, "Unexpected diagnostics: {warnings:?}");
    assert!(warnings[0].message.contains("summary-1"));
}

#[test]
fn fixture_diagnostic_lines_point_into_raw_manuscript() {
    let source = read_fixture("manuscript.md");
    let body = book_markup::render_manuscript(&source);
    let dup = body
        .diagnostics
        .iter()
        .find(|d| d.code.as_deref() == Some("W001"))
        .expect("duplicate anchor warning");

    let line = dup.line.expect("warning carries a line");
    let summaries: Vec<usize> = source
        .lines()
        .enumerate()
        .filter(|(_, l)| *l == "### Summary")
        .map(|(i, _)| i + 1)
        .collect();
    assert_eq!(summaries.len(), 2);
    assert_eq!(line, summaries[1]);
}
