//! `book-markup` turns a markdown manuscript into print-ready book HTML.
//!
//! The manuscript is cleaned up ([`preprocess`]), rendered into chapter-level
//! sections with an extracted table of contents ([`render_body`]), grouped
//! into render batches ([`batch_sections`]) and wrapped into standalone
//! documents ([`assemble`]). Nothing here touches the filesystem or a
//! browser; turning the documents into PDF is the caller's job.
//!
//! # Quick start
//!
//! ```
//! let body = book_markup::render_manuscript("# My Book\n\n## Chapter 1: Intro\n\nHello.\n");
//! assert_eq!(body.toc.len(), 1);
//! assert_eq!(body.toc[0].slug, "chapter-1-intro");
//! assert_eq!(body.sections.len(), 1);
//! ```

pub mod assemble;
pub mod error;
pub mod highlight;
pub mod layout;
pub mod preprocess;
pub mod render;
pub mod slug;
pub mod split;
pub mod style;
pub mod types;

pub use error::*;
pub use preprocess::{Preprocessed, preprocess, preprocess_with_lines};
pub use render::render_body;
pub use slug::slugify;
pub use split::{BodyBatch, batch_sections};
pub use types::*;

/// Preprocess and render a raw manuscript in one step.
///
/// Diagnostic line numbers refer to the raw manuscript, not the
/// preprocessed text.
pub fn render_manuscript(markdown: &str) -> RenderedBody {
    let source = preprocess_with_lines(markdown);
    let mut body = render_body(&source.text);
    for diag in &mut body.diagnostics {
        diag.line = diag.line.map(|line| source.source_line(line));
    }
    body
}

/// Escape HTML special characters.
pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
