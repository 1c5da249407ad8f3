//! Splitting the body into render batches.
//!
//! A single very tall document is silently truncated by the rendering
//! engine, so the body is rendered in several passes of at most
//! [`SECTIONS_PER_BATCH`](crate::layout::SECTIONS_PER_BATCH) sections each.
//! Batches always break at chapter-level boundaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::MarkupError;
use crate::types::Fragment;

static LEADING_DIVIDERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A(?:\s*<hr class="section-divider"\s*/?>\s*)+"#).unwrap()
});

/// One body rendering pass worth of sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyBatch {
    /// Zero-based batch number.
    pub index: usize,
    pub sections: Vec<Fragment>,
    /// About-the-author block; only ever set on the final batch.
    pub about: Option<Fragment>,
}

impl BodyBatch {
    /// Concatenated markup of every section, then the about-author block.
    pub fn html(&self) -> String {
        self.fragments().map(|f| f.html.as_str()).collect()
    }

    /// Every TOC anchor whose target is rendered in this batch.
    pub fn anchors(&self) -> impl Iterator<Item = &str> {
        self.fragments()
            .flat_map(|f| f.anchors.iter().map(String::as_str))
    }

    fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.sections.iter().chain(self.about.as_ref())
    }
}

/// Remove section dividers at the very start of `html`; they would render as
/// a blank leading page.
pub fn strip_leading_dividers(html: &str) -> &str {
    match LEADING_DIVIDERS_RE.find(html) {
        Some(m) => &html[m.end()..],
        None => html,
    }
}

/// Group `sections` into batches of at most `per_batch`, in order.
///
/// Leading dividers are stripped from the first section, which is dropped if
/// nothing else remains in it. `about` is attached to the last batch. With no
/// sections at all there is nothing to attach it to and no batch is produced.
pub fn batch_sections(
    mut sections: Vec<Fragment>,
    per_batch: usize,
    about: Option<Fragment>,
) -> Result<Vec<BodyBatch>, MarkupError> {
    if per_batch == 0 {
        return Err(MarkupError::ZeroBatchSize);
    }

    if let Some(first) = sections.first_mut() {
        let stripped = strip_leading_dividers(&first.html);
        if stripped.len() != first.html.len() {
            first.html = stripped.to_string();
        }
        if first.html.trim().is_empty() && first.anchors.is_empty() {
            sections.remove(0);
        }
    }

    let mut batches: Vec<BodyBatch> = Vec::with_capacity(sections.len().div_ceil(per_batch));
    let mut iter = sections.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<Fragment> = iter.by_ref().take(per_batch).collect();
        batches.push(BodyBatch {
            index: batches.len(),
            sections: chunk,
            about: None,
        });
    }
    if let Some(last) = batches.last_mut() {
        last.about = about;
    }
    Ok(batches)
}
