//! Manuscript clean-up applied before rendering.
//!
//! The manuscript carries its own title block and a hand-written table of
//! contents; both are regenerated as front matter, so they are removed here
//! along with authoring comments.

use std::cmp::Reverse;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Leading `# Title` line, the blank lines after it and the blockquote
/// (author byline) that follows.
static TITLE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A# [^\n]*\n(?:[ \t]*\n)*(?:>[^\n]*\n)*").unwrap());

/// Any single-segment comment left after block comments are gone.
static INLINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--[^>]*-->").unwrap());

const INLINE_TOC_HEADING: &str = "## Table of Contents";
const SECTION_DIVIDER: &str = "\n---\n";

/// Preprocessed manuscript text plus the source line each of its lines came
/// from, so diagnostics can point back into the file the author edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    /// `source_lines[i]` is the 1-based manuscript line of output line `i + 1`.
    source_lines: Vec<usize>,
}

impl Preprocessed {
    fn new(text: String) -> Self {
        let count = text.matches('\n').count() + 1;
        Self {
            text,
            source_lines: (1..=count).collect(),
        }
    }

    /// Map a 1-based line of [`Preprocessed::text`] to its manuscript line.
    pub fn source_line(&self, line: usize) -> usize {
        line.checked_sub(1)
            .and_then(|i| self.source_lines.get(i))
            .copied()
            .unwrap_or(line)
    }

    /// Delete byte ranges of the text, keeping the line map in step.
    ///
    /// Ranges must not overlap. When a removal starts at the beginning of a
    /// line the line that survives is the one the removal ends on; otherwise
    /// it is the line the removal starts on.
    fn remove(&mut self, mut ranges: Vec<Range<usize>>) {
        ranges.sort_by_key(|r| Reverse(r.start));
        for range in ranges {
            let before = &self.text[..range.start];
            let line = before.matches('\n').count();
            let newlines = self.text[range.clone()].matches('\n').count();
            if newlines > 0 {
                let first = if before.is_empty() || before.ends_with('\n') {
                    line
                } else {
                    line + 1
                };
                self.source_lines.drain(first..first + newlines);
            }
            self.text.replace_range(range, "");
        }
    }
}

/// Strip the title block, comments and the inline TOC from `markdown`.
pub fn preprocess(markdown: &str) -> String {
    preprocess_with_lines(markdown).text
}

/// [`preprocess`], keeping track of where each remaining line came from.
pub fn preprocess_with_lines(markdown: &str) -> Preprocessed {
    let mut doc = Preprocessed::new(markdown.replace("\r\n", "\n"));

    if let Some(title) = TITLE_BLOCK_RE.find(&doc.text) {
        doc.remove(vec![title.range()]);
    }
    let blocks = block_comment_ranges(&doc.text);
    doc.remove(blocks);
    let inline = INLINE_COMMENT_RE
        .find_iter(&doc.text)
        .map(|m| m.range())
        .collect();
    doc.remove(inline);
    if let Some(toc) = inline_toc_range(&doc.text) {
        doc.remove(vec![toc]);
    }
    doc
}

/// Comments that open on one line and are closed by `-->` on a line of its
/// own. These may wrap diagram source that itself contains `-->` arrows.
/// An unterminated comment is left in place.
fn block_comment_ranges(markdown: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some(rel_open) = markdown[pos..].find("<!--") {
        let open = pos + rel_open;
        let after_open = open + 4;
        let line_end = markdown[after_open..]
            .find('\n')
            .map_or(markdown.len(), |i| after_open + i);
        if markdown[after_open..line_end].contains("-->") {
            // Closed on the same line; left for INLINE_COMMENT_RE.
            pos = line_end;
            continue;
        }
        let Some(close) = terminator_line_end(&markdown[line_end..]) else {
            break;
        };
        ranges.push(open..line_end + close);
        pos = line_end + close;
    }
    ranges
}

/// Offset just past the first line that is exactly `-->` (trailing blanks
/// allowed), excluding its newline.
fn terminator_line_end(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches('\n');
        if let Some(tail) = content.strip_prefix("-->") {
            if tail.trim().is_empty() {
                return Some(offset + content.len());
            }
        }
        offset += line.len();
    }
    None
}

/// `## Table of Contents` up to (not including) the next divider.
///
/// Without a following divider the section boundary is unknown and the text
/// is left untouched.
fn inline_toc_range(markdown: &str) -> Option<Range<usize>> {
    let start = markdown.find(INLINE_TOC_HEADING)?;
    let rel_end = markdown[start..].find(SECTION_DIVIDER)?;
    Some(start..start + rel_end)
}
