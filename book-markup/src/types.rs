use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;

/// What kind of heading produced a TOC entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocKind {
    Chapter,
    Appendix,
    Preface,
    Section,
}

impl TocKind {
    /// Chapters, appendices and the preface open a new page and sit at the
    /// top level of the outline.
    pub fn is_top_level(self) -> bool {
        !matches!(self, TocKind::Section)
    }
}

/// One table-of-contents entry, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Markdown heading depth (2 for chapters, 3 for sections).
    pub depth: u8,
    /// `"Chapter 3"`, `"Appendix B"`, or empty.
    pub number: String,
    pub title: String,
    /// Anchor shared by the TOC link and the in-body element id.
    pub slug: String,
    pub kind: TocKind,
}

impl TocEntry {
    /// Label used in the TOC page and the PDF outline.
    pub fn display_title(&self) -> String {
        if self.number.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.number, self.title)
        }
    }
}

/// Parse state accumulated over one top-to-bottom traversal.
///
/// Only heading handlers touch it, and only forward: numbers never decrease
/// and `in_front_matter` never flips back to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderState {
    pub chapter_number: u32,
    pub appendix_letter: Option<char>,
    pub in_front_matter: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            chapter_number: 0,
            appendix_letter: None,
            in_front_matter: true,
        }
    }
}

/// Kind of a serialized HTML unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    TitlePage,
    CopyrightPage,
    TocPage,
    /// Body content that precedes the first chapter-level heading.
    Preamble,
    Chapter,
    Appendix,
    Preface,
    AboutAuthor,
}

/// An immutable, already-serialized piece of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub html: String,
    /// TOC slugs whose target element lives inside this fragment.
    pub anchors: Vec<String>,
}

impl Fragment {
    pub fn new(kind: FragmentKind, html: impl Into<String>) -> Self {
        Self {
            kind,
            html: html.into(),
            anchors: Vec::new(),
        }
    }
}

/// Output of [`crate::render::render_body`].
#[derive(Debug, Clone)]
pub struct RenderedBody {
    /// Body split at every chapter-level page break, in order. The first
    /// element may be a [`FragmentKind::Preamble`].
    pub sections: Vec<Fragment>,
    pub toc: Vec<TocEntry>,
    pub state: RenderState,
    pub diagnostics: Vec<Diagnostic>,
}

impl RenderedBody {
    /// The flat body markup, sections concatenated.
    pub fn html(&self) -> String {
        self.sections.iter().map(|s| s.html.as_str()).collect()
    }

    pub fn chapter_count(&self) -> usize {
        self.toc.iter().filter(|e| e.kind == TocKind::Chapter).count()
    }
}

/// Book-level metadata shown on the front matter pages and written into the
/// PDF info dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookMeta {
    pub title: String,
    pub subtitle: String,
    pub tagline: String,
    pub author: String,
    pub author_role: String,
    pub edition: String,
    pub version: String,
    pub published: String,
    pub copyright_year: String,
    pub built_with: Option<String>,
    pub source_code: Option<String>,
    pub about_author: Vec<String>,
    /// Text of the running header on body pages; the title when unset.
    pub running_header: Option<String>,
}

impl Default for BookMeta {
    fn default() -> Self {
        Self {
            title: "Building Microservices Full-Stack".to_string(),
            subtitle: "From Zero to Production".to_string(),
            tagline: "A Practical Engineering Guide".to_string(),
            author: "Manazir Ali".to_string(),
            author_role: "Full-Stack Software Engineer".to_string(),
            edition: "First Edition".to_string(),
            version: "v1.0.0".to_string(),
            published: "February 2026".to_string(),
            copyright_year: "2026".to_string(),
            built_with: Some(
                "TypeScript, Express.js, Next.js 15, React 19, PostgreSQL, Prisma, Docker, Kubernetes"
                    .to_string(),
            ),
            source_code: Some("github.com/mnzralee/fullstack-grocery".to_string()),
            about_author: vec![
                "Manazir Ali is a full-stack software engineer who builds production financial \
                 blockchain systems. His work spans the entire stack: from React frontends to \
                 NestJS microservices, from PostgreSQL databases to Hyperledger Fabric smart \
                 contracts, and from Docker containers to Kubernetes clusters."
                    .to_string(),
                "The patterns in this book are drawn directly from his experience engineering a \
                 production financial protocol, where a single bug in a transfer function can \
                 mean real money disappearing. That kind of pressure teaches discipline, \
                 methodology, and deliberate engineering."
                    .to_string(),
                "He believes that every line of code is a chance to create, learn, and grow, and \
                 that little by little, we shape the future one line of code at a time."
                    .to_string(),
            ],
            running_header: None,
        }
    }
}

impl BookMeta {
    /// `"Title: Subtitle"`, or just the title when there is no subtitle.
    pub fn full_title(&self) -> String {
        if self.subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.subtitle)
        }
    }

    pub fn header_text(&self) -> &str {
        self.running_header.as_deref().unwrap_or(&self.title)
    }
}
