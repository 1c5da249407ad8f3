//! Semantic renderer: markdown → book HTML.
//!
//! Markdown is parsed with `pulldown-cmark`; headings, code fences, tables,
//! task items, blockquotes, rules and inline code are intercepted and
//! replaced with styled HTML, everything else goes through the stock HTML
//! writer. Chapter-level headings close the current section, so the body
//! comes out already split at every page break.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::error::Diagnostic;
use crate::escape_html;
use crate::highlight::{highlight, is_ascii_diagram, render_diagram};
use crate::layout::LONG_CODE_LINES;
use crate::slug::{SlugRegistry, slugify};
use crate::types::{Fragment, FragmentKind, RenderState, RenderedBody, TocEntry, TocKind};

static CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Chapter\s+(\d+):\s*(.+)$").unwrap());
static APPENDIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Appendix\s+([A-Z]):\s*(.+)$").unwrap());
static PREFACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^Preface$").unwrap());

/// How a heading is treated, decided from its depth and plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingClass {
    Chapter { number: u32, title: String },
    Appendix { letter: char, title: String },
    Preface,
    Plain,
}

/// Classify a heading. Only depth-2 headings can open a chapter, appendix or
/// preface; the checks run in that order.
pub fn classify_heading(depth: u8, text: &str) -> HeadingClass {
    if depth != 2 {
        return HeadingClass::Plain;
    }
    let text = text.trim();
    if let Some(caps) = CHAPTER_RE.captures(text) {
        if let Ok(number) = caps[1].parse::<u32>() {
            return HeadingClass::Chapter {
                number,
                title: caps[2].trim().to_string(),
            };
        }
    }
    if let Some(caps) = APPENDIX_RE.captures(text) {
        if let Some(letter) = caps[1].chars().next() {
            return HeadingClass::Appendix {
                letter: letter.to_ascii_uppercase(),
                title: caps[2].trim().to_string(),
            };
        }
    }
    if PREFACE_RE.is_match(text) {
        return HeadingClass::Preface;
    }
    HeadingClass::Plain
}

/// Render the (preprocessed) manuscript body.
///
/// This never fails: constructs that cannot be rendered as intended are
/// downgraded and reported in [`RenderedBody::diagnostics`].
pub fn render_body(markdown: &str) -> RenderedBody {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let events: Vec<(Event<'_>, Range<usize>)> =
        Parser::new_ext(markdown, options).into_offset_iter().collect();

    let mut renderer = Renderer::new(markdown);
    renderer.run(&events);
    renderer.finish()
}

type Spanned<'a> = (Event<'a>, Range<usize>);

struct Renderer<'a> {
    line_starts: Vec<usize>,
    state: RenderState,
    toc: Vec<TocEntry>,
    diagnostics: Vec<Diagnostic>,
    slugs: SlugRegistry,
    sections: Vec<Fragment>,
    current: Fragment,
    pending: Vec<Event<'a>>,
}

impl<'a> Renderer<'a> {
    fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            line_starts,
            state: RenderState::default(),
            toc: Vec::new(),
            diagnostics: Vec::new(),
            slugs: SlugRegistry::new(),
            sections: Vec::new(),
            current: Fragment::new(FragmentKind::Preamble, String::new()),
            pending: Vec::new(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    fn run(&mut self, events: &[Spanned<'a>]) {
        let mut i = 0;
        while i < events.len() {
            let (event, range) = &events[i];
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let end = find_end(events, i, |e| matches!(e, TagEnd::Heading(_)));
                    self.heading(*level, &events[i + 1..end], self.line_of(range.start));
                    i = end + 1;
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let end = find_end(events, i, |e| matches!(e, TagEnd::CodeBlock));
                    let code: String = events[i + 1..end]
                        .iter()
                        .filter_map(|(e, _)| match e {
                            Event::Text(t) => Some(t.as_ref()),
                            _ => None,
                        })
                        .collect();
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(info),
                        CodeBlockKind::Indented => None,
                    };
                    self.code_block(lang, &code, self.line_of(range.start));
                    i = end + 1;
                }
                Event::Start(Tag::Table(alignments)) => {
                    let end = find_end(events, i, |e| matches!(e, TagEnd::Table));
                    self.table(alignments, &events[i + 1..end]);
                    i = end + 1;
                }
                Event::Start(Tag::BlockQuote(_)) => {
                    self.pending
                        .push(Event::Html("<blockquote class=\"styled-quote\">\n".into()));
                    i += 1;
                }
                Event::End(TagEnd::BlockQuote { .. }) => {
                    self.pending.push(Event::Html("</blockquote>\n".into()));
                    i += 1;
                }
                Event::Start(Tag::Item) => {
                    i = self.list_item(events, i);
                }
                Event::Rule => {
                    self.pending
                        .push(Event::Html("<hr class=\"section-divider\" />\n".into()));
                    i += 1;
                }
                Event::Code(text) => {
                    self.pending.push(inline_code(text));
                    i += 1;
                }
                other => {
                    self.pending.push(other.clone());
                    i += 1;
                }
            }
        }
    }

    /// Emit the opening of a list item, consuming a task marker if present.
    /// Returns the index of the next unprocessed event.
    fn list_item(&mut self, events: &[Spanned<'a>], i: usize) -> usize {
        let marker_at = |idx: usize| match events.get(idx) {
            Some((Event::TaskListMarker(checked), _)) => Some(*checked),
            _ => None,
        };
        let loose = matches!(events.get(i + 1), Some((Event::Start(Tag::Paragraph), _)));

        if let Some(checked) = marker_at(i + 1) {
            self.pending.push(task_item_open(checked));
            i + 2
        } else if let (true, Some(checked)) = (loose, marker_at(i + 2)) {
            self.pending.push(task_item_open(checked));
            self.pending.push(Event::Start(Tag::Paragraph));
            i + 3
        } else {
            self.pending.push(Event::Start(Tag::Item));
            i + 1
        }
    }

    fn heading(&mut self, level: HeadingLevel, inner: &[Spanned<'a>], line: usize) {
        let depth = level as u8;
        let raw = plain_text(inner);

        match classify_heading(depth, &raw) {
            HeadingClass::Chapter { number, title } => {
                if number < self.state.chapter_number {
                    self.diagnostics.push(Diagnostic::warning(
                        "W002",
                        format!(
                            "Chapter {number} follows Chapter {}; numbering is not increasing",
                            self.state.chapter_number
                        ),
                        Some(line),
                    ));
                }
                self.state.chapter_number = self.state.chapter_number.max(number);
                self.state.in_front_matter = false;
                let label = format!("Chapter {number}");
                self.open_section(FragmentKind::Chapter, TocKind::Chapter, &raw, label, title, line);
            }
            HeadingClass::Appendix { letter, title } => {
                if let Some(prev) = self.state.appendix_letter.filter(|p| letter < *p) {
                    self.diagnostics.push(Diagnostic::warning(
                        "W003",
                        format!("Appendix {letter} follows Appendix {prev}; lettering is not increasing"),
                        Some(line),
                    ));
                }
                self.state.appendix_letter = self.state.appendix_letter.max(Some(letter));
                let label = format!("Appendix {letter}");
                self.open_section(FragmentKind::Appendix, TocKind::Appendix, &raw, label, title, line);
            }
            HeadingClass::Preface => {
                self.open_section(
                    FragmentKind::Preface,
                    TocKind::Preface,
                    &raw,
                    String::new(),
                    "Preface".to_string(),
                    line,
                );
            }
            HeadingClass::Plain => {
                let slug = self.claim_slug(&raw, line);
                if depth == 3 {
                    self.toc.push(TocEntry {
                        depth,
                        number: String::new(),
                        title: raw.trim().to_string(),
                        slug: slug.clone(),
                        kind: TocKind::Section,
                    });
                    self.current.anchors.push(slug.clone());
                }
                let html = format!(
                    "<h{depth} id=\"{}\">{}</h{depth}>\n",
                    escape_html(&slug),
                    inline_html(inner)
                );
                self.pending.push(Event::Html(html.into()));
            }
        }
    }

    /// Close the current section and start a new one with a page-break
    /// fragment.
    fn open_section(
        &mut self,
        kind: FragmentKind,
        toc_kind: TocKind,
        raw: &str,
        number: String,
        title: String,
        line: usize,
    ) {
        self.close_section();
        self.current = Fragment::new(kind, String::new());

        let slug = self.claim_slug(raw, line);
        let label = if number.is_empty() {
            String::new()
        } else {
            format!("\n  <div class=\"chapter-label\">{}</div>", escape_html(&number))
        };
        let html = format!(
            "<div class=\"chapter-break\" id=\"{}\">{label}\n  <h1 class=\"chapter-title\">{}</h1>\n  <hr class=\"chapter-rule\" />\n</div>\n",
            escape_html(&slug),
            escape_html(&title),
        );
        self.pending.push(Event::Html(html.into()));
        self.current.anchors.push(slug.clone());
        self.toc.push(TocEntry {
            depth: 2,
            number,
            title,
            slug,
            kind: toc_kind,
        });
    }

    fn claim_slug(&mut self, raw: &str, line: usize) -> String {
        let (slug, renamed) = self.slugs.claim(slugify(raw));
        if renamed {
            self.diagnostics.push(Diagnostic::warning(
                "W001",
                format!("Duplicate heading anchor for \"{}\"; using \"{slug}\"", raw.trim()),
                Some(line),
            ));
        }
        slug
    }

    fn code_block(&mut self, lang: Option<&str>, code: &str, line: usize) {
        let trimmed = code.strip_suffix('\n').unwrap_or(code);
        if is_ascii_diagram(trimmed) {
            self.pending.push(Event::Html(format!("{}\n", render_diagram(trimmed)).into()));
            return;
        }

        let highlighted = match highlight(code, lang) {
            Ok(html) => html,
            Err(err) => {
                self.diagnostics.push(Diagnostic::info(
                    "I001",
                    format!(
                        "Highlighting failed for {} block, rendering plain text: {err}",
                        lang.unwrap_or("unlabelled")
                    ),
                    Some(line),
                ));
                escape_html(trimmed)
            }
        };

        let class = if trimmed.split('\n').count() > LONG_CODE_LINES {
            "code-block code-long"
        } else {
            "code-block"
        };
        let (label, lang_class) = match lang {
            Some(l) => (
                format!("<span class=\"code-lang\">{}</span>", escape_html(l)),
                format!(" language-{}", escape_html(l)),
            ),
            None => (String::new(), String::new()),
        };
        let html = format!(
            "<div class=\"{class}\">{label}<pre><code class=\"highlight{lang_class}\">{highlighted}</code></pre></div>\n"
        );
        self.pending.push(Event::Html(html.into()));
    }

    fn table(&mut self, alignments: &[Alignment], inner: &[Spanned<'a>]) {
        let mut html = String::from("<table class=\"styled-table\"><thead><tr>");
        let mut in_head = false;
        let mut column = 0;
        let mut cell: Vec<Spanned<'a>> = Vec::new();

        for (event, range) in inner {
            match event {
                Event::Start(Tag::TableHead) => {
                    in_head = true;
                    column = 0;
                }
                Event::End(TagEnd::TableHead) => {
                    in_head = false;
                    html.push_str("</tr></thead><tbody>");
                }
                Event::Start(Tag::TableRow) => {
                    column = 0;
                    html.push_str("<tr>");
                }
                Event::End(TagEnd::TableRow) => html.push_str("</tr>"),
                Event::Start(Tag::TableCell) => cell.clear(),
                Event::End(TagEnd::TableCell) => {
                    let tag = if in_head { "th" } else { "td" };
                    let style = match alignments.get(column) {
                        Some(Alignment::Left) => " style=\"text-align:left\"",
                        Some(Alignment::Center) => " style=\"text-align:center\"",
                        Some(Alignment::Right) => " style=\"text-align:right\"",
                        _ => "",
                    };
                    html.push_str(&format!("<{tag}{style}>{}</{tag}>", inline_html(&cell)));
                    column += 1;
                }
                other => cell.push((other.clone(), range.clone())),
            }
        }
        html.push_str("</tbody></table>\n");
        self.pending.push(Event::Html(html.into()));
    }

    fn flush(&mut self) {
        pulldown_cmark::html::push_html(&mut self.current.html, self.pending.drain(..));
    }

    fn close_section(&mut self) {
        self.flush();
        if !self.current.html.trim().is_empty() || !self.current.anchors.is_empty() {
            let done = std::mem::replace(
                &mut self.current,
                Fragment::new(FragmentKind::Preamble, String::new()),
            );
            self.sections.push(done);
        }
    }

    fn finish(mut self) -> RenderedBody {
        self.close_section();
        RenderedBody {
            sections: self.sections,
            toc: self.toc,
            state: self.state,
            diagnostics: self.diagnostics,
        }
    }
}

/// Index of the first event after `start` whose end tag satisfies `is_end`.
/// A truncated stream yields `events.len()`.
fn find_end(events: &[Spanned<'_>], start: usize, is_end: impl Fn(&TagEnd) -> bool) -> usize {
    events[start + 1..]
        .iter()
        .position(|(e, _)| matches!(e, Event::End(tag) if is_end(tag)))
        .map(|offset| start + 1 + offset)
        .unwrap_or(events.len())
}

/// First word of a fence info string (` ```rust,ignore ` → `rust`).
fn fence_language(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .filter(|s| !s.is_empty())
}

fn plain_text(events: &[Spanned<'_>]) -> String {
    let mut text = String::new();
    for (event, _) in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn inline_html(events: &[Spanned<'_>]) -> String {
    let mut html = String::new();
    let mapped = events.iter().map(|(event, _)| match event {
        Event::Code(text) => inline_code(text),
        other => other.clone(),
    });
    pulldown_cmark::html::push_html(&mut html, mapped);
    html
}

fn inline_code<'e>(text: &str) -> Event<'e> {
    Event::InlineHtml(format!("<code class=\"inline-code\">{}</code>", escape_html(text)).into())
}

fn task_item_open<'e>(checked: bool) -> Event<'e> {
    let glyph = if checked { "\u{2611}" } else { "\u{2610}" };
    Event::Html(format!("<li class=\"task-item\"><span class=\"checkbox\">{glyph}</span> ").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_chapter() {
        assert_eq!(
            classify_heading(2, "Chapter 3: Scaling Out"),
            HeadingClass::Chapter {
                number: 3,
                title: "Scaling Out".into()
            }
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            classify_heading(2, "appendix b: glossary"),
            HeadingClass::Appendix {
                letter: 'B',
                title: "glossary".into()
            }
        );
        assert_eq!(classify_heading(2, "PREFACE"), HeadingClass::Preface);
    }

    #[test]
    fn only_depth_two_opens_chapters() {
        assert_eq!(classify_heading(3, "Chapter 3: Scaling Out"), HeadingClass::Plain);
        assert_eq!(classify_heading(1, "Preface"), HeadingClass::Plain);
    }

    #[test]
    fn preface_must_be_exact() {
        assert_eq!(classify_heading(2, "Preface to the Second Edition"), HeadingClass::Plain);
    }

    #[test]
    fn chapter_heading_produces_toc_entry_and_break() {
        let body = render_body("## Chapter 3: Scaling Out\n\nText.\n");
        assert_eq!(
            body.toc,
            vec![TocEntry {
                depth: 2,
                number: "Chapter 3".into(),
                title: "Scaling Out".into(),
                slug: "chapter-3-scaling-out".into(),
                kind: TocKind::Chapter,
            }]
        );
        assert_eq!(body.sections.len(), 1);
        let html = &body.sections[0].html;
        assert!(html.contains("<div class=\"chapter-break\" id=\"chapter-3-scaling-out\">"));
        assert!(html.contains("<div class=\"chapter-label\">Chapter 3</div>"));
        assert!(html.contains("<h1 class=\"chapter-title\">Scaling Out</h1>"));
        assert!(html.contains("<hr class=\"chapter-rule\" />"));
        assert_eq!(body.sections[0].anchors, vec!["chapter-3-scaling-out".to_string()]);
    }

    #[test]
    fn state_advances_forward() {
        let body = render_body("## Preface\n\n## Chapter 1: A\n\n## Chapter 2: B\n\n## Appendix A: C\n");
        assert_eq!(body.state.chapter_number, 2);
        assert_eq!(body.state.appendix_letter, Some('A'));
        assert!(!body.state.in_front_matter);
        let kinds: Vec<_> = body.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Preface,
                FragmentKind::Chapter,
                FragmentKind::Chapter,
                FragmentKind::Appendix
            ]
        );
    }

    #[test]
    fn preface_keeps_front_matter_flag() {
        let body = render_body("## Preface\n\nHello.\n");
        assert!(body.state.in_front_matter);
        assert_eq!(body.toc[0].kind, TocKind::Preface);
        assert!(!body.sections[0].html.contains("chapter-label"));
    }

    #[test]
    fn decreasing_chapter_number_warns_but_state_holds() {
        let body = render_body("## Chapter 5: A\n\n## Chapter 2: B\n");
        assert_eq!(body.state.chapter_number, 5);
        assert!(body.diagnostics.iter().any(|d| d.code.as_deref() == Some("W002")));
        assert_eq!(body.toc[1].number, "Chapter 2");
    }

    #[test]
    fn depth_three_goes_to_toc_depth_two_plain_does_not() {
        let body = render_body("## Chapter 1: A\n\n## Overview\n\n### Details\n");
        let slugs: Vec<_> = body.toc.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["chapter-1-a", "details"]);
        let html = body.html();
        assert!(html.contains("<h2 id=\"overview\">Overview</h2>"));
        assert!(html.contains("<h3 id=\"details\">Details</h3>"));
    }

    #[test]
    fn duplicate_slugs_are_suffixed() {
        let body = render_body("## Chapter 1: A\n\n### Summary\n\n## Chapter 2: B\n\n### Summary\n");
        let sections: Vec<_> = body
            .toc
            .iter()
            .filter(|e| e.kind == TocKind::Section)
            .map(|e| e.slug.as_str())
            .collect();
        assert_eq!(sections, vec!["summary", "summary-1"]);
        assert!(body.html().contains("id=\"summary-1\""));
        let dup = body
            .diagnostics
            .iter()
            .find(|d| d.code.as_deref() == Some("W001"))
            .expect("duplicate warning");
        assert_eq!(dup.line, Some(7));
    }

    #[test]
    fn content_before_first_chapter_is_preamble() {
        let body = render_body("Intro text.\n\n## Chapter 1: A\n");
        assert_eq!(body.sections.len(), 2);
        assert_eq!(body.sections[0].kind, FragmentKind::Preamble);
        assert!(body.sections[0].html.contains("Intro text."));
    }

    #[test]
    fn rule_is_a_divider_not_a_break() {
        let body = render_body("## Chapter 1: A\n\nOne\n\n---\n\nTwo\n");
        assert_eq!(body.sections.len(), 1);
        assert!(body.html().contains("<hr class=\"section-divider\" />"));
    }

    #[test]
    fn diagram_fence_is_not_highlighted() {
        let md = "```\n┌──┐\n│  │\nx\ny\n└──┘\n```\n";
        let html = render_body(md).html();
        assert!(html.contains("<div class=\"diagram\"><pre>┌──┐"));
        assert!(!html.contains("code-block"));
    }

    #[test]
    fn blank_last_fence_line_completes_a_diagram() {
        let md = "```\n┌──┐\n│  │\n│  │\n└──┘\n\n```\n";
        let html = render_body(md).html();
        assert!(html.contains("class=\"diagram\""), "got: {html}");
        assert!(!html.contains("code-block"));
    }

    #[test]
    fn labelled_diagram_is_still_a_diagram() {
        let md = "```text\n┌──┐\n│  │\nx\ny\n└──┘\n```\n";
        assert!(render_body(md).html().contains("class=\"diagram\""));
    }

    #[test]
    fn code_fence_gets_language_label() {
        let html = render_body("```rust\nfn main() {}\n```\n").html();
        assert!(html.contains("<div class=\"code-block\"><span class=\"code-lang\">rust</span>"));
        assert!(html.contains("<code class=\"highlight language-rust\">"));
    }

    #[test]
    fn long_fence_may_break() {
        let code: String = (0..36).map(|i| format!("let x{i} = {i};\n")).collect();
        let html = render_body(&format!("```js\n{code}```\n")).html();
        assert!(html.contains("code-block code-long"));

        let code: String = (0..35).map(|i| format!("let x{i} = {i};\n")).collect();
        let html = render_body(&format!("```js\n{code}```\n")).html();
        assert!(!html.contains("code-long"));
    }

    #[test]
    fn task_list_items_are_tri_state() {
        let html = render_body("- [x] done\n- [ ] todo\n- plain\n").html();
        assert!(html.contains("<li class=\"task-item\"><span class=\"checkbox\">\u{2611}</span> done</li>"));
        assert!(html.contains("<li class=\"task-item\"><span class=\"checkbox\">\u{2610}</span> todo</li>"));
        assert!(html.contains("<li>plain</li>"));
    }

    #[test]
    fn table_keeps_column_alignment() {
        let md = "| A | B | C |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n";
        let html = render_body(md).html();
        assert!(html.contains("<table class=\"styled-table\">"));
        assert!(html.contains("<th style=\"text-align:left\">A</th>"));
        assert!(html.contains("<th style=\"text-align:center\">B</th>"));
        assert!(html.contains("<td style=\"text-align:right\">3</td>"));
    }

    #[test]
    fn blockquote_and_inline_code_are_styled() {
        let html = render_body("> Use `<T>` here.\n").html();
        assert!(html.contains("<blockquote class=\"styled-quote\">"));
        assert!(html.contains("<code class=\"inline-code\">&lt;T&gt;</code>"));
    }

    #[test]
    fn headings_escape_titles() {
        let body = render_body("## Chapter 1: In & Out <-> Back\n");
        assert_eq!(body.toc[0].title, "In & Out <-> Back");
        assert!(body.html().contains("In &amp; Out &lt;-&gt; Back"));
    }
}
