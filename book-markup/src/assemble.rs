//! Layout assembly: front matter pages and the HTML documents handed to the
//! rendering engine.

use crate::escape_html;
use crate::layout::{MARGIN_LEFT_IN, MARGIN_RIGHT_IN};
use crate::split::BodyBatch;
use crate::style::BOOK_CSS;
use crate::types::{BookMeta, Fragment, FragmentKind, RenderedBody, TocEntry};

/// Title page: the title set one word per line, subtitle, tagline, author
/// and a version line.
pub fn title_page(meta: &BookMeta) -> Fragment {
    let words: String = meta
        .title
        .split_whitespace()
        .map(|w| format!("\n      <div class=\"title-word\">{}</div>", escape_html(&w.to_uppercase())))
        .collect();

    let version: Vec<String> = [&meta.edition, &meta.version, &meta.published]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| escape_html(s))
        .collect();

    let html = format!(
        r#"
  <div class="title-page">
    <hr class="title-rule" />
    <div class="title-block">{words}
    </div>
    <div class="title-subtitle">{subtitle}</div>
    <hr class="title-rule" />
    <div class="title-tagline">{tagline}</div>
    <div class="title-author">{author}</div>
    <div class="title-role">{role}</div>
    <div class="title-version">{version}</div>
  </div>"#,
        subtitle = escape_html(&meta.subtitle),
        tagline = escape_html(&meta.tagline),
        author = escape_html(&meta.author),
        role = escape_html(&meta.author_role),
        version = version.join(" &middot; "),
    );
    Fragment::new(FragmentKind::TitlePage, html)
}

pub fn copyright_page(meta: &BookMeta) -> Fragment {
    let mut tech = String::new();
    if let Some(built_with) = &meta.built_with {
        tech.push_str(&format!(
            "\n      <p class=\"copyright-meta\"><strong>Built with:</strong> {}</p>",
            escape_html(built_with)
        ));
    }
    if let Some(source) = &meta.source_code {
        tech.push_str(&format!(
            "\n      <p class=\"copyright-meta\"><strong>Source code:</strong> {}</p>",
            escape_html(source)
        ));
    }
    if !tech.is_empty() {
        tech.push_str("\n      <br/>");
    }

    let html = format!(
        r#"
  <div class="copyright-page">
    <div class="copyright-content">
      <p class="copyright-title">{full_title}</p>
      <p class="copyright-edition">{edition}</p>
      <br/>
      <p>Copyright &copy; {year} {author}. All rights reserved.</p>
      <p>No part of this publication may be reproduced, distributed, or transmitted in any form or by any means without the prior written permission of the author.</p>
      <br/>{tech}
      <p class="copyright-meta">{edition}, {published}</p>
    </div>
  </div>"#,
        full_title = escape_html(&meta.full_title()),
        edition = escape_html(&meta.edition),
        year = escape_html(&meta.copyright_year),
        author = escape_html(&meta.author),
        published = escape_html(&meta.published),
    );
    Fragment::new(FragmentKind::CopyrightPage, html)
}

/// Contents page. Depth-2 entries are chapter lines (prefixed with their
/// number when they have one), depth-3 entries are indented section lines.
pub fn toc_page(toc: &[TocEntry]) -> Fragment {
    let mut html = String::from(
        "<div class=\"toc-page\"><h1 class=\"toc-heading\">Contents</h1><div class=\"toc-entries\">",
    );
    for entry in toc {
        let class = match entry.depth {
            2 => "toc-chapter",
            3 => "toc-section",
            _ => continue,
        };
        html.push_str(&format!(
            "<div class=\"{class}\"><a href=\"#{}\">{}</a></div>",
            escape_html(&entry.slug),
            escape_html(&entry.display_title())
        ));
    }
    html.push_str("</div></div>");
    Fragment::new(FragmentKind::TocPage, html)
}

/// About-the-author page, or `None` when there are no paragraphs. A leading
/// mention of the author's name is set in bold.
pub fn about_author(meta: &BookMeta) -> Option<Fragment> {
    if meta.about_author.is_empty() {
        return None;
    }
    let paragraphs: String = meta
        .about_author
        .iter()
        .map(|p| {
            let body = match p.strip_prefix(meta.author.as_str()) {
                Some(rest) if !meta.author.is_empty() => format!(
                    "<strong>{}</strong>{}",
                    escape_html(&meta.author),
                    escape_html(rest)
                ),
                _ => escape_html(p),
            };
            format!("\n      <p>{body}</p>")
        })
        .collect();

    let html = format!(
        r#"
  <div class="about-author-page">
    <h1 class="about-heading">About the Author</h1>
    <hr class="chapter-rule" />
    <div class="about-content">{paragraphs}
    </div>
  </div>"#
    );
    Some(Fragment::new(FragmentKind::AboutAuthor, html))
}

/// Wrap `body` in a standalone document carrying the shared stylesheet.
pub fn wrap_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8" />
<title>{title}</title>
<style>{css}</style>
</head>
<body>{body}</body>
</html>"#,
        title = escape_html(title),
        css = BOOK_CSS,
    )
}

/// Document for the front matter pass: title, copyright and contents pages.
pub fn front_matter_html(meta: &BookMeta, toc: &[TocEntry]) -> String {
    let body = format!(
        "\n{}\n{}\n{}\n",
        title_page(meta).html,
        copyright_page(meta).html,
        toc_page(toc).html
    );
    wrap_html(&meta.title, &body)
}

/// Document for one body pass.
///
/// Every anchor in the batch is also linked from an invisible index so the
/// engine records it as a named destination in the intermediate PDF.
pub fn batch_html(meta: &BookMeta, batch: &BodyBatch) -> String {
    let links: String = batch
        .anchors()
        .map(|a| format!("<a href=\"#{0}\">{0}</a>", escape_html(a)))
        .collect();
    let body = format!(
        "<div class=\"book-body\">{}</div>\n<nav class=\"anchor-index\" aria-hidden=\"true\">{links}</nav>",
        batch.html()
    );
    wrap_html(&meta.title, &body)
}

/// Running header template for body passes.
pub fn running_header(meta: &BookMeta) -> String {
    format!(
        r#"<div style="width: 100%; font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; font-size: 7pt; color: #999; padding: 0 {MARGIN_RIGHT_IN}in 0 {MARGIN_LEFT_IN:.1}in; text-transform: uppercase; letter-spacing: 0.05em;"><span style="float: left;">{}</span></div>"#,
        escape_html(meta.header_text())
    )
}

/// Footer template for body passes. Page numbers are stamped after merging,
/// so the engine only gets an empty placeholder.
pub const EMPTY_FOOTER: &str = "<div></div>";

/// The whole book as one document, for previewing in a browser.
pub fn full_html(meta: &BookMeta, rendered: &RenderedBody) -> String {
    let about = about_author(meta).map(|f| f.html).unwrap_or_default();
    let body = format!(
        "\n{}\n{}\n{}\n\n<div class=\"book-body\">\n{}\n</div>\n{about}\n",
        title_page(meta).html,
        copyright_page(meta).html,
        toc_page(&rendered.toc).html,
        rendered.html(),
    );
    wrap_html(&meta.title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TocKind;
    use pretty_assertions::assert_eq;

    fn entry(depth: u8, number: &str, title: &str, slug: &str, kind: TocKind) -> TocEntry {
        TocEntry {
            depth,
            number: number.into(),
            title: title.into(),
            slug: slug.into(),
            kind,
        }
    }

    #[test]
    fn toc_prefixes_numbered_chapters() {
        let toc = vec![
            entry(2, "", "Preface", "preface", TocKind::Preface),
            entry(2, "Chapter 1", "Intro", "chapter-1-intro", TocKind::Chapter),
            entry(3, "", "Setup", "setup", TocKind::Section),
        ];
        let html = toc_page(&toc).html;
        assert!(html.contains("<div class=\"toc-chapter\"><a href=\"#preface\">Preface</a></div>"));
        assert!(html.contains(
            "<div class=\"toc-chapter\"><a href=\"#chapter-1-intro\">Chapter 1: Intro</a></div>"
        ));
        assert!(html.contains("<div class=\"toc-section\"><a href=\"#setup\">Setup</a></div>"));
    }

    #[test]
    fn toc_escapes_titles() {
        let toc = vec![entry(3, "", "A <b> & C", "a-b-c", TocKind::Section)];
        assert!(toc_page(&toc).html.contains("A &lt;b&gt; &amp; C"));
    }

    #[test]
    fn title_page_sets_one_word_per_line() {
        let meta = BookMeta {
            title: "Rust in Print".into(),
            ..BookMeta::default()
        };
        let html = title_page(&meta).html;
        assert!(html.contains("<div class=\"title-word\">RUST</div>"));
        assert!(html.contains("<div class=\"title-word\">PRINT</div>"));
        assert!(html.contains("First Edition &middot; v1.0.0 &middot; February 2026"));
    }

    #[test]
    fn copyright_omits_missing_lines() {
        let meta = BookMeta {
            built_with: None,
            source_code: None,
            ..BookMeta::default()
        };
        let html = copyright_page(&meta).html;
        assert!(!html.contains("Built with"));
        assert!(!html.contains("Source code"));
        assert!(html.contains("Copyright &copy; 2026"));
    }

    #[test]
    fn about_author_bolds_leading_name() {
        let meta = BookMeta {
            author: "Ada".into(),
            about_author: vec!["Ada writes code.".into(), "Second.".into()],
            ..BookMeta::default()
        };
        let html = about_author(&meta).unwrap().html;
        assert!(html.contains("<p><strong>Ada</strong> writes code.</p>"));
        assert!(html.contains("<p>Second.</p>"));
    }

    #[test]
    fn about_author_absent_without_paragraphs() {
        let meta = BookMeta {
            about_author: Vec::new(),
            ..BookMeta::default()
        };
        assert_eq!(about_author(&meta), None);
    }

    #[test]
    fn wrapped_documents_embed_stylesheet() {
        let html = wrap_html("T & U", "<p>x</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>T &amp; U</title>"));
        assert!(html.contains(".chapter-break"));
        assert!(html.contains("<body><p>x</p></body>"));
    }

    #[test]
    fn batch_links_every_anchor() {
        let mut section = Fragment::new(FragmentKind::Chapter, "<p>c</p>");
        section.anchors = vec!["chapter-1-a".into(), "setup".into()];
        let batch = BodyBatch {
            index: 0,
            sections: vec![section],
            about: None,
        };
        let html = batch_html(&BookMeta::default(), &batch);
        assert!(html.contains("<div class=\"book-body\"><p>c</p></div>"));
        assert!(html.contains("<a href=\"#chapter-1-a\">chapter-1-a</a><a href=\"#setup\">setup</a>"));
    }

    #[test]
    fn running_header_uses_override() {
        let meta = BookMeta {
            running_header: Some("Short Title".into()),
            ..BookMeta::default()
        };
        let header = running_header(&meta);
        assert!(header.contains(">Short Title</span>"));
        assert!(header.contains("padding: 0 0.75in 0 1.0in"));
    }
}
