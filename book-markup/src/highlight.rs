//! Code fence rendering: ASCII diagram detection and syntax highlighting.
//!
//! Highlighting is class-based (`hl-*` spans) so the grayscale print theme
//! lives in the shared stylesheet rather than in inline styles.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::escape_html;
use crate::layout::{BOX_DRAWING_GLYPHS, DIAGRAM_BOX_LINE_RATIO, DIAGRAM_MIN_LINES};

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// A fence is a diagram when it has at least [`DIAGRAM_MIN_LINES`] lines and
/// more than [`DIAGRAM_BOX_LINE_RATIO`] of them contain a box-drawing glyph.
///
/// `code` is the fence body without its final newline; any blank line left
/// at the end still counts.
pub fn is_ascii_diagram(code: &str) -> bool {
    let lines: Vec<&str> = code.split('\n').collect();
    if lines.len() < DIAGRAM_MIN_LINES {
        return false;
    }
    let boxed = lines
        .iter()
        .filter(|line| line.contains(BOX_DRAWING_GLYPHS))
        .count();
    boxed as f64 / lines.len() as f64 > DIAGRAM_BOX_LINE_RATIO
}

/// Render an ASCII diagram as an escaped, unhighlighted monospace block.
pub fn render_diagram(code: &str) -> String {
    format!("<div class=\"diagram\"><pre>{}</pre></div>", escape_html(code))
}

/// Highlight `code` into `hl-*` classed spans.
///
/// The syntax is chosen by declared language first, then by the first line
/// of the code (shebangs, `<?xml`, ...), then plain text.
pub fn highlight(code: &str, lang: Option<&str>) -> Result<String, syntect::Error> {
    let syntax = resolve_syntax(code, lang);
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

fn resolve_syntax(code: &str, lang: Option<&str>) -> &'static SyntaxReference {
    let syntaxes: &'static SyntaxSet = &SYNTAXES;
    lang.map(syntax_token)
        .and_then(|token| syntaxes.find_syntax_by_token(&token))
        .or_else(|| syntaxes.find_syntax_by_first_line(code.lines().next().unwrap_or("")))
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

/// Map fence labels onto tokens the bundled syntax set understands.
fn syntax_token(lang: &str) -> String {
    let lower = lang.trim().to_ascii_lowercase();
    let token = match lower.as_str() {
        "typescript" | "ts" | "tsx" | "jsx" | "javascript" | "mjs" | "cjs" => "js",
        "shell" | "bash" | "zsh" | "console" => "sh",
        "yml" => "yaml",
        "jsonc" => "json",
        "text" | "plaintext" => "txt",
        other => other,
    };
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn five_lines_two_boxed_is_diagram() {
        let code = fence(&["┌──┐", "│  │", "plain", "plain", "plain"]);
        assert!(is_ascii_diagram(&code));
    }

    #[test]
    fn five_lines_one_boxed_is_not_diagram() {
        let code = fence(&["┌──┐", "plain", "plain", "plain", "plain"]);
        assert!(!is_ascii_diagram(&code));
    }

    #[test]
    fn four_boxed_lines_is_too_short() {
        let code = fence(&["┌──┐", "│  │", "│  │", "└──┘"]);
        assert!(!is_ascii_diagram(&code));
    }

    #[test]
    fn blank_last_line_counts_toward_minimum() {
        let code = fence(&["┌──┐", "│  │", "│  │", "└──┘", ""]);
        assert!(is_ascii_diagram(&code));
    }

    #[test]
    fn diagram_is_escaped() {
        let html = render_diagram("A -> <B>");
        assert_eq!(html, "<div class=\"diagram\"><pre>A -&gt; &lt;B&gt;</pre></div>");
    }

    #[test]
    fn highlight_known_language_emits_classes() {
        let html = highlight("fn main() {}\n", Some("rust")).unwrap();
        assert!(html.contains("hl-"), "expected classed spans: {html}");
        assert!(html.contains("main"));
    }

    #[test]
    fn highlight_escapes_markup() {
        let html = highlight("<div>&</div>\n", Some("txt")).unwrap();
        assert!(html.contains("&lt;div&gt;"));
        assert!(!html.contains("<div>"));
    }

    #[test]
    fn unknown_language_falls_back_without_error() {
        let html = highlight("model User { id Int }\n", Some("prisma")).unwrap();
        assert!(html.contains("model User"));
    }

    #[test]
    fn aliases_resolve_to_bundled_syntaxes() {
        assert_eq!(resolve_syntax("", Some("ts")).name, "JavaScript");
        assert_eq!(resolve_syntax("", Some("bash")).name, "Bourne Again Shell (bash)");
    }

    #[test]
    fn shebang_detects_language() {
        let syntax = resolve_syntax("#!/bin/bash\necho hi\n", None);
        assert_eq!(syntax.name, "Bourne Again Shell (bash)");
    }
}
