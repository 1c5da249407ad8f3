//! The shared print stylesheet.
//!
//! Every rendering pass embeds the same rules so typography is identical
//! across separately rendered documents. Fonts are referenced by family name
//! only; nothing is fetched over the network.

/// Stylesheet embedded in every generated document.
pub const BOOK_CSS: &str = r#"
/* ============================================================
   Page Setup
   ============================================================ */
@page {
  size: 7in 10in;
  margin: 0.85in 0.75in 0.85in 1.0in;
}

@page :first {
  margin-top: 0;
  margin-bottom: 0;
}

* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

html {
  font-size: 10pt;
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}

body {
  font-family: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
  color: #1a1a1a;
  line-height: 1.6;
  font-weight: 400;
}

/* ============================================================
   Title Page
   ============================================================ */
.title-page {
  page-break-after: always;
  display: flex;
  flex-direction: column;
  align-items: center;
  padding: 1.5in 0.5in 0.5in 0.5in;
  text-align: center;
}

.title-rule {
  width: 100%;
  border: none;
  border-top: 4px solid #111;
  margin: 0;
}

.title-block {
  margin: 0.8in 0 0.3in 0;
}

.title-word {
  font-family: 'Inter', sans-serif;
  font-size: 38pt;
  font-weight: 700;
  color: #111;
  line-height: 1.15;
  letter-spacing: -0.02em;
}

.title-subtitle {
  font-size: 16pt;
  font-weight: 400;
  color: #555;
  margin-bottom: 0.5in;
  letter-spacing: 0.02em;
}

.title-tagline {
  font-size: 12pt;
  font-weight: 500;
  color: #333;
  margin-top: 0.4in;
  letter-spacing: 0.05em;
  text-transform: uppercase;
}

.title-author {
  font-size: 14pt;
  font-weight: 600;
  color: #111;
  margin-top: auto;
}

.title-role {
  font-size: 10pt;
  font-weight: 400;
  color: #666;
  margin-top: 0.05in;
}

.title-version {
  font-size: 9pt;
  color: #999;
  margin-top: 0.2in;
}

/* ============================================================
   Copyright Page
   ============================================================ */
.copyright-page {
  page-break-after: always;
  padding-top: 70%;
}

.copyright-content {
  font-size: 8.5pt;
  line-height: 1.6;
  color: #555;
}

.copyright-title {
  font-weight: 600;
  font-size: 9pt;
  color: #333;
}

.copyright-edition {
  font-style: italic;
  font-size: 8.5pt;
}

.copyright-meta {
  font-size: 8.5pt;
}

/* ============================================================
   Table of Contents
   ============================================================ */
.toc-page {
  page-break-after: always;
  padding-top: 0.5in;
}

.toc-heading {
  font-size: 24pt;
  font-weight: 700;
  color: #111;
  margin-bottom: 0.4in;
  text-align: center;
}

.toc-entries {
  font-size: 10pt;
  line-height: 2.0;
}

.toc-chapter {
  font-weight: 600;
  margin-top: 0.15in;
}

.toc-chapter:first-child {
  margin-top: 0;
}

.toc-section {
  padding-left: 1.2em;
  font-weight: 400;
  color: #444;
  font-size: 9.5pt;
}

.toc-entries a {
  color: inherit;
  text-decoration: none;
}

/* ============================================================
   Chapter Breaks
   ============================================================ */
.chapter-break {
  page-break-before: always;
  padding-top: 1.5in;
  margin-bottom: 0.4in;
}

.chapter-label {
  font-size: 13pt;
  font-weight: 500;
  color: #999;
  letter-spacing: 0.05em;
  text-transform: uppercase;
  margin-bottom: 0.15in;
}

.chapter-title {
  font-size: 28pt;
  font-weight: 700;
  color: #111;
  line-height: 1.2;
  margin-bottom: 0.2in;
}

.chapter-rule {
  border: none;
  border-top: 3px solid #111;
  width: 100%;
  margin: 0 0 0.3in 0;
}

/* ============================================================
   Body Typography
   ============================================================ */
h2 {
  font-size: 22pt;
  font-weight: 700;
  color: #111;
  margin: 1.5em 0 0.5em 0;
  page-break-after: avoid;
}

h3 {
  font-size: 16pt;
  font-weight: 600;
  color: #111;
  margin: 1.3em 0 0.4em 0;
  page-break-after: avoid;
}

h4 {
  font-size: 12pt;
  font-weight: 600;
  color: #222;
  margin: 1em 0 0.3em 0;
  page-break-after: avoid;
}

h5 {
  font-size: 10pt;
  font-weight: 600;
  color: #333;
  margin: 0.8em 0 0.3em 0;
}

p {
  margin: 0 0 0.5em 0;
  orphans: 3;
  widows: 3;
}

strong {
  font-weight: 600;
}

em {
  font-style: italic;
}

a {
  color: #1a1a1a;
  text-decoration: none;
}

/* ============================================================
   Lists
   ============================================================ */
ul, ol {
  margin: 0.3em 0 0.6em 1.5em;
  padding: 0;
}

li {
  margin-bottom: 0.2em;
}

li > p {
  margin-bottom: 0.2em;
}

.task-item {
  list-style: none;
  margin-left: -1.2em;
}

.checkbox {
  font-size: 11pt;
  margin-right: 0.3em;
}

/* ============================================================
   Code Blocks
   ============================================================ */
.code-block {
  position: relative;
  background: #f6f8fa;
  border: 1px solid #e1e4e8;
  border-radius: 3px;
  margin: 0.5em 0 0.7em 0;
  padding: 0;
  page-break-inside: avoid;
  overflow: hidden;
}

.code-block.code-long {
  page-break-inside: auto;
}

.code-block pre {
  margin: 0;
  padding: 0.6em 0.8em;
  overflow-x: auto;
}

.code-block code {
  font-family: 'JetBrains Mono', 'Fira Code', 'Consolas', monospace;
  font-size: 8.5pt;
  line-height: 1.45;
  color: #1a1a1a;
  white-space: pre;
  word-wrap: normal;
}

.code-lang {
  position: absolute;
  top: 0;
  right: 0;
  background: #e9ecef;
  color: #777;
  font-family: 'Inter', sans-serif;
  font-size: 7pt;
  padding: 0.15em 0.5em;
  border-radius: 0 3px 0 3px;
  text-transform: uppercase;
  letter-spacing: 0.05em;
}

/* Inline code */
.inline-code {
  font-family: 'JetBrains Mono', monospace;
  font-size: 9pt;
  background: #f0f2f4;
  padding: 0.1em 0.3em;
  border-radius: 3px;
  color: #1a1a1a;
}

/* ============================================================
   Syntax Highlighting: grayscale print theme
   ============================================================ */
.code-block code span {
  background: transparent;
}

.hl-keyword,
.hl-storage,
.hl-support.hl-type {
  color: #1a1a1a;
  font-weight: 700;
}

.hl-string,
.hl-markup.hl-inserted {
  color: #4a4a4a;
}

.hl-comment,
.hl-markup.hl-deleted,
.hl-meta.hl-preprocessor {
  color: #8b8b8b;
  font-style: italic;
}

.hl-entity.hl-name,
.hl-markup.hl-heading {
  color: #2d2d2d;
  font-weight: 600;
}

.hl-constant,
.hl-variable.hl-parameter,
.hl-markup.hl-underline.hl-link {
  color: #3a3a3a;
}

.hl-entity.hl-other.hl-attribute-name {
  color: #444;
}

.hl-string.hl-regexp,
.hl-entity.hl-other.hl-inherited-class {
  color: #333;
  font-weight: 500;
}

.hl-markup.hl-italic {
  font-style: italic;
}

.hl-markup.hl-bold {
  font-weight: 700;
}

/* ============================================================
   ASCII Diagrams
   ============================================================ */
.diagram {
  margin: 0.6em 0 0.8em 0;
  page-break-inside: avoid;
  text-align: center;
}

.diagram pre {
  display: inline-block;
  text-align: left;
  font-family: 'JetBrains Mono', monospace;
  font-size: 8pt;
  line-height: 1.35;
  background: #fafbfc;
  border: 1px solid #e1e4e8;
  border-radius: 4px;
  padding: 0.8em 1em;
  color: #1a1a1a;
  white-space: pre;
  overflow-x: auto;
}

/* ============================================================
   Blockquotes
   ============================================================ */
.styled-quote {
  border-left: 3px solid #3b82f6;
  background: #f0f7ff;
  margin: 0.5em 0 0.7em 0;
  padding: 0.6em 1em;
  border-radius: 0 4px 4px 0;
  page-break-inside: avoid;
}

.styled-quote p {
  font-style: italic;
  color: #333;
  margin-bottom: 0.3em;
}

.styled-quote p:last-child {
  margin-bottom: 0;
}

/* ============================================================
   Tables
   ============================================================ */
.styled-table {
  width: 100%;
  border-collapse: collapse;
  margin: 0.5em 0 0.8em 0;
  font-size: 9pt;
  page-break-inside: avoid;
}

.styled-table thead th {
  background: #f3f4f6;
  font-weight: 600;
  text-align: left;
  padding: 0.5em 0.6em;
  border-top: 2px solid #333;
  border-bottom: 1px solid #ccc;
}

.styled-table tbody td {
  padding: 0.4em 0.6em;
  border-bottom: 1px solid #e5e7eb;
}

.styled-table tbody tr:nth-child(even) {
  background: #fafafa;
}

/* ============================================================
   Section Dividers (from --- in markdown)
   ============================================================ */
.section-divider {
  border: none;
  border-top: 1px solid #e5e7eb;
  margin: 1.5em 0;
}

/* ============================================================
   About the Author
   ============================================================ */
.about-author-page {
  page-break-before: always;
  padding-top: 1.5in;
}

.about-heading {
  font-size: 24pt;
  font-weight: 700;
  color: #111;
  margin-bottom: 0.2in;
}

.about-content {
  margin-top: 0.3in;
  font-size: 10pt;
  line-height: 1.7;
  max-width: 5in;
}

.about-content p {
  margin-bottom: 0.6em;
}

/* ============================================================
   Anchor Index (keeps every TOC target a named destination)
   ============================================================ */
.anchor-index {
  position: absolute;
  width: 0;
  height: 0;
  overflow: hidden;
}

/* ============================================================
   Print Utilities
   ============================================================ */
@media print {
  body {
    -webkit-print-color-adjust: exact;
    print-color-adjust: exact;
  }
}
"#;
