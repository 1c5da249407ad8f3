//! PDF bookmarks built from the table of contents.

use book_markup::TocEntry;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};

/// One bookmark with its resolved target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub title: String,
    pub slug: String,
    /// Zero-based page index in the merged document.
    pub page: usize,
    /// Whether `page` came from the anchor's own destination rather than
    /// being inherited from the entry before it.
    pub resolved: bool,
    pub children: Vec<OutlineNode>,
}

/// Build a two-level outline: chapters, appendices and the preface at the
/// top, sections under the top-level entry before them.
///
/// `resolve` maps a slug to its page. Entries it cannot place inherit the
/// previous entry's page, or `first_body_page` when nothing precedes them.
pub fn build_outline(
    toc: &[TocEntry],
    resolve: impl Fn(&str) -> Option<usize>,
    first_body_page: usize,
) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut last_page = first_body_page;

    for entry in toc {
        let found = resolve(&entry.slug);
        let page = found.unwrap_or(last_page);
        last_page = page;

        let node = OutlineNode {
            title: entry.display_title(),
            slug: entry.slug.clone(),
            page,
            resolved: found.is_some(),
            children: Vec::new(),
        };
        match roots.last_mut() {
            Some(parent) if !entry.kind.is_top_level() => parent.children.push(node),
            _ => roots.push(node),
        }
    }
    roots
}

/// Write `nodes` into `doc` as its document outline and return the id of
/// the outline dictionary. Top-level entries start collapsed.
///
/// `dest` produces the explicit destination array for a node.
pub fn write_outline(
    doc: &mut Document,
    nodes: &[OutlineNode],
    dest: &dyn Fn(&OutlineNode) -> Object,
) -> Option<ObjectId> {
    if nodes.is_empty() {
        return None;
    }
    let outlines_id = doc.new_object_id();
    let (first, last) = write_siblings(doc, nodes, outlines_id, dest);
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => first,
            "Last" => last,
            "Count" => nodes.len() as i64,
        }),
    );
    Some(outlines_id)
}

fn write_siblings(
    doc: &mut Document,
    nodes: &[OutlineNode],
    parent: ObjectId,
    dest: &dyn Fn(&OutlineNode) -> Object,
) -> (ObjectId, ObjectId) {
    let ids: Vec<ObjectId> = nodes.iter().map(|_| doc.new_object_id()).collect();

    for (i, node) in nodes.iter().enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", pdf_text(&node.title));
        item.set("Parent", parent);
        item.set("Dest", dest(node));
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }
        if let Some(next) = ids.get(i + 1) {
            item.set("Next", *next);
        }
        if !node.children.is_empty() {
            let (first, last) = write_siblings(doc, &node.children, ids[i], dest);
            item.set("First", first);
            item.set("Last", last);
            // Negative count: closed, with this many hidden descendants.
            item.set("Count", -(node.children.len() as i64));
        }
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }
    (ids[0], ids[ids.len() - 1])
}

/// Encode a PDF text string: literal bytes for ASCII, UTF-16BE with a byte
/// order mark otherwise.
pub fn pdf_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
