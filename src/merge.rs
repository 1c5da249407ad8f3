//! Merging the pass PDFs into the final book.
//!
//! Pages from every intermediate are imported into one document under a
//! fresh page tree, stamped with their page label, and the result gets
//! metadata, named destinations and an outline before being written
//! atomically to the output path.

use anyhow::{Context, Result, anyhow, bail};
use book_markup::layout::{STAMP_BOTTOM_OFFSET_PT, STAMP_FONT_SIZE, STAMP_GRAY};
use book_markup::{BookMeta, TocEntry};
use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::outline::{OutlineNode, build_outline, pdf_text, write_outline};

/// Resource name of the stamp font in every page's font dictionary.
const STAMP_FONT: &str = "BkStamp";

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Limit on reference chains and tree depth when walking source documents.
const MAX_DEPTH: usize = 32;

/// What the merge produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub front_pages: usize,
    pub body_pages: usize,
    pub destinations: usize,
    pub outline_entries: usize,
    pub bytes: u64,
}

impl MergeSummary {
    pub fn total_pages(&self) -> usize {
        self.front_pages + self.body_pages
    }
}

/// Page label for the page at `index` (zero-based) when the first
/// `front_count` pages are front matter.
///
/// The title page has none, the rest of the front matter gets lowercase
/// roman numerals counted from the title page, and the body restarts at 1.
pub fn page_label(index: usize, front_count: usize) -> Option<String> {
    if index == 0 {
        None
    } else if index < front_count {
        Some(to_roman(index + 1))
    } else {
        Some((index - front_count + 1).to_string())
    }
}

/// Lowercase roman numeral; `0` yields an empty string.
pub fn to_roman(mut n: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// Width of `text` set in Helvetica at `size` points.
fn helvetica_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '0'..='9' => 556,
            'i' | 'l' => 222,
            'v' | 'x' | 'c' => 500,
            'd' => 556,
            'm' => 833,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Merge `front` and `bodies` (in that order) into `output`.
pub fn merge_book(
    front: &Path,
    bodies: &[PathBuf],
    meta: &BookMeta,
    toc: &[TocEntry],
    created: DateTime<Utc>,
    output: &Path,
) -> Result<MergeSummary> {
    let mut merged = Document::with_version("1.7");

    let front_import = import(&mut merged, front)?;
    let front_pages = front_import.pages.len();
    let mut page_ids = front_import.pages;
    let mut dests: HashMap<String, (usize, Vec<Object>)> = HashMap::new();

    for body in bodies {
        let imported = import(&mut merged, body)?;
        let offset = page_ids.len();
        for (name, (local, array)) in imported.dests {
            dests.entry(name).or_insert((offset + local, array));
        }
        page_ids.extend(imported.pages);
    }
    let body_pages = page_ids.len() - front_pages;

    let pages_id = merged.new_object_id();
    let font_id = merged.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    for (index, &page_id) in page_ids.iter().enumerate() {
        adopt_page(&mut merged, page_id, pages_id)?;
        if let Some(label) = page_label(index, front_pages) {
            stamp_page(&mut merged, page_id, &label, font_id)?;
        }
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    if !dests.is_empty() {
        let mut names = Dictionary::new();
        for (name, (_, array)) in &dests {
            names.set(name.as_bytes().to_vec(), Object::Array(array.clone()));
        }
        catalog.set("Dests", Object::Dictionary(names));
    }

    let outline = build_outline(
        toc,
        |slug| dests.get(slug).map(|(page, _)| *page),
        front_pages.min(page_ids.len().saturating_sub(1)),
    );
    let dest_for = |node: &OutlineNode| -> Object {
        match dests.get(&node.slug) {
            Some((_, array)) if node.resolved => Object::Array(array.clone()),
            _ => Object::Array(vec![Object::Reference(page_ids[node.page]), "Fit".into()]),
        }
    };
    if let Some(outlines_id) = write_outline(&mut merged, &outline, &dest_for) {
        catalog.set("Outlines", outlines_id);
        catalog.set("PageMode", "UseOutlines");
    }

    let catalog_id = merged.add_object(catalog);
    merged.trailer.set("Root", catalog_id);

    let info_id = merged.add_object(info_dictionary(meta, created));
    merged.trailer.set("Info", info_id);

    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    let bytes = save_atomically(&mut merged, output)?;

    Ok(MergeSummary {
        front_pages,
        body_pages,
        destinations: dests.len(),
        outline_entries: outline.iter().map(|n| 1 + n.children.len()).sum(),
        bytes,
    })
}

struct Imported {
    pages: Vec<ObjectId>,
    /// Destination name → (page index within this document, explicit
    /// destination array).
    dests: HashMap<String, (usize, Vec<Object>)>,
}

/// Move every object of the PDF at `path` into `dst`, renumbered past its
/// existing objects.
fn import(dst: &mut Document, path: &Path) -> Result<Imported> {
    let mut src = Document::load(path)
        .with_context(|| format!("Failed to read intermediate PDF '{}'", path.display()))?;
    if src.is_encrypted() {
        bail!("Intermediate PDF '{}' is encrypted", path.display());
    }

    src.renumber_objects_with(dst.max_id + 1);
    let pages: Vec<ObjectId> = src.get_pages().values().copied().collect();
    if pages.is_empty() {
        bail!("Intermediate PDF '{}' has no pages", path.display());
    }

    // Inherited attributes live on the source page tree, which is dropped.
    for &page_id in &pages {
        inline_inherited(&mut src, page_id)?;
    }

    let index_of: HashMap<ObjectId, usize> =
        pages.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let dests = named_destinations(&src)
        .into_iter()
        .filter_map(|(name, array)| {
            let page = array.first()?.as_reference().ok()?;
            index_of.get(&page).map(|&i| (name, (i, array)))
        })
        .collect();

    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    Ok(Imported { pages, dests })
}

fn inline_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| anyhow!("Bad page object {:?}: {}", page_id, e))?;

    let mut found: Vec<(&[u8], Object)> = Vec::new();
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(id) = parent.filter(|_| depth < MAX_DEPTH) {
            let Ok(node) = doc.get_dictionary(id) else { break };
            if let Ok(value) = node.get(key) {
                found.push((key, value.clone()));
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if !found.is_empty() {
        let page = doc
            .get_dictionary_mut(page_id)
            .map_err(|e| anyhow!("Bad page object {:?}: {}", page_id, e))?;
        for (key, value) in found {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// Re-parent a page under the merged page tree.
fn adopt_page(doc: &mut Document, page_id: ObjectId, pages_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| anyhow!("Bad page object {:?}: {}", page_id, e))?;
    page.set("Parent", pages_id);
    Ok(())
}

/// Follow references until a direct object.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_DEPTH {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

/// Named destinations from the catalog's `/Dests` dictionary and its
/// `/Names` → `/Dests` name tree, as explicit destination arrays.
fn named_destinations(doc: &Document) -> Vec<(String, Vec<Object>)> {
    let mut out = Vec::new();
    let Some(catalog) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve_dict(doc, root))
    else {
        return out;
    };

    if let Some(dests) = catalog.get(b"Dests").ok().and_then(|d| resolve_dict(doc, d)) {
        for (name, value) in dests.iter() {
            if let Some(array) = destination_array(doc, value) {
                out.push((String::from_utf8_lossy(name).into_owned(), array));
            }
        }
    }

    let tree = catalog
        .get(b"Names")
        .ok()
        .and_then(|n| resolve_dict(doc, n))
        .and_then(|names| names.get(b"Dests").ok())
        .and_then(|d| resolve_dict(doc, d));
    if let Some(tree) = tree {
        walk_name_tree(doc, tree, 0, &mut out);
    }
    out
}

fn walk_name_tree(
    doc: &Document,
    node: &Dictionary,
    depth: usize,
    out: &mut Vec<(String, Vec<Object>)>,
) {
    if depth > MAX_DEPTH {
        return;
    }
    if let Some(pairs) = node
        .get(b"Names")
        .ok()
        .and_then(|n| resolve(doc, n))
        .and_then(|n| n.as_array().ok())
    {
        for pair in pairs.chunks_exact(2) {
            let key = match resolve(doc, &pair[0]) {
                Some(Object::String(bytes, _)) => decode_text(bytes),
                Some(Object::Name(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
                _ => continue,
            };
            if let Some(array) = destination_array(doc, &pair[1]) {
                out.push((key, array));
            }
        }
    }
    if let Some(kids) = node
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve(doc, k))
        .and_then(|k| k.as_array().ok())
    {
        for kid in kids {
            if let Some(child) = resolve_dict(doc, kid) {
                walk_name_tree(doc, child, depth + 1, out);
            }
        }
    }
}

/// A destination value is either an array or a dictionary with a `/D` entry.
fn destination_array(doc: &Document, value: &Object) -> Option<Vec<Object>> {
    match resolve(doc, value)? {
        Object::Array(array) => Some(array.clone()),
        Object::Dictionary(dict) => match resolve(doc, dict.get(b"D").ok()?)? {
            Object::Array(array) => Some(array.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else byte-per-char).
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn number(obj: &Object) -> Option<f32> {
    if let Ok(v) = obj.as_float() {
        return Some(v);
    }
    obj.as_i64().ok().map(|v| v as f32)
}

/// `(llx, lly, urx)` of the page's media box, US Letter when unreadable.
fn media_box(doc: &Document, page: &Dictionary) -> (f32, f32, f32) {
    let bounds: Option<Vec<f32>> = page
        .get(b"MediaBox")
        .ok()
        .and_then(|b| resolve(doc, b))
        .and_then(|b| b.as_array().ok())
        .and_then(|arr| arr.iter().map(number).collect());
    match bounds.as_deref() {
        Some([llx, lly, urx, _]) => (*llx, *lly, *urx),
        _ => (0.0, 0.0, 612.0),
    }
}

/// Draw `label` centered near the bottom of the page, on top of the
/// existing content.
///
/// The page's own content is wrapped in `q`/`Q` so whatever graphics state
/// it leaves behind cannot leak into the stamp.
fn stamp_page(doc: &mut Document, page_id: ObjectId, label: &str, font_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| anyhow!("Bad page object {:?}: {}", page_id, e))?
        .clone();

    let mut resources = page
        .get(b"Resources")
        .ok()
        .and_then(|r| resolve_dict(doc, r))
        .cloned()
        .unwrap_or_default();
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve_dict(doc, f))
        .cloned()
        .unwrap_or_default();
    fonts.set(STAMP_FONT, font_id);
    resources.set("Font", Object::Dictionary(fonts));

    let (llx, lly, urx) = media_box(doc, &page);
    let x = llx + (urx - llx - helvetica_width(label, STAMP_FONT_SIZE)) / 2.0;
    let y = lly + STAMP_BOTTOM_OFFSET_PT;
    let stamp = format!(
        "\nQ\nq\nBT\n/{STAMP_FONT} {size} Tf\n{gray} {gray} {gray} rg\n{x:.2} {y:.2} Td\n({label}) Tj\nET\nQ\n",
        size = STAMP_FONT_SIZE,
        gray = STAMP_GRAY,
    );

    let mut contents: Vec<Object> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close_id = doc.add_object(Stream::new(Dictionary::new(), stamp.into_bytes()));
    contents.insert(0, Object::Reference(open_id));
    contents.push(Object::Reference(close_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| anyhow!("Bad page object {:?}: {}", page_id, e))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn info_dictionary(meta: &BookMeta, created: DateTime<Utc>) -> Dictionary {
    let date = created.format("D:%Y%m%d%H%M%SZ").to_string();
    let mut info = Dictionary::new();
    info.set("Title", pdf_text(&meta.full_title()));
    info.set("Author", pdf_text(&meta.author));
    info.set("Subject", pdf_text(&meta.tagline));
    info.set("Creator", pdf_text("bookgen"));
    info.set(
        "Producer",
        pdf_text(&format!("bookgen {} (lopdf)", env!("CARGO_PKG_VERSION"))),
    );
    info.set("CreationDate", pdf_text(&date));
    info.set("ModDate", pdf_text(&date));
    info
}

/// Write to a temporary file beside `output`, then rename over it, so a
/// failure never leaves a partial book behind. Returns the size written.
fn save_atomically(doc: &mut Document, output: &Path) -> Result<u64> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create '{}'", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".bookgen-")
        .suffix(".pdf")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in '{}'", dir.display()))?;
    doc.save_to(&mut tmp)
        .with_context(|| format!("Failed to write '{}'", tmp.path().display()))?;
    let file = tmp
        .persist(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    let bytes = file
        .metadata()
        .with_context(|| format!("Failed to stat '{}'", output.display()))?
        .len();
    Ok(bytes)
}
