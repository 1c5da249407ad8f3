//! Heading anchors.

use std::collections::HashMap;

/// Generate a URL-safe anchor from heading text.
///
/// Lowercases, drops everything except ASCII word characters, whitespace and
/// hyphens, then joins whitespace runs with a single hyphen.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Hands out unique anchors for one document.
///
/// The first occurrence of a slug is returned as-is; repeats get `-1`, `-2`,
/// ... appended so every TOC link targets exactly one element.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    seen: HashMap<String, usize>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique anchor and whether `base` had to be disambiguated.
    pub fn claim(&mut self, base: String) -> (String, bool) {
        let Some(&last) = self.seen.get(&base) else {
            self.seen.insert(base.clone(), 0);
            return (base, false);
        };
        let mut n = last;
        let unique = loop {
            n += 1;
            let candidate = format!("{base}-{n}");
            if !self.seen.contains_key(&candidate) {
                break candidate;
            }
        };
        self.seen.insert(base, n);
        self.seen.insert(unique.clone(), 0);
        (unique, true)
    }
}
