//! Heading anchors.

use rustc_hash::{FxHashMap, FxHashSet};

use super::dom::Dom;
use crate::meta::slugify;

/// Id used when a heading's text has no alphanumeric characters.
const EMPTY_SLUG: &str = "section";

/// Give every heading without an id a unique slug id.
///
/// Repeated slugs get a numeric suffix: `hello`, `hello-1`, `hello-2`.
/// Ids already present anywhere in the tree are never reused.
pub fn assign_slugs(dom: &mut Dom) {
    let elements = dom.elements(dom.document());
    let mut used: FxHashSet<String> = elements
        .iter()
        .filter_map(|&id| dom.element(id)?.attr("id"))
        .map(str::to_string)
        .collect();
    // Next numeric suffix to try for each base slug.
    let mut next_suffix: FxHashMap<String, usize> = FxHashMap::default();

    for id in elements {
        let needs_id = dom
            .element(id)
            .is_some_and(|el| el.heading_level().is_some() && !el.has_attr("id"));
        if !needs_id {
            continue;
        }

        let text = dom.text_content(id);
        let mut base = slugify(&text);
        if base.is_empty() {
            base.push_str(EMPTY_SLUG);
        }
        let next = next_suffix.entry(base.clone()).or_insert(0);
        let mut candidate = if *next == 0 { base.clone() } else { format!("{base}-{next}") };
        while used.contains(&candidate) {
            *next += 1;
            candidate = format!("{base}-{next}");
        }
        *next += 1;

        if let Some(el) = dom.element_mut(id) {
            el.set_attr("id", candidate.clone());
        }
        used.insert(candidate);
    }
}

/// Number every heading `chapter-0`, `chapter-1`, ... and make it
/// focusable for chapter navigation.
pub fn assign_chapters(dom: &mut Dom) {
    let mut index = 0usize;
    for id in dom.elements(dom.document()) {
        let Some(el) = dom.element_mut(id) else {
            continue;
        };
        if el.heading_level().is_none() {
            continue;
        }
        el.set_attr("id", format!("chapter-{index}"));
        el.set_attr("tabindex", "-1");
        index += 1;
    }
}
