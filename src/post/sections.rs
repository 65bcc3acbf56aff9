//! Flat `<article>` sectioning.
//!
//! Each heading and the siblings after it, up to the next heading of any
//! level, are moved into one `<article>`. Articles never nest by heading
//! level. Siblings before the first heading stay where they are.

use super::dom::{Dom, Element, NodeData, NodeId};

/// Wrap heading runs under every parent that has heading children.
pub fn apply(dom: &mut Dom) {
    let mut parents = vec![dom.document()];
    parents.extend(dom.elements(dom.document()));

    for parent in parents {
        let has_heading = dom.children(parent).iter().any(|&c| is_heading(dom, c));
        if has_heading {
            wrap_children(dom, parent);
        }
    }
}

fn is_heading(dom: &Dom, id: NodeId) -> bool {
    dom.element(id).is_some_and(|el| el.heading_level().is_some())
}

fn wrap_children(dom: &mut Dom, parent: NodeId) {
    let children = dom.children(parent).to_vec();
    let mut regrouped = Vec::with_capacity(children.len());
    let mut article: Option<NodeId> = None;

    for child in children {
        if is_heading(dom, child) {
            let id = dom.create(NodeData::Element(Element::new("article")));
            regrouped.push(id);
            article = Some(id);
        }
        match article {
            Some(article) => dom.append(article, child),
            None => regrouped.push(child),
        }
    }

    dom.set_children(parent, regrouped);
}
