//! ARIA roles, external link attributes and image alt fallback.

use super::dom::{Dom, NodeId};

/// Implicit ARIA role for a tag, if it gets one.
fn role_for(name: &str) -> Option<&'static str> {
    match name {
        "blockquote" => Some("blockquote"),
        "pre" => Some("code"),
        "nav" => Some("navigation"),
        _ => None,
    }
}

/// Apply accessibility attributes to every element of `dom`.
///
/// Attributes the author already set are kept, except `rel` and
/// `target` on external links, which are always overwritten.
pub fn apply(dom: &mut Dom) {
    for id in dom.elements(dom.document()) {
        let Some(name) = dom.element(id).map(|el| el.name.clone()) else {
            continue;
        };
        match name.as_str() {
            "a" => external_link(dom, id),
            "img" => decorative_image(dom, id),
            _ => {
                if let (Some(role), Some(el)) = (role_for(&name), dom.element_mut(id)) {
                    el.set_attr_if_missing("role", role);
                }
            }
        }
    }
}

fn external_link(dom: &mut Dom, id: NodeId) {
    let is_external = dom
        .element(id)
        .and_then(|el| el.attr("href"))
        .is_some_and(|href| href.starts_with("http"));
    if !is_external {
        return;
    }

    let text = dom.text_content(id);
    let Some(el) = dom.element_mut(id) else {
        return;
    };
    let text = text.trim();
    let subject = if text.is_empty() {
        el.attr("href").unwrap_or_default().to_string()
    } else {
        text.to_string()
    };
    el.set_attr("rel", "noopener noreferrer");
    el.set_attr("target", "_blank");
    el.set_attr_if_missing("aria-label", format!("{subject} (opens in new tab)"));
}

fn decorative_image(dom: &mut Dom, id: NodeId) {
    if let Some(el) = dom.element_mut(id) {
        if !el.has_attr("alt") {
            el.set_attr("alt", "");
            el.set_attr_if_missing("role", "presentation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enhance(html: &str) -> String {
        let mut dom = Dom::parse(html).unwrap();
        apply(&mut dom);
        dom.serialize()
    }

    #[test]
    fn test_roles() {
        assert_eq!(
            enhance("<blockquote>\n<p>q</p>\n</blockquote>"),
            "<blockquote role=\"blockquote\">\n<p>q</p>\n</blockquote>"
        );
        assert_eq!(
            enhance("<pre><code>x</code></pre>"),
            "<pre role=\"code\"><code>x</code></pre>"
        );
        assert_eq!(enhance("<nav>n</nav>"), "<nav role=\"navigation\">n</nav>");
    }

    #[test]
    fn test_existing_role_kept() {
        assert_eq!(enhance("<nav role=\"menu\">n</nav>"), "<nav role=\"menu\">n</nav>");
    }

    #[test]
    fn test_external_link() {
        assert_eq!(
            enhance("<a href=\"https://example.com\">Example <em>site</em></a>"),
            "<a href=\"https://example.com\" rel=\"noopener noreferrer\" target=\"_blank\" aria-label=\"Example site (opens in new tab)\">Example <em>site</em></a>"
        );
    }

    #[test]
    fn test_external_link_label_escaped() {
        let html = enhance("<a href=\"http://x.com\">Tom &amp; \"Jerry\"</a>");
        assert!(
            html.contains("aria-label=\"Tom &amp; &quot;Jerry&quot; (opens in new tab)\""),
            "Got: {html}"
        );
    }

    #[test]
    fn test_external_link_without_text() {
        let html = enhance("<a href=\"http://x.com\"><img src=\"l.png\" alt=\"\"></a>");
        assert!(html.contains("aria-label=\"http://x.com (opens in new tab)\""), "Got: {html}");
    }

    #[test]
    fn test_relative_and_mailto_links_untouched() {
        let html = "<a href=\"/docs\">d</a><a href=\"mailto:a@b.c\">m</a><a>bare</a>";
        assert_eq!(enhance(html), html);
    }

    #[test]
    fn test_image_alt_fallback() {
        assert_eq!(
            enhance("<img src=\"x.png\">"),
            "<img src=\"x.png\" alt=\"\" role=\"presentation\">"
        );
    }

    #[test]
    fn test_image_with_alt_untouched() {
        let html = "<img src=\"x.png\" alt=\"A cat\">";
        assert_eq!(enhance(html), html);
    }
}
