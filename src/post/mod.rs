//! Post-processing of generated HTML.
//!
//! The HTML is parsed into a small arena tree, the enabled passes run in
//! a fixed order (heading ids, accessibility, sections) and the tree is
//! serialized again.

mod accessibility;
pub mod dom;
mod headings;
mod sections;

pub use dom::{Dom, Element, NodeData, NodeId};

use crate::{HeadingIds, Options, Result};

/// Options for [`enhance`]; the post-processing subset of [`Options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOptions {
    /// ARIA roles, external link attributes and image alt fallback.
    pub accessibility: bool,
    /// Wrap each heading and its following siblings in `<article>`.
    pub sections: bool,
    /// Heading id assignment.
    pub heading_ids: HeadingIds,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            accessibility: true,
            sections: false,
            heading_ids: HeadingIds::None,
        }
    }
}

impl From<&Options> for PostOptions {
    fn from(options: &Options) -> Self {
        Self {
            accessibility: options.accessibility,
            sections: options.sections,
            heading_ids: options.heading_ids,
        }
    }
}

impl PostOptions {
    /// Whether any pass is enabled.
    pub fn is_active(&self) -> bool {
        self.accessibility || self.sections || self.heading_ids != HeadingIds::None
    }
}

/// Run the enabled post-processing passes over `html`.
///
/// ```
/// use storymark::post::{enhance, PostOptions};
///
/// let html = enhance("<img src=\"a.png\">", &PostOptions::default()).unwrap();
/// assert_eq!(html, "<img src=\"a.png\" alt=\"\" role=\"presentation\">");
/// ```
pub fn enhance(html: &str, options: &PostOptions) -> Result<String> {
    if !options.is_active() {
        return Ok(html.to_string());
    }

    let mut dom = Dom::parse(html)?;
    log::debug!("post-processing {} nodes", dom.len());

    match options.heading_ids {
        HeadingIds::None => {}
        HeadingIds::Slug => headings::assign_slugs(&mut dom),
        HeadingIds::Chapter => headings::assign_chapters(&mut dom),
    }
    if options.accessibility {
        accessibility::apply(&mut dom);
    }
    if options.sections {
        sections::apply(&mut dom);
    }

    Ok(dom.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limits, Error};

    #[test]
    fn test_inactive_is_identity() {
        let options = PostOptions {
            accessibility: false,
            ..PostOptions::default()
        };
        let html = "<p>a<b</p>";
        assert_eq!(enhance(html, &options).unwrap(), html);
    }

    #[test]
    fn test_all_passes() {
        let options = PostOptions {
            accessibility: true,
            sections: true,
            heading_ids: HeadingIds::Slug,
        };
        let html = "<h1>Intro</h1>\n<blockquote>\n<p>q</p>\n</blockquote>\n";
        assert_eq!(
            enhance(html, &options).unwrap(),
            "<article><h1 id=\"intro\">Intro</h1>\n<blockquote role=\"blockquote\">\n<p>q</p>\n</blockquote>\n</article>"
        );
    }

    #[test]
    fn test_too_deep() {
        let html = "<div>".repeat(limits::MAX_TREE_DEPTH + 10);
        assert!(matches!(
            enhance(&html, &PostOptions::default()),
            Err(Error::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_from_options() {
        let options = Options {
            sections: true,
            heading_ids: HeadingIds::Chapter,
            ..Options::default()
        };
        let post = PostOptions::from(&options);
        assert!(post.accessibility);
        assert!(post.sections);
        assert_eq!(post.heading_ids, HeadingIds::Chapter);
    }
}
