//! Standalone HTML document export.

use crate::escape;
use crate::meta;

/// Title used when none is given and the content has no `<h1>`.
pub const DEFAULT_TITLE: &str = "Exported Story";

const EXPORT_STYLE: &str = "\
        :root {
            --content-width: min(65ch, 100% - 2rem);
        }
        body {
            max-width: var(--content-width);
            margin: 2rem auto;
            padding: 0 1rem;
        }
        .preview-content {
            padding: 2rem;
            border-radius: 4px;
        }
";

/// Options for [`standalone_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Document title. Defaults to the text of the first `<h1>`.
    pub title: Option<String>,
    /// CSS inlined before the export styles.
    pub stylesheet: Option<String>,
    /// Value of the `lang` attribute.
    pub lang: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            stylesheet: None,
            lang: "en".to_string(),
        }
    }
}

/// Wrap converted HTML in a complete, self-contained document.
///
/// ```
/// use storymark::export::{standalone_document, ExportOptions};
///
/// let doc = standalone_document("<h1>My Story</h1>", &ExportOptions::default());
/// assert!(doc.starts_with("<!DOCTYPE html>"));
/// assert!(doc.contains("<title>My Story</title>"));
/// ```
pub fn standalone_document(html: &str, options: &ExportOptions) -> String {
    let title = match &options.title {
        Some(title) => title.clone(),
        None => meta::table_of_contents(html)
            .into_iter()
            .find(|entry| entry.level == 1 && !entry.text.is_empty())
            .map_or_else(|| DEFAULT_TITLE.to_string(), |entry| entry.text),
    };

    let mut out = String::with_capacity(html.len() + EXPORT_STYLE.len() + 512);
    out.push_str("<!DOCTYPE html>\n<html lang=\"");
    out.push_str(&escape::escape_full_to_string(&options.lang));
    out.push_str("\">\n<head>\n    <meta charset=\"UTF-8\">\n");
    out.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    out.push_str("    <title>");
    out.push_str(&escape::escape_full_to_string(&title));
    out.push_str("</title>\n    <style>\n");
    if let Some(css) = &options.stylesheet {
        // Keep inlined CSS from closing the style element early
        out.push_str(&css.replace("</style", "<\\/style"));
        out.push('\n');
    }
    out.push_str(EXPORT_STYLE);
    out.push_str("    </style>\n</head>\n<body>\n    <div class=\"preview-content\">\n");
    out.push_str(html);
    if !html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("    </div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_first_h1() {
        let doc = standalone_document(
            "<h2>Sub</h2><h1>Main &amp; More</h1><h1>Second</h1>",
            &ExportOptions::default(),
        );
        assert!(doc.contains("<title>Main &amp; More</title>"), "Got: {doc}");
    }

    #[test]
    fn test_default_title() {
        let doc = standalone_document("<p>No heading</p>", &ExportOptions::default());
        assert!(doc.contains("<title>Exported Story</title>"));
        assert!(doc.contains("<html lang=\"en\">"));
    }

    #[test]
    fn test_explicit_options() {
        let options = ExportOptions {
            title: Some("A <b> title".to_string()),
            stylesheet: Some("p { color: red; }".to_string()),
            lang: "de".to_string(),
        };
        let doc = standalone_document("<h1>Ignored</h1>", &options);
        assert!(doc.contains("<title>A &lt;b&gt; title</title>"));
        assert!(doc.contains("p { color: red; }"));
        assert!(doc.contains("<html lang=\"de\">"));
        assert!(doc.contains("max-width: var(--content-width);"));
    }

    #[test]
    fn test_content_embedded() {
        let doc = standalone_document("<p>body</p>\n", &ExportOptions::default());
        assert!(doc.contains("<div class=\"preview-content\">\n<p>body</p>\n    </div>"));
        assert!(doc.ends_with("</html>\n"));
    }

    #[test]
    fn test_stylesheet_cannot_close_style() {
        let options = ExportOptions {
            stylesheet: Some("</style><script>x</script>".to_string()),
            ..ExportOptions::default()
        };
        let doc = standalone_document("", &options);
        assert!(!doc.contains("</style><script>"));
    }
}
