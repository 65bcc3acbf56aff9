use proptest::prelude::*;
use storymark::meta::{slugify, word_count};
use storymark::{to_html, to_html_with_options, try_to_html, Fallback, Options};

proptest! {
    #[test]
    fn prop_to_html_never_panics(input in any::<String>()) {
        let _ = to_html(&input);
    }

    #[test]
    fn prop_printable_ascii_converts(input in "[ -~\n]{0,200}") {
        prop_assert!(try_to_html(&input, &Options::default()).is_ok());
    }

    #[test]
    fn prop_markdown_heavy_input_converts(input in "[-*_#>`\\[\\]()!<>~ \na-z0-9]{0,300}") {
        let options = Options {
            fallback: Fallback::Notice,
            ..Options::default()
        };
        let html = to_html_with_options(&input, &options);
        prop_assert_ne!(html, storymark::ERROR_NOTICE);
    }

    #[test]
    fn prop_plain_words_become_one_paragraph(
        words in prop::collection::vec("[a-z]{1,8}", 1..20)
    ) {
        let text = words.join(" ");
        prop_assert_eq!(to_html(&text), format!("<p>{text}</p>"));
        prop_assert_eq!(word_count(&text), words.len());
    }

    #[test]
    fn prop_conversion_is_deterministic(input in "[ -~\n]{0,120}") {
        prop_assert_eq!(to_html(&input), to_html(&input));
    }

    #[test]
    fn prop_slug_shape(text in any::<String>()) {
        let slug = slugify(&text);
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
        prop_assert!(slug.bytes().all(|b| b == b'-' || b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
}
