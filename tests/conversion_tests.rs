use storymark::{to_html, to_html_with_options, try_to_html, Error, Fallback, Options};

fn bare(input: &str) -> String {
    let options = Options {
        accessibility: false,
        ..Options::default()
    };
    to_html_with_options(input, &options)
}

#[test]
fn plain_text_is_one_paragraph() {
    let html = to_html("Just some words, nothing else.");
    assert_eq!(html, "<p>Just some words, nothing else.</p>");
    assert_eq!(html.matches("<p>").count(), 1);
}

#[test]
fn empty_and_blank_input() {
    assert_eq!(to_html(""), "");
    assert_eq!(to_html("\n\n\n"), "");
    assert_eq!(to_html(" \t "), "");
}

#[test]
fn ten_thousand_stars() {
    let input = "*".repeat(10_000);
    assert!(try_to_html(&input, &Options::default()).is_ok());
    assert_eq!(to_html(&input), "<hr>");
}

#[test]
fn ten_thousand_stars_inside_text() {
    let input = format!("a {} b", "*".repeat(10_000));
    let html = try_to_html(&input, &Options::default()).unwrap();
    assert!(html.starts_with("<p>a "), "Got: {}", &html[..20]);
    assert!(html.ends_with(" b</p>"));
}

#[test]
fn unclosed_link_destinations() {
    for unit in ["[a](", "[a](<", "[a](b \"", "![a](b (", "[a](b 'c' d"] {
        let input = unit.repeat(40_000);
        let html = try_to_html(&input, &Options::default()).unwrap();
        assert!(html.starts_with("<p>"), "unit {unit}");
        assert!(!html.contains("<a "), "unit {unit}");
        assert!(!html.contains("<img"), "unit {unit}");
    }
}

#[test]
fn unclosed_html_comments() {
    let input = format!("text {}", "<!--".repeat(50_000));
    let html = bare(&input);
    assert!(html.starts_with("<p>text <!--<!--"), "Got: {}", &html[..40]);
    assert!(html.ends_with("<!--</p>"));
}

#[test]
fn unclosed_emphasis_runs() {
    let input = "*a _b ".repeat(5_000);
    let html = try_to_html(&input, &Options::default()).unwrap();
    assert!(!html.contains("<em>"));
}

#[test]
fn reference_link_resolution() {
    let html = to_html("See [here][1].\n\n[1]: https://example.com \"Example\"");
    assert!(html.contains("href=\"https://example.com\""), "Got: {html}");
    assert!(html.contains("title=\"Example\""), "Got: {html}");
    assert!(!html.contains("[1]:"), "Got: {html}");
}

#[test]
fn reference_link_exact_output() {
    let html = bare("See [here][1].\n\n[1]: https://example.com \"Example\"");
    assert_eq!(
        html,
        "<p>See <a href=\"https://example.com\" title=\"Example\">here</a>.</p>"
    );
}

#[test]
fn reference_ids_are_case_insensitive() {
    let html = bare("[Foo][BAR]\n\n[bar]: /x");
    assert_eq!(html, "<p><a href=\"/x\">Foo</a></p>");
}

#[test]
fn reference_ids_resolve_escapes() {
    assert_eq!(
        bare("[x][a_b]\n\n[a\\_b]: http://ref"),
        "<p><a href=\"http://ref\">x</a></p>"
    );
    assert_eq!(
        bare("[x][a\\_b]\n\n[a_b]: /ref"),
        "<p><a href=\"/ref\">x</a></p>"
    );
}

#[test]
fn private_use_characters_pass_through() {
    assert_eq!(to_html("Icon \u{E005} here"), "<p>Icon \u{E005} here</p>");
    assert_eq!(bare("\u{E00F}\u{E000} \\*"), "<p>\u{E00F}\u{E000} *</p>");
}

#[test]
fn collapsed_reference_uses_text() {
    let html = bare("[Home][]\n\n[home]: <https://example.com/>");
    assert_eq!(html, "<p><a href=\"https://example.com/\">Home</a></p>");
}

#[test]
fn last_reference_definition_wins() {
    let html = bare("[a][x]\n\n[x]: /first\n[x]: /second");
    assert!(html.contains("href=\"/second\""), "Got: {html}");
}

#[test]
fn unresolved_reference_is_literal() {
    assert_eq!(bare("[text][nope]"), "<p>[text][nope]</p>");
}

#[test]
fn reference_definitions_disabled() {
    let options = Options {
        allow_link_refs: false,
        accessibility: false,
        ..Options::default()
    };
    let html = to_html_with_options("[a][x]\n\n[x]: /url", &options);
    assert!(!html.contains("<a"), "Got: {html}");
    assert!(html.contains("[x]: /url"), "Got: {html}");
}

#[test]
fn reference_definition_in_code_block_kept() {
    let html = bare("```\n[x]: /url\n```");
    assert!(html.contains("[x]: /url"), "Got: {html}");
}

#[test]
fn nested_list_two_levels() {
    let html = bare("- Parent\n  - Child one\n  - Child two\n- Sibling");
    assert_eq!(
        html,
        "<ul>\n<li>Parent\n<ul>\n<li>Child one</li>\n<li>Child two</li>\n</ul>\n</li>\n<li>Sibling</li>\n</ul>"
    );
}

#[test]
fn nested_list_three_levels() {
    let html = bare("- A\n  - B\n    - C\n- D");
    assert_eq!(
        html,
        "<ul>\n<li>A\n<ul>\n<li>B\n<ul>\n<li>C</li>\n</ul>\n</li>\n</ul>\n</li>\n<li>D</li>\n</ul>"
    );
}

#[test]
fn nested_list_closes_several_levels_at_once() {
    let html = bare("- A\n  - B\n    - C\n      - D\n- E");
    assert_eq!(html.matches("<ul>").count(), 4);
    assert_eq!(html.matches("</ul>").count(), 4);
    assert!(html.ends_with("</ul>\n</li>\n<li>E</li>\n</ul>"), "Got: {html}");
}

#[test]
fn ordered_inside_unordered() {
    let html = bare("- Steps\n  1. one\n  2. two");
    assert_eq!(
        html,
        "<ul>\n<li>Steps\n<ol>\n<li>one</li>\n<li>two</li>\n</ol>\n</li>\n</ul>"
    );
}

#[test]
fn code_block_escaping() {
    let html = to_html("```\n<script>alert(1)</script>\n```");
    assert!(html.contains("<pre"), "Got: {html}");
    assert!(html.contains("<code>&lt;script&gt;alert(1)&lt;/script&gt;"), "Got: {html}");
    assert!(!html.contains("<script>"), "Got: {html}");
    assert!(!html.contains("&amp;lt;"), "Got: {html}");
}

#[test]
fn code_block_exact_output() {
    assert_eq!(
        bare("```\n<script>alert(1)</script>\n```"),
        "<pre><code>&lt;script&gt;alert(1)&lt;/script&gt;\n</code></pre>"
    );
}

#[test]
fn code_content_not_inline_parsed() {
    let html = bare("```\n**not bold** [not](link)\n```");
    assert!(!html.contains("<strong>"));
    assert!(!html.contains("<a "));
}

#[test]
fn escapes_protect_syntax() {
    assert_eq!(bare(r"\# not a heading"), "<p># not a heading</p>");
    assert_eq!(bare(r"\- not a list"), "<p>- not a list</p>");
    assert_eq!(bare(r"\[not\](a link)"), "<p>[not](a link)</p>");
}

#[test]
fn crlf_input() {
    assert_eq!(bare("# Title\r\n\r\nBody\r\n"), "<h1>Title</h1>\n<p>Body</p>");
}

#[test]
fn conversion_is_deterministic() {
    let input = "# A\n\nText with <me@example.com> and [link](http://x.com).";
    assert_eq!(to_html(input), to_html(input));
}

#[test]
fn fallback_notice_on_failure() {
    let input = "<div>".repeat(1_000);
    let options = Options {
        fallback: Fallback::Notice,
        ..Options::default()
    };
    assert!(matches!(
        try_to_html(&input, &options),
        Err(Error::NestingTooDeep { .. })
    ));
    assert_eq!(
        to_html_with_options(&input, &options),
        "<p class=\"error\">Error rendering content. Please try again.</p>"
    );
}

#[test]
fn fallback_escaped_source_on_failure() {
    let input = "<div>".repeat(1_000);
    let html = to_html(&input);
    assert!(html.starts_with("<p>&lt;div&gt;"), "Got: {}", &html[..40]);
    assert!(html.ends_with("</p>"));
}
