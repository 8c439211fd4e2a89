use editor_html::sanitize::{ALLOWED_TAGS, ALLOWED_URL_SCHEMES};
use editor_html::{is_valid_url, sanitize_html, sanitize_paste, Clipboard, PasteOptions, Sanitizer};
use proptest::prelude::*;
use proptest::sample::select;
use scraper::{Html, Selector};

fn attribute() -> impl Strategy<Value = String> {
    (
        select(vec![
            "onclick", "onerror", "OnLoad", "onmouseover", "style", "STYLE",
            "href", "src", "class", "data-track", "title", "alt", "target",
        ]),
        "[a-z0-9:/(). ]{0,16}",
    )
        .prop_map(|(name, value)| format!(r#"{name}="{value}""#))
}

fn element() -> impl Strategy<Value = String> {
    (
        select(vec![
            "p", "a", "img", "span", "div", "iframe", "video", "source", "strong", "em",
            "h2", "li", "blockquote", "script", "style", "object", "embed", "font",
            "table", "button", "form", "input", "meta", "link",
        ]),
        prop::collection::vec(attribute(), 0..4),
        "[a-zA-Z0-9 &]{0,12}",
    )
        .prop_map(|(tag, attrs, text)| format!("<{tag} {}>{text}</{tag}>", attrs.join(" ")))
}

/// Nested markup, including the shapes the parser restructures on a second
/// read: blocks inside headings and paragraphs, leading newlines in `pre`
fn tree() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[a-zA-Z0-9 &]{0,12}",
        "\n{0,4}[a-z ]{0,8}".prop_map(|text| format!("<pre>{text}</pre>")),
        element(),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        (
            select(vec![
                "p", "h1", "h2", "div", "pre", "ul", "li", "a", "strong", "em", "blockquote",
                "span", "table", "font", "code",
            ]),
            prop::collection::vec(attribute(), 0..3),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, attrs, children)| format!("<{tag} {}>{}</{tag}>", attrs.join(" "), children.concat()))
    })
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![element(), tree()], 0..6).prop_map(|parts| parts.concat())
}

/// The scheme of a URL attribute value, if it has one the URL parser would accept
fn url_scheme(value: &str) -> Option<String> {
    let value = value.trim_matches(|c: char| c <= ' ');
    let (scheme, _) = value.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Parse gated output back and check every element against the allow-list
fn assert_allow_listed(html: &str) -> Result<(), TestCaseError> {
    let fragment = Html::parse_fragment(html);
    let any = Selector::parse("*").unwrap();
    for el in fragment.select(&any) {
        let name = el.value().name();
        prop_assert!(name == "html" || ALLOWED_TAGS.contains(&name), "tag <{}> in {:?}", name, html);
        for (attr, value) in el.value().attrs() {
            let attr = attr.to_ascii_lowercase();
            if attr == "href" || attr == "src" {
                if let Some(scheme) = url_scheme(value) {
                    prop_assert!(
                        ALLOWED_URL_SCHEMES.contains(&scheme.as_str()),
                        "{}={:?} in {:?}", attr, value, html
                    );
                }
            }
            prop_assert!(!attr.starts_with("on"), "event handler {} in {:?}", attr, html);
            prop_assert!(attr != "style", "style attribute in {:?}", html);
            prop_assert!(!attr.starts_with("data-"), "data attribute {} in {:?}", attr, html);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn script_never_survives(before in document(), after in document(), upper in any::<bool>()) {
        let script = if upper { "<SCRIPT>alert(1)</SCRIPT>" } else { "<script>alert(1)</script>" };
        let out = sanitize_html(&format!("{before}{script}{after}"));
        prop_assert!(!out.to_ascii_lowercase().contains("<script"));
    }

    #[test]
    fn output_is_allow_listed(doc in document()) {
        let out = sanitize_html(&doc);
        assert_allow_listed(&out)?;
    }

    #[test]
    fn sanitizing_is_idempotent(doc in document()) {
        let once = sanitize_html(&doc);
        let twice = sanitize_html(&once);
        prop_assert_eq!(once.as_str(), twice.as_str());
    }

    #[test]
    fn paste_without_preclean_is_still_safe(doc in document()) {
        // the gate alone must hold even if the paste normalization is skipped
        let sanitizer = Sanitizer::default();
        assert_allow_listed(&sanitizer.clean(&doc))?;
        let pasted = sanitize_paste(&sanitizer, &Clipboard::html(doc), &PasteOptions::default());
        assert_allow_listed(&pasted)?;
    }

    #[test]
    fn plain_text_paste_is_safe(text in "[a-zA-Z<>&\"'/ .\\n-]{0,80}") {
        let pasted = sanitize_paste(&Sanitizer::default(), &Clipboard::text(text), &PasteOptions::default());
        assert_allow_listed(&pasted)?;
    }

    #[test]
    fn script_schemes_rejected(
        leading_ws in "[ \\t\\n]{0,3}",
        payload in "[A-Za-z0-9_/?=&:%#.()-]{0,32}",
        scheme in select(vec!["javascript:", "JavaScript:", "vbscript:", "data:text/html,", "file:///"]),
    ) {
        let url = format!("{leading_ws}{scheme}{payload}");
        prop_assert!(!is_valid_url(&url));
    }

    #[test]
    fn web_urls_accepted(
        scheme in select(vec!["http", "https"]),
        host in "[a-z]{1,12}\\.(com|co\\.il|org)",
        path in "(/[a-z0-9-]{1,8}){0,3}",
    ) {
        let url = format!("{scheme}://{host}{path}");
        prop_assert!(is_valid_url(&url), "{}", url);
    }
}

#[test]
fn scheme_detection() {
    assert_eq!(url_scheme(" JavaScript:alert(1)").as_deref(), Some("javascript"));
    assert_eq!(url_scheme("/about:us"), None);
    assert_eq!(url_scheme("a b:c"), None);
    assert_eq!(url_scheme("page.html"), None);
}

#[test]
fn contact_urls_accepted() {
    assert!(is_valid_url("mailto:studio@example.co.il"));
    assert!(is_valid_url("tel:+972501234567"));
}

#[test]
fn realistic_document_round_trips() {
    let doc = concat!(
        r#"<h1 dir="rtl">בניית אתרים</h1>"#,
        r#"<p class="lead">אנחנו בונים <strong>אתרים</strong> ו<em>חנויות</em>.</p>"#,
        r#"<ul><li><a href="https://example.com/portfolio" target="_blank" rel="noopener noreferrer">תיק עבודות</a></li></ul>"#,
        r#"<blockquote>ציטוט</blockquote><pre><code>let x = 1;</code></pre><hr>"#,
        r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ" allowfullscreen=""></iframe>"#,
    );
    let once = sanitize_html(doc);
    // dir is not allow-listed, everything else is
    assert!(!once.contains("dir="));
    assert!(once.contains(r#"<p class="lead">"#));
    assert_eq!(sanitize_html(&once), once);
}
