use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

pub const ALLOWED_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6",
    "ul", "ol", "li",
    "blockquote", "code", "pre",
    "a", "img", "video", "source", "iframe",
    "em", "strong", "b", "i", "u",
    "br", "hr", "span",
];

pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "href", "src", "alt", "title", "target", "rel",
    "controls", "class", "allowfullscreen", "type",
];

pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Dropped together with everything inside them, rather than unwrapped
pub const CLEAN_CONTENT_TAGS: &[&str] = &["script", "style", "object", "embed", "noscript", "template"];

/// The complete policy of the sanitization gate.
///
/// Attributes are global: any allowed attribute may appear on any allowed tag.
/// URL-bearing attributes (`href`, `src`) are additionally checked against
/// `url_schemes`; relative references pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    pub tags: HashSet<&'static str>,
    pub attributes: HashSet<&'static str>,
    pub url_schemes: HashSet<&'static str>,
    pub clean_content_tags: HashSet<&'static str>,
}

impl Default for AllowList {
    fn default() -> Self {
        AllowList {
            tags: ALLOWED_TAGS.iter().copied().collect(),
            attributes: ALLOWED_ATTRIBUTES.iter().copied().collect(),
            url_schemes: ALLOWED_URL_SCHEMES.iter().copied().collect(),
            clean_content_tags: CLEAN_CONTENT_TAGS.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Tag <{}> is both allowed and marked for content removal", .0)]
    ConflictingTag(&'static str),
    #[error("Attribute {:?} can never be allowed", .0)]
    ForbiddenAttribute(&'static str),
}

impl AllowList {
    pub fn check(&self) -> Result<(), PolicyError> {
        if let Some(tag) = self.tags.intersection(&self.clean_content_tags).next() {
            return Err(PolicyError::ConflictingTag(*tag));
        }
        for attr in &self.attributes {
            let lower = attr.to_ascii_lowercase();
            if lower == "style" || lower.starts_with("on") || lower.starts_with("data-") {
                return Err(PolicyError::ForbiddenAttribute(*attr));
            }
        }
        Ok(())
    }
}

/// HTML that has been through the gate.
///
/// Only [`Sanitizer::clean`] (and [`SanitizedHtml::empty`]) produce one, so holding a
/// `SanitizedHtml` means the allow-list invariants hold. Deserializing re-runs the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SanitizedHtml(String);

impl SanitizedHtml {
    pub fn empty() -> Self {
        SanitizedHtml(String::new())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// True when nothing but whitespace is left
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::ops::Deref for SanitizedHtml {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for SanitizedHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for SanitizedHtml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl From<SanitizedHtml> for String {
    fn from(html: SanitizedHtml) -> String {
        html.0
    }
}
impl<'de> serde::Deserialize<'de> for SanitizedHtml {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: serde::Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Ok(sanitize_html(&raw))
    }
}

/// Re-parsing the serialized output can still restructure misnested markup
/// (a block inside a heading, for one), so cleaning repeats until the output
/// is stable, at most this many times
const MAX_PASSES: usize = 4;

pub struct Sanitizer {
    builder: ammonia::Builder<'static>,
}

impl Sanitizer {
    pub fn new(allow: &AllowList) -> Result<Self, PolicyError> {
        allow.check()?;
        Ok(Self::build(allow))
    }

    fn build(allow: &AllowList) -> Self {
        let mut builder = ammonia::Builder::empty();
        builder
            .tags(allow.tags.clone())
            .generic_attributes(allow.attributes.clone())
            .url_schemes(allow.url_schemes.clone())
            .clean_content_tags(allow.clean_content_tags.clone())
            .url_relative(ammonia::UrlRelative::PassThrough)
            // rel is user-controlled (and allow-listed), so ammonia must not rewrite it
            .link_rel(None)
            .strip_comments(true);
        Sanitizer { builder }
    }

    fn pass(&self, html: &str) -> String {
        trim_pre_newlines(self.builder.clean(html).to_string())
    }

    pub fn clean(&self, html: &str) -> SanitizedHtml {
        let mut cleaned = self.pass(html);
        for _ in 1..MAX_PASSES {
            let again = self.pass(&cleaned);
            if again == cleaned {
                break;
            }
            trace!(before = cleaned.len(), after = again.len(), "sanitizer output reshaped on re-parse");
            cleaned = again;
        }
        if cleaned.len() != html.len() {
            debug!(input = html.len(), output = cleaned.len(), "sanitizer removed content");
        }
        SanitizedHtml(cleaned)
    }
}

/// End of the tag starting at `start` (one past its `>`). Serialized attribute
/// values may contain a raw `>`, so quotes are honored.
pub(crate) fn tag_end(html: &str, start: usize) -> usize {
    let mut quote = None;
    for (i, b) in html.bytes().enumerate().skip(start + 1) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return i + 1,
            _ => (),
        }
    }
    html.len()
}

/// `Some("p")` for `<p class="x">`, `None` for closing tags and text
pub(crate) fn opening_tag_name(markup: &str) -> Option<&str> {
    let rest = markup.strip_prefix('<')?;
    let len = rest.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(rest.len());
    (len > 0).then(|| &rest[..len])
}

/// The parser drops one newline right after `<pre>` and the serializer does not
/// put it back, so every leading newline would vanish one pass at a time
fn trim_pre_newlines(html: String) -> String {
    if !html.contains("<pre") {
        return html;
    }
    let mut out = String::with_capacity(html.len());
    let mut i = 0;
    // text is escaped, so outside of tags every '<' starts one
    while let Some(found) = html[i..].find('<') {
        let start = i + found;
        let end = tag_end(&html, start);
        out.push_str(&html[i..end]);
        i = end;
        if opening_tag_name(&html[start..end]) == Some("pre") {
            i += html[i..].len() - html[i..].trim_start_matches('\n').len();
        }
    }
    out.push_str(&html[i..]);
    out
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::build(&AllowList::default())
    }
}

static DEFAULT_SANITIZER: OnceLock<Arc<Sanitizer>> = OnceLock::new();

/// The process-wide sanitizer built from the default allow-list
pub fn shared_sanitizer() -> Arc<Sanitizer> {
    Arc::clone(DEFAULT_SANITIZER.get_or_init(|| Arc::new(Sanitizer::default())))
}

/// Run `html` through the default allow-list
pub fn sanitize_html(html: &str) -> SanitizedHtml {
    DEFAULT_SANITIZER.get_or_init(|| Arc::new(Sanitizer::default())).clean(html)
}

/// Strip all markup, keeping text. The result is still escaped for use inside HTML.
pub fn html_to_text(html: &str) -> String {
    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(CLEAN_CONTENT_TAGS.iter().copied().collect());
    builder.clean(html).to_string()
}

/// Strip all markup and decode entities, for text shown outside of HTML
pub fn plain_text(html: &str) -> String {
    // only escaped text is left, parsing it back decodes the entities
    scraper::Html::parse_fragment(&html_to_text(html)).root_element().text().collect()
}

/// Escape text for element bodies and quoted attributes
/// (works in any space other than an unquoted attribute)
pub fn escape_text(text: &str) -> String {
    let mut ret_val = String::with_capacity(usize::max(4, text.len()));
    for c in text.chars() {
        let replacement = match c {
            '<' => "&lt;",
            '>' => "&gt;",
            '\"' => "&quot;",
            '\'' => "&#39;",
            '&' => "&amp;",
            // a browser would do this replacement anyway, the sanitizer might not
            '\0' => "&#65533;",
            _ => {
                ret_val.push(c);
                continue;
            }
        };
        ret_val.push_str(replacement);
    }
    ret_val
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_script_and_its_content() {
        assert_eq!(sanitize_html("<p>Hello</p><script>alert(1)</script>").as_str(), "<p>Hello</p>");
    }

    #[test]
    fn keeps_allowed_markup() {
        let html = r#"<h2>Title</h2><p>Some <strong>bold</strong> and <em>soft</em> text<br></p><ul><li>one</li></ul>"#;
        assert_eq!(sanitize_html(html).as_str(), html);
    }

    #[test]
    fn strips_disallowed_attributes() {
        let out = sanitize_html(r#"<p style="color:red" data-id="4" onclick="x()" class="lead">Hi</p>"#);
        assert_eq!(out.as_str(), r#"<p class="lead">Hi</p>"#);
    }

    #[test]
    fn unwraps_unknown_tags() {
        assert_eq!(sanitize_html("<div><p>kept</p></div>").as_str(), "<p>kept</p>");
    }

    #[test]
    fn removes_object_and_embed_with_content() {
        let out = sanitize_html(r#"<p>a</p><object data="x.swf"><p>fallback</p></object><embed src="y.swf">"#);
        assert_eq!(out.as_str(), "<p>a</p>");
    }

    #[test]
    fn removes_link_and_meta() {
        let out = sanitize_html(r#"<meta charset="utf-8"><link rel="stylesheet" href="a.css"><p>x</p>"#);
        assert_eq!(out.as_str(), "<p>x</p>");
    }

    #[test]
    fn drops_script_urls() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">click</a><img src="data:text/html,hi" alt="x">"#);
        assert!(!out.contains("javascript"));
        assert!(!out.contains("data:"));
        assert!(out.contains("click"));
    }

    #[test]
    fn keeps_allowed_urls() {
        let html = r#"<a href="https://example.com/a" target="_blank" rel="noopener noreferrer">x</a> <a href="mailto:hi@example.com">m</a> <a href="tel:+97231234567">t</a> <a href="/about">r</a>"#;
        assert_eq!(sanitize_html(html).as_str(), html);
    }

    #[test]
    fn keeps_video_markup() {
        let html = r#"<video controls=""><source src="https://cdn.example.com/a.mp4" type="video/mp4"></video>"#;
        assert_eq!(sanitize_html(html).as_str(), html);
    }

    #[test]
    fn strips_comments() {
        assert_eq!(sanitize_html("<p>a<!-- note --></p>").as_str(), "<p>a</p>");
    }

    #[test]
    fn empty_result_is_fine() {
        assert!(sanitize_html("<script>alert(1)</script>").is_blank());
    }

    #[test]
    fn policy_rejects_conflicts() {
        let mut allow = AllowList::default();
        allow.tags.insert("script");
        assert_eq!(Sanitizer::new(&allow).err(), Some(PolicyError::ConflictingTag("script")));

        let mut allow = AllowList::default();
        allow.attributes.insert("onload");
        assert_eq!(Sanitizer::new(&allow).err(), Some(PolicyError::ForbiddenAttribute("onload")));

        assert!(Sanitizer::new(&AllowList::default()).is_ok());
    }

    #[test]
    fn narrower_policy() {
        let mut allow = AllowList::default();
        allow.tags.remove("iframe");
        let sanitizer = Sanitizer::new(&allow).unwrap();
        let out = sanitizer.clean(r#"<p>x</p><iframe src="https://www.youtube.com/embed/abc"></iframe>"#);
        assert_eq!(out.as_str(), "<p>x</p>");
    }

    #[test]
    fn deserialize_runs_gate() {
        let html: SanitizedHtml = serde_json::from_str(r#""<p onclick=\"x()\">hi</p>""#).unwrap();
        assert_eq!(html.as_str(), "<p>hi</p>");
        assert_eq!(serde_json::to_string(&html).unwrap(), r#""<p>hi</p>""#);
    }

    #[test]
    fn text_helpers() {
        assert_eq!(escape_text(r#"<a href="x">Tom & 'Jerry'"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;");
        assert_eq!(html_to_text("<h1>Title</h1><p>Body <b>text</b></p><script>bad()</script>"), "TitleBody text");
        assert_eq!(html_to_text("<p>Tom &amp; Jerry</p>"), "Tom &amp; Jerry");
        assert_eq!(plain_text("<p>Tom &amp; Jerry &lt;3</p><style>p{}</style>"), "Tom & Jerry <3");
    }

    #[test]
    fn misnested_heading_settles() {
        let once = sanitize_html("<h1><div><h2>x</h2></div></h1>");
        assert_eq!(once.as_str(), "<h1></h1><h2>x</h2>");
        assert_eq!(sanitize_html(&once), once);
    }

    #[test]
    fn pre_leading_newlines_settle() {
        for html in ["<pre>\n\nx</pre>", "<pre>\n\n\n\n\nx</pre>", "<pre class=\"a>b\">\n\ny\n</pre>"] {
            let once = sanitize_html(html);
            assert_eq!(sanitize_html(&once), once, "{html:?}");
        }
        assert_eq!(sanitize_html("<pre>\n\nx</pre>").as_str(), "<pre>x</pre>");
        assert!(sanitize_html("<pre class=\"a>b\">\n\ny\n</pre>").ends_with(">y\n</pre>"));
    }

    #[test]
    fn markup_helpers() {
        let html = r#"<a title="1 > 0" href="/x">y</a>"#;
        assert_eq!(tag_end(html, 0), html.find('y').unwrap());
        assert_eq!(opening_tag_name(html), Some("a"));
        assert_eq!(opening_tag_name("</a>"), None);
        assert_eq!(opening_tag_name("text"), None);
    }
}
