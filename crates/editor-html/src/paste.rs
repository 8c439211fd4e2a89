use lol_html::{doc_comments, element, rewrite_str, RewriteStrSettings};

use crate::sanitize::escape_text;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PasteOptions {
    /// Plain-text lines shorter than this (in chars) without closing punctuation become headings
    pub heading_max_chars: usize,
}

impl Default for PasteOptions {
    fn default() -> Self {
        PasteOptions { heading_max_chars: 60 }
    }
}

/// What the clipboard offered for one paste event
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Clipboard {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl Clipboard {
    pub fn html(html: impl Into<String>) -> Self {
        Clipboard { html: Some(html.into()), text: String::new() }
    }
    pub fn text(text: impl Into<String>) -> Self {
        Clipboard { html: None, text: text.into() }
    }
}

/// Turn clipboard contents into HTML ready for insertion.
///
/// The result is NOT safe yet; the caller runs it through the gate.
pub fn clipboard_to_html(clipboard: &Clipboard, options: &PasteOptions) -> String {
    match clipboard.html.as_deref() {
        Some(html) if !html.trim().is_empty() => preclean_html(html),
        _ => structure_plain_text(&clipboard.text, options),
    }
}

/// Normalize clipboard HTML (mostly from word processors) before it reaches the gate.
///
/// Drops comments and `meta`/`style`/`link` noise, and maps legacy `font`/`b`/`i`
/// to `span`/`strong`/`em` without their attributes. Script removal is left to the gate.
pub fn preclean_html(html: &str) -> String {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("meta, style, link", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("font, b, i", |el| {
                    let renamed = match el.tag_name().as_str() {
                        "font" => "span",
                        "b" => "strong",
                        _ => "em",
                    };
                    let names: Vec<String> = el.attributes().iter().map(|a| a.name()).collect();
                    for name in names {
                        el.remove_attribute(&name);
                    }
                    el.set_tag_name(renamed)?;
                    Ok(())
                }),
            ],
            document_content_handlers: vec![
                doc_comments!(|comment| {
                    comment.remove();
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    );

    match result {
        Ok(cleaned) => cleaned,
        Err(e) => {
            // best effort only, the gate still runs afterwards
            warn!("paste pre-clean failed, passing html through: {}", e);
            html.to_owned()
        }
    }
}

const SENTENCE_END: &[char] = &['.', '!', '?', ',', ';', ':', '…'];

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Blank,
    Bullet(&'a str),
    Numbered(&'a str),
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    let mut chars = line.chars();
    if let Some('-' | '*' | '•') = chars.next() {
        let rest = chars.as_str();
        if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
            return Line::Bullet(rest.trim());
        }
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
                return Line::Numbered(rest.trim());
            }
        }
    }
    Line::Text(line)
}

fn is_heading(line: &str, options: &PasteOptions) -> bool {
    line.chars().count() < options.heading_max_chars
        && !line.ends_with(SENTENCE_END)
        && line.chars().any(char::is_alphanumeric)
}

#[derive(Default)]
struct Structurer {
    out: String,
    paragraph: Vec<String>,
    list: Option<(&'static str, Vec<String>)>,
    seen_content: bool,
}

impl Structurer {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.out.push_str("<p>");
            self.out.push_str(&self.paragraph.join("<br>"));
            self.out.push_str("</p>");
            self.paragraph.clear();
        }
    }
    fn flush_list(&mut self) {
        if let Some((tag, items)) = self.list.take() {
            self.out.push_str(&format!("<{tag}>"));
            for item in items {
                self.out.push_str(&format!("<li>{item}</li>"));
            }
            self.out.push_str(&format!("</{tag}>"));
        }
    }
    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }
    fn list_item(&mut self, tag: &'static str, item: &str) {
        self.flush_paragraph();
        if !matches!(&self.list, Some((current, _)) if *current == tag) {
            self.flush_list();
            self.list = Some((tag, Vec::new()));
        }
        if let Some((_, items)) = &mut self.list {
            items.push(escape_text(item));
        }
    }
}

/// Guess structure for plain text pasted without HTML.
///
/// Short lines without closing punctuation become headings (`h1` for the very first
/// line, `h2` after that), bullet and numbered runs become lists, everything else is
/// grouped into paragraphs split on blank lines.
pub fn structure_plain_text(text: &str, options: &PasteOptions) -> String {
    let mut state = Structurer::default();

    for raw in text.lines() {
        let line = classify(raw);
        let blank = line == Line::Blank;
        match line {
            Line::Blank => state.flush(),
            Line::Bullet(item) => state.list_item("ul", item),
            Line::Numbered(item) => state.list_item("ol", item),
            Line::Text(line) if is_heading(line, options) => {
                state.flush();
                let level = if state.seen_content { 2 } else { 1 };
                state.out.push_str(&format!("<h{level}>{}</h{level}>", escape_text(line)));
            },
            Line::Text(line) => {
                state.flush_list();
                state.paragraph.push(escape_text(line));
            },
        }
        if !blank {
            state.seen_content = true;
        }
    }
    state.flush();

    trace!(lines = text.lines().count(), output = state.out.len(), "structured plain text paste");
    state.out
}
