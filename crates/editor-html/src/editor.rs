use std::ops::Range;
use std::sync::Arc;

use crate::link::{validate_media_url, validate_url, UrlError, VideoSource};
use crate::locale::Locale;
use crate::paste::{clipboard_to_html, Clipboard, PasteOptions};
use crate::sanitize::{escape_text, html_to_text, opening_tag_name, shared_sanitizer, tag_end, SanitizedHtml, Sanitizer};

/// Character offsets into the text of the document.
///
/// Markup is not counted and an entity such as `&amp;` is one character, so a
/// selection can never point inside a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn caret(at: usize) -> Self {
        Selection { start: at, end: at }
    }
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
    fn ordered(&self) -> (usize, usize) {
        (self.start.min(self.end), self.start.max(self.end))
    }
}

/// Formatting that may be stripped together with the selected text
const INLINE_TAGS: &[&str] = &["strong", "em", "b", "i", "u", "span", "a", "code"];
/// Blocks a block command replaces when the selection fills them
const TEXT_BLOCKS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];
/// Snippets starting with these go after, not into, the element the caret ends
const BLOCK_SNIPPETS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "ul", "ol", "hr", "iframe", "video",
];

fn entity_end(doc: &str, start: usize) -> usize {
    let rest = &doc[start + 1..];
    match rest.find(';') {
        Some(n) if n > 0 && n <= 32 && rest[..n].bytes().all(|b| b.is_ascii_alphanumeric() || b == b'#') => {
            start + n + 2
        },
        _ => start + 1,
    }
}

/// Move over one tag, entity or character; true if it was text
fn step(doc: &str, i: usize) -> (usize, bool) {
    match doc.as_bytes()[i] {
        b'<' => (tag_end(doc, i), false),
        b'&' => (entity_end(doc, i), true),
        _ => (i + doc[i..].chars().next().map_or(1, char::len_utf8), true),
    }
}

/// Text characters in `doc[..byte]`
fn text_offset(doc: &str, byte: usize) -> usize {
    let (mut i, mut count) = (0, 0);
    while i < byte.min(doc.len()) {
        let (next, is_text) = step(doc, i);
        count += usize::from(is_text);
        i = next;
    }
    count
}

fn text_len(doc: &str) -> usize {
    text_offset(doc, doc.len())
}

/// Where a text offset lands when markup sits right at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// before any tags
    Before,
    /// after closing tags, before opening ones
    AfterClosing,
    /// after all tags
    After,
}

fn text_to_byte(doc: &str, offset: usize, side: Side) -> usize {
    let (mut i, mut seen) = (0, 0);
    while i < doc.len() {
        if seen == offset {
            let skip = match side {
                Side::Before => false,
                Side::AfterClosing => doc[i..].starts_with("</"),
                Side::After => doc.as_bytes()[i] == b'<',
            };
            if !skip {
                return i;
            }
        }
        let (next, is_text) = step(doc, i);
        seen += usize::from(is_text);
        i = next;
    }
    doc.len()
}

/// Grow `range` over whole elements it exactly fills, while `keep` accepts their tag
fn expand(doc: &str, mut range: Range<usize>, keep: impl Fn(&str) -> bool) -> Range<usize> {
    while let Some(open) = doc[..range.start].rfind('<') {
        if tag_end(doc, open) != range.start {
            break;
        }
        let Some(name) = opening_tag_name(&doc[open..range.start]) else { break };
        let close = format!("</{name}>");
        if !keep(name) || !doc[range.end..].starts_with(&close) {
            break;
        }
        range = open..range.end + close.len();
    }
    range
}

fn is_block_snippet(html: &str) -> bool {
    opening_tag_name(html.trim_start()).is_some_and(|name| BLOCK_SNIPPETS.contains(&name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Link,
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Bold,
    Italic,
    Underline,
    Heading(u8),
    Paragraph,
    Quote,
    CodeBlock,
    BulletList,
    OrderedList,
    HorizontalRule,
    LineBreak,
    ClearFormatting,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("Rejected {:?} URL", .target)]
    RejectedUrl {
        target: Modal,
        #[source]
        source: UrlError,
    },
    #[error("{:?} insert while the {:?} dialog is open", .requested, .open)]
    ModalMismatch {
        open: Modal,
        requested: Modal,
    },
}

impl EditorError {
    /// The text shown to the user in an alert
    pub fn alert(&self, locale: Locale) -> String {
        match self {
            EditorError::RejectedUrl { source: UrlError::Empty, .. } => {
                locale.pick("יש להזין כתובת.", "Please enter a URL.").into()
            },
            EditorError::RejectedUrl { target: Modal::Link, .. } => locale.pick(
                "כתובת הקישור אינה תקינה. ניתן להשתמש רק בכתובות http‏, https‏, mailto או tel.",
                "Invalid link URL. Only http, https, mailto and tel addresses are allowed.",
            ).into(),
            EditorError::RejectedUrl { target: Modal::Image, .. } => locale.pick(
                "כתובת התמונה אינה תקינה. ניתן להשתמש רק בכתובות http או https.",
                "Invalid image URL. Only http and https addresses are allowed.",
            ).into(),
            EditorError::RejectedUrl { target: Modal::Video, .. } => locale.pick(
                "כתובת הווידאו אינה תקינה. ניתן להשתמש רק בכתובות http או https.",
                "Invalid video URL. Only http and https addresses are allowed.",
            ).into(),
            EditorError::ModalMismatch { .. } => locale.pick(
                "חלון הוספה אחר פתוח. יש לסגור אותו ולנסות שוב.",
                "Another insert dialog is open. Close it and try again.",
            ).into(),
        }
    }
}

/// One open editor: the document plus the transient selection and dialog state.
///
/// Every mutation re-runs the gate over the whole document.
pub struct EditorSession {
    sanitizer: Arc<Sanitizer>,
    paste_options: PasteOptions,
    content: SanitizedHtml,
    saved: SanitizedHtml,
    selection: Option<Selection>,
    // selection captured when the dialog opened
    modal: Option<(Modal, Option<Selection>)>,
}

impl EditorSession {
    pub fn new(initial: &str) -> Self {
        Self::with_options(shared_sanitizer(), PasteOptions::default(), initial)
    }

    pub fn with_options(sanitizer: Arc<Sanitizer>, paste_options: PasteOptions, initial: &str) -> Self {
        let content = sanitizer.clean(initial);
        EditorSession {
            sanitizer,
            paste_options,
            saved: content.clone(),
            content,
            selection: None,
            modal: None,
        }
    }

    pub fn content(&self) -> &SanitizedHtml {
        &self.content
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }
    /// Offsets past the end of the text are clamped to it
    pub fn select(&mut self, selection: Selection) {
        let len = text_len(&self.content);
        let (start, end) = selection.ordered();
        self.selection = Some(Selection { start: start.min(len), end: end.min(len) });
    }
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn modal(&self) -> Option<Modal> {
        self.modal.map(|(modal, _)| modal)
    }
    pub fn open_modal(&mut self, modal: Modal) {
        self.modal = Some((modal, self.selection));
    }
    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.content != self.saved
    }
    pub fn mark_saved(&mut self) {
        self.saved = self.content.clone();
    }

    /// Byte range of `selection` in the document. A caret lands inside the
    /// element it ends unless `block` content is going in.
    fn range(&self, selection: Option<Selection>, block: bool) -> Range<usize> {
        let doc: &str = &self.content;
        match selection {
            None => doc.len()..doc.len(),
            Some(caret) if caret.is_collapsed() => {
                let at = text_to_byte(doc, caret.start, if block { Side::AfterClosing } else { Side::Before });
                at..at
            },
            Some(selection) => {
                let (start, end) = selection.ordered();
                text_to_byte(doc, start, Side::After)..text_to_byte(doc, end, Side::Before)
            },
        }
    }

    fn commit(&mut self, raw: String, caret: usize) {
        let caret = text_offset(&raw, caret);
        self.content = self.sanitizer.clean(&raw);
        let caret = caret.min(text_len(&self.content));
        self.selection = Some(Selection::caret(caret));
    }

    fn replace(&mut self, range: Range<usize>, snippet: &str) {
        let mut raw = String::with_capacity(self.content.len() + snippet.len());
        raw.push_str(&self.content[..range.start]);
        raw.push_str(snippet);
        raw.push_str(&self.content[range.end..]);
        self.commit(raw, range.start + snippet.len());
    }

    /// The editing surface reported new content
    pub fn input(&mut self, html: &str) {
        let len = html.len();
        self.commit(html.to_owned(), len);
    }

    pub fn paste(&mut self, clipboard: &Clipboard) {
        let html = clipboard_to_html(clipboard, &self.paste_options);
        let range = self.range(self.selection, is_block_snippet(&html));
        debug!(bytes = html.len(), at = range.start, "paste");
        self.replace(range, &html);
    }

    /// Apply a formatting command to the selection. Returns false if nothing changed.
    pub fn exec(&mut self, command: Command) -> bool {
        let mut range = self.range(self.selection, command == Command::HorizontalRule);
        if !range.is_empty() {
            range = match command {
                Command::ClearFormatting => expand(&self.content, range, |tag| INLINE_TAGS.contains(&tag)),
                Command::Heading(_) | Command::Paragraph | Command::Quote | Command::CodeBlock
                | Command::BulletList | Command::OrderedList => expand(&self.content, range, |tag| {
                    INLINE_TAGS.contains(&tag) || TEXT_BLOCKS.contains(&tag)
                }),
                _ => range,
            };
        }
        let selected = self.content[range.clone()].to_owned();

        let snippet = match command {
            Command::HorizontalRule => format!("{selected}<hr>"),
            Command::LineBreak => format!("{selected}<br>"),
            _ if selected.is_empty() => return false,
            Command::Bold => format!("<strong>{selected}</strong>"),
            Command::Italic => format!("<em>{selected}</em>"),
            Command::Underline => format!("<u>{selected}</u>"),
            Command::Heading(level) => {
                let level = level.clamp(1, 6);
                format!("<h{level}>{}</h{level}>", html_to_text(&selected))
            },
            Command::Paragraph => format!("<p>{}</p>", html_to_text(&selected)),
            Command::Quote => format!("<blockquote>{selected}</blockquote>"),
            Command::CodeBlock => format!("<pre><code>{}</code></pre>", html_to_text(&selected)),
            Command::BulletList => format!("<ul><li>{selected}</li></ul>"),
            Command::OrderedList => format!("<ol><li>{selected}</li></ol>"),
            Command::ClearFormatting => html_to_text(&selected),
        };

        let before = self.content.clone();
        self.replace(range, &snippet);
        trace!(?command, "exec");
        self.content != before
    }

    /// An insert must come from the dialog that is open, if any
    fn check_modal(&self, requested: Modal) -> Result<(), EditorError> {
        match self.modal {
            Some((open, _)) if open != requested => Err(EditorError::ModalMismatch { open, requested }),
            _ => Ok(()),
        }
    }

    fn insertion_selection(&self) -> Option<Selection> {
        match self.modal {
            Some((_, saved)) => saved,
            None => self.selection,
        }
    }

    fn take_insert_range(&mut self, block: bool) -> Range<usize> {
        let range = self.range(self.insertion_selection(), block);
        self.modal = None;
        range
    }

    /// Insert a link at the saved selection. Empty `text` links the selected content,
    /// or shows the URL itself.
    pub fn insert_link(&mut self, url: &str, text: &str) -> Result<(), EditorError> {
        self.check_modal(Modal::Link)?;
        let url = validate_url(url).map_err(|source| {
            info!(url, error = %source, "rejected link url");
            EditorError::RejectedUrl { target: Modal::Link, source }
        })?;

        let selected = {
            let range = self.range(self.insertion_selection(), false);
            self.content[range].to_owned()
        };
        let label = if !text.trim().is_empty() {
            escape_text(text.trim())
        } else if !selected.trim().is_empty() {
            selected
        } else {
            escape_text(url.as_str())
        };
        let snippet = format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">{label}</a>"#,
            escape_text(url.as_str()),
        );

        let range = self.take_insert_range(false);
        self.replace(range, &snippet);
        Ok(())
    }

    pub fn insert_image(&mut self, url: &str, alt: &str) -> Result<(), EditorError> {
        self.check_modal(Modal::Image)?;
        let url = validate_media_url(url).map_err(|source| {
            info!(url, error = %source, "rejected image url");
            EditorError::RejectedUrl { target: Modal::Image, source }
        })?;
        let snippet = format!(r#"<img src="{}" alt="{}">"#, escape_text(url.as_str()), escape_text(alt.trim()));

        let range = self.take_insert_range(false);
        self.replace(range, &snippet);
        Ok(())
    }

    pub fn insert_video(&mut self, url: &str) -> Result<(), EditorError> {
        self.check_modal(Modal::Video)?;
        let url = validate_media_url(url).map_err(|source| {
            info!(url, error = %source, "rejected video url");
            EditorError::RejectedUrl { target: Modal::Video, source }
        })?;
        let snippet = VideoSource::from_url(&url).to_html();

        let range = self.take_insert_range(true);
        self.replace(range, &snippet);
        Ok(())
    }
}
