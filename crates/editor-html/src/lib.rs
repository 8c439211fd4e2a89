
#[macro_use]
extern crate tracing;

pub mod editor;
pub mod link;
pub mod locale;
pub mod paste;
pub mod record;
pub mod sanitize;

pub use editor::{Command, EditorError, EditorSession, Modal, Selection};
pub use link::{is_valid_url, validate_media_url, validate_url, UrlError, VideoSource};
pub use locale::Locale;
pub use paste::{clipboard_to_html, preclean_html, structure_plain_text, Clipboard, PasteOptions};
pub use record::{ContentKind, ContentRecord};
pub use sanitize::{sanitize_html, AllowList, PolicyError, SanitizedHtml, Sanitizer};

/// Clipboard in, gated HTML out: pre-clean or structure, then sanitize
pub fn sanitize_paste(sanitizer: &Sanitizer, clipboard: &Clipboard, options: &PasteOptions) -> SanitizedHtml {
    sanitizer.clean(&clipboard_to_html(clipboard, options))
}
