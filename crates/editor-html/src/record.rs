use crate::editor::EditorSession;
use crate::locale::Locale;
use crate::sanitize::{plain_text, sanitize_html, SanitizedHtml};

pub const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    Post,
    PortfolioItem,
    ResearchPaper,
}

/// A stored piece of site content. `content` is overwritten wholesale on save.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContentRecord {
    pub id: Option<String>,
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    pub locale: Locale,
    pub content: SanitizedHtml,
    #[serde(default)]
    pub excerpt: String,
}

impl ContentRecord {
    pub fn new(kind: ContentKind, title: &str, locale: Locale) -> Self {
        ContentRecord {
            id: None,
            kind,
            title: title.trim().into(),
            slug: slugify(title),
            locale,
            content: SanitizedHtml::empty(),
            excerpt: String::new(),
        }
    }

    /// Take the editor's current document. No merging: whatever was stored is replaced.
    pub fn save_from(&mut self, editor: &mut EditorSession) {
        self.content = editor.content().clone();
        self.excerpt = excerpt(&self.content, EXCERPT_CHARS);
        editor.mark_saved();
        debug!(kind = ?self.kind, slug = %self.slug, bytes = self.content.len(), "saved content");
    }

    /// Stored values may predate the current allow-list, so they go through the gate again
    pub fn content_for_display(&self) -> SanitizedHtml {
        sanitize_html(&self.content)
    }

    pub fn open_editor(&self) -> EditorSession {
        EditorSession::new(&self.content)
    }
}

/// Lowercase, keep ASCII alphanumerics and Hebrew letters, collapse everything else to '-'
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        let keep = c.is_ascii_alphanumeric() || ('\u{05D0}'..='\u{05EA}').contains(&c);
        if keep {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Plain-text preview of at most `max_chars` chars, cut on a word boundary.
/// Entities are decoded, so the result must be escaped again if it goes into HTML.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    // block boundaries would otherwise glue words together
    let spaced = html.replace("</", " </").replace("<br", " <br");
    let text = plain_text(&spaced);
    let words: Vec<&str> = text.split_whitespace().collect();
    let text = words.join(" ");
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut out = String::new();
    for word in words {
        let needed = out.chars().count() + usize::from(!out.is_empty()) + word.chars().count();
        if needed > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        out = text.chars().take(max_chars).collect();
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("  Our Services & Pricing! "), "our-services-pricing");
        assert_eq!(slugify("בניית אתרים 2024"), "בניית-אתרים-2024");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn save_overwrites_content() {
        let mut record = ContentRecord::new(ContentKind::Post, "Launch", Locale::En);
        record.content = sanitize_html("<p>previous draft</p>");

        let mut editor = EditorSession::new("<p>ignored</p>");
        editor.input("<h2>Launch</h2><p>We are live.</p>");
        assert!(editor.is_dirty());

        record.save_from(&mut editor);
        assert_eq!(record.content.as_str(), "<h2>Launch</h2><p>We are live.</p>");
        assert_eq!(record.excerpt, "Launch We are live.");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn display_reruns_gate() {
        let stored = r#"{"id":"7","kind":"portfolio_item","title":"X","slug":"x","locale":"he","content":"<p onmouseover=\"x()\">hi</p>"}"#;
        let record: ContentRecord = serde_json::from_str(stored).unwrap();
        assert_eq!(record.kind, ContentKind::PortfolioItem);
        assert_eq!(record.content_for_display().as_str(), "<p>hi</p>");
        assert_eq!(record.open_editor().content().as_str(), "<p>hi</p>");
    }

    #[test]
    fn excerpt_cuts_on_words() {
        assert_eq!(excerpt("<p>one two three</p>", 9), "one two…");
        assert_eq!(excerpt("<p>short</p>", 160), "short");
        assert_eq!(excerpt("<p>Tom &amp; Jerry</p>", 20), "Tom & Jerry");
        assert_eq!(excerpt("<p>a&nbsp;&lt;b&gt;</p>", 20), "a <b>");
        assert_eq!(excerpt("<p>R&amp;D&amp;more</p>", 4), "R&D&…");
        assert_eq!(excerpt("<p>abcdefghij</p>", 4), "abcd…");
    }
}
