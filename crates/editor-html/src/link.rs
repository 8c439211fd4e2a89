use url::Url;

use crate::sanitize::escape_text;

/// Schemes a user may type into the link dialog
pub const LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];
/// Schemes allowed for images and videos
pub const MEDIA_SCHEMES: &[&str] = &["http", "https"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,
    #[error("Malformed URL {:?}: {}", .0, .1)]
    Malformed(String, url::ParseError),
    #[error("URL {:?} is missing a target", .0)]
    MissingTarget(String),
    #[error("Scheme {:?} is not allowed", .0)]
    SchemeNotAllowed(String),
}

fn validate_with(input: &str, schemes: &[&str]) -> Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Empty);
    }
    let url = Url::parse(input).map_err(|e| UrlError::Malformed(input.into(), e))?;
    if !schemes.contains(&url.scheme()) {
        return Err(UrlError::SchemeNotAllowed(url.scheme().into()));
    }
    // http(s) always has a host after parsing; "mailto:" and "tel:" alone point nowhere
    if url.cannot_be_a_base() && url.path().trim().is_empty() {
        return Err(UrlError::MissingTarget(input.into()));
    }
    Ok(url)
}

/// Check a URL entered for a link. Only absolute http, https, mailto and tel URLs pass.
pub fn validate_url(input: &str) -> Result<Url, UrlError> {
    validate_with(input, LINK_SCHEMES)
}

pub fn is_valid_url(input: &str) -> bool {
    validate_url(input).is_ok()
}

/// Check a URL entered for an image or a video
pub fn validate_media_url(input: &str) -> Result<Url, UrlError> {
    validate_with(input, MEDIA_SCHEMES)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    YouTube(String),
    Vimeo(String),
    File { url: Url, mime: Option<&'static str> },
}

fn is_youtube_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_vimeo_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

impl VideoSource {
    pub fn from_url(url: &Url) -> Self {
        let host = url.host_str().unwrap_or("").trim_start_matches("www.").trim_start_matches("m.");
        let mut segments = url.path_segments().map(|s| s.filter(|s| !s.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        match host {
            "youtube.com" | "youtube-nocookie.com" => {
                let id = match segments.as_slice() {
                    ["watch"] => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
                    ["embed" | "shorts" | "live", id, ..] => Some(id.to_string()),
                    _ => None,
                };
                if let Some(id) = id.filter(|id| is_youtube_id(id)) {
                    return VideoSource::YouTube(id);
                }
            },
            "youtu.be" => {
                if let Some(id) = segments.first().filter(|id| is_youtube_id(id)) {
                    return VideoSource::YouTube(id.to_string());
                }
            },
            "vimeo.com" | "player.vimeo.com" => {
                if segments.first() == Some(&"video") {
                    segments.remove(0);
                }
                if let Some(id) = segments.first().filter(|id| is_vimeo_id(id)) {
                    return VideoSource::Vimeo(id.to_string());
                }
            },
            _ => (),
        }

        VideoSource::File { url: url.clone(), mime: guess_video_mime(url.path()) }
    }

    pub fn embed_url(&self) -> String {
        match self {
            VideoSource::YouTube(id) => format!("https://www.youtube.com/embed/{id}"),
            VideoSource::Vimeo(id) => format!("https://player.vimeo.com/video/{id}"),
            VideoSource::File { url, .. } => url.to_string(),
        }
    }

    /// Markup in the exact form the gate emits, so inserting it is stable
    pub fn to_html(&self) -> String {
        let src = escape_text(&self.embed_url());
        match self {
            VideoSource::YouTube(_) | VideoSource::Vimeo(_) => {
                format!(r#"<iframe src="{src}" allowfullscreen=""></iframe>"#)
            },
            VideoSource::File { mime: Some(mime), .. } => {
                format!(r#"<video controls=""><source src="{src}" type="{mime}"></video>"#)
            },
            VideoSource::File { mime: None, .. } => {
                format!(r#"<video controls=""><source src="{src}"></video>"#)
            },
        }
    }
}

fn guess_video_mime(path: &str) -> Option<&'static str> {
    let (_, ext) = path.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogg" | "ogv" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}
