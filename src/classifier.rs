//! Message content classification.
//!
//! Chat messages are stored as opaque strings, but third-party API replies are
//! embedded into them as JSON blobs, base64 data URIs, markdown images or raw
//! media markup. [`ContentClassifier`] decides how a client should render a
//! message. Rules are evaluated in order and the first match wins.

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::models::{ContentKind, ContentMetadata, ParsedContent};

/// Default length above which plain text is rendered as markdown
pub const DEFAULT_MARKDOWN_THRESHOLD: usize = 200;

const DEFAULT_AUDIO_TITLE: &str = "Audio";
const DEFAULT_AUDIO_ARTIST: &str = "Unknown Artist";
const DEFAULT_VIDEO_TITLE: &str = "Video";
const DEFAULT_VIDEO_SOURCE: &str = "Unknown Source";

/// Classification rules, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Audio data URI or JSON `audioData`
    Audio,
    /// Video data URI or JSON `videoData` / `videoUrl`
    Video,
    /// Markdown image or image data URI
    Image,
    /// Raw `<audio` / `<video` markup
    Html,
    /// Multi-line, emphasised, headed or long text
    Markdown,
}

type Extractor = fn(&ContentClassifier, &Payload<'_>) -> Option<ParsedContent>;

const RULES: [(Rule, Extractor); 5] = [
    (Rule::Audio, ContentClassifier::match_audio),
    (Rule::Video, ContentClassifier::match_video),
    (Rule::Image, ContentClassifier::match_image),
    (Rule::Html, ContentClassifier::match_html),
    (Rule::Markdown, ContentClassifier::match_markdown),
];

/// Raw content plus its JSON object form, parsed at most once
struct Payload<'a> {
    raw: &'a str,
    json: Option<Map<String, Value>>,
}

impl<'a> Payload<'a> {
    fn new(raw: &'a str) -> Self {
        let json = if raw.trim_start().starts_with('{') {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Some(map),
                Ok(_) => None,
                Err(e) => {
                    trace!(error = %e, "content looks like JSON but does not parse");
                    None
                },
            }
        } else {
            None
        };

        Self { raw, json }
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.json.as_ref().and_then(|map| map.get(key))
    }

    /// Non-empty string field
    fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    fn str_or(&self, key: &str, default: &str) -> String {
        self.str_field(key).unwrap_or(default).to_string()
    }

    fn truthy(&self, key: &str) -> bool {
        self.field(key).is_some_and(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Maps raw message strings to [`ParsedContent`]
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    markdown_threshold: usize,
    audio_uri: Regex,
    video_uri: Regex,
    image_uri: Regex,
    markdown_image: Regex,
}

impl ContentClassifier {
    /// Create a classifier with the default markdown length threshold
    pub fn new() -> Result<Self> {
        Self::with_markdown_threshold(DEFAULT_MARKDOWN_THRESHOLD)
    }

    /// Create a classifier that treats text longer than `threshold` characters as markdown
    pub fn with_markdown_threshold(threshold: usize) -> Result<Self> {
        let audio_uri = Regex::new(r"data:audio/[\w.+-]+;base64,[A-Za-z0-9+/=]+")
            .map_err(|e| anyhow::anyhow!("Failed to compile audio URI regex: {e}"))?;
        let video_uri = Regex::new(r"data:video/[\w.+-]+;base64,[A-Za-z0-9+/=]+")
            .map_err(|e| anyhow::anyhow!("Failed to compile video URI regex: {e}"))?;
        let image_uri = Regex::new(r"data:image/[\w.+-]+;base64,[A-Za-z0-9+/=]+")
            .map_err(|e| anyhow::anyhow!("Failed to compile image URI regex: {e}"))?;
        let markdown_image = Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)")
            .map_err(|e| anyhow::anyhow!("Failed to compile markdown image regex: {e}"))?;

        Ok(Self {
            markdown_threshold: threshold,
            audio_uri,
            video_uri,
            image_uri,
            markdown_image,
        })
    }

    /// Classify a message. Never fails: unmatched content is plain text.
    #[must_use]
    pub fn classify(&self, content: &str) -> ParsedContent {
        let payload = Payload::new(content);

        RULES
            .iter()
            .find_map(|(_, extract)| extract(self, &payload))
            .unwrap_or_else(|| ParsedContent::plain(ContentKind::Text, content))
    }

    /// Evaluate a single rule in isolation
    #[must_use]
    pub fn apply_rule(&self, rule: Rule, content: &str) -> Option<ParsedContent> {
        let payload = Payload::new(content);

        RULES
            .iter()
            .find(|(r, _)| *r == rule)
            .and_then(|(_, extract)| extract(self, &payload))
    }

    fn match_audio(&self, payload: &Payload<'_>) -> Option<ParsedContent> {
        if let Some(audio) = payload.str_field("audioData") {
            let metadata = ContentMetadata {
                title: Some(payload.str_or("title", DEFAULT_AUDIO_TITLE)),
                artist: Some(payload.str_or("artist", DEFAULT_AUDIO_ARTIST)),
                ..ContentMetadata::default()
            };
            return Some(ParsedContent::with_metadata(ContentKind::Audio, audio, metadata));
        }

        self.audio_uri
            .find(payload.raw)
            .map(|m| ParsedContent::plain(ContentKind::Audio, m.as_str()))
    }

    fn match_video(&self, payload: &Payload<'_>) -> Option<ParsedContent> {
        let title = || payload.str_or("title", DEFAULT_VIDEO_TITLE);
        let source = || payload.str_or("source", DEFAULT_VIDEO_SOURCE);

        if let Some(video) = payload.str_field("videoData") {
            let metadata = ContentMetadata {
                title: Some(title()),
                source: Some(source()),
                ..ContentMetadata::default()
            };
            return Some(ParsedContent::with_metadata(ContentKind::Video, video, metadata));
        }

        if let Some(url) = payload.str_field("videoUrl") {
            let metadata = ContentMetadata {
                title: Some(title()),
                source: Some(source()),
                query: payload.str_field("query").map(ToString::to_string),
                ..ContentMetadata::default()
            };

            if payload.truthy("videoEmbed") {
                let metadata = ContentMetadata {
                    is_embedded: Some(true),
                    ..metadata
                };
                return Some(ParsedContent::with_metadata(ContentKind::Video, url, metadata));
            }

            // Untrusted direct links are shown as a caption, not a player
            let caption = format!(
                "🎬 **{}** ({})\n\n[Watch video]({url})\n\n{url}",
                metadata.title.as_deref().unwrap_or(DEFAULT_VIDEO_TITLE),
                metadata.source.as_deref().unwrap_or(DEFAULT_VIDEO_SOURCE),
            );
            return Some(ParsedContent::with_metadata(ContentKind::Markdown, caption, metadata));
        }

        self.video_uri
            .find(payload.raw)
            .map(|m| ParsedContent::plain(ContentKind::Video, m.as_str()))
    }

    fn match_image(&self, payload: &Payload<'_>) -> Option<ParsedContent> {
        if let Some(caps) = self.markdown_image.captures(payload.raw) {
            let alt = caps.get(1).map_or("", |m| m.as_str());
            let url = caps.get(2).map_or("", |m| m.as_str());
            let metadata = ContentMetadata {
                alt: Some(alt.to_string()),
                ..ContentMetadata::default()
            };
            return Some(ParsedContent::with_metadata(ContentKind::Image, url, metadata));
        }

        self.image_uri
            .find(payload.raw)
            .map(|m| ParsedContent::plain(ContentKind::Image, m.as_str()))
    }

    fn match_html(&self, payload: &Payload<'_>) -> Option<ParsedContent> {
        (payload.raw.contains("<audio") || payload.raw.contains("<video"))
            .then(|| ParsedContent::plain(ContentKind::Html, payload.raw))
    }

    fn match_markdown(&self, payload: &Payload<'_>) -> Option<ParsedContent> {
        let raw = payload.raw;
        let looks_like_markdown = raw.contains('\n')
            || raw.contains("**")
            || raw.contains('#')
            || raw.chars().count() > self.markdown_threshold;

        looks_like_markdown.then(|| ParsedContent::plain(ContentKind::Markdown, raw))
    }
}
