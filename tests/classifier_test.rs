//! Property tests for content classification

use ayanfe_core::classifier::ContentClassifier;
use ayanfe_core::models::ContentKind;
use proptest::prelude::*;

fn classifier() -> ContentClassifier {
    ContentClassifier::new().unwrap()
}

proptest! {
    #[test]
    fn test_classify_never_panics(content in any::<String>()) {
        let parsed = classifier().classify(&content);
        if matches!(parsed.kind, ContentKind::Text | ContentKind::Html) {
            prop_assert_eq!(parsed.content, content);
        }
    }

    #[test]
    fn test_short_plain_sentences_are_text(content in "[a-zA-Z0-9 ,.!?]{0,200}") {
        let parsed = classifier().classify(&content);
        prop_assert_eq!(parsed.kind, ContentKind::Text);
        prop_assert!(parsed.metadata.is_none());
    }

    #[test]
    fn test_classification_is_deterministic(content in ".{0,300}") {
        let classifier = classifier();
        prop_assert_eq!(classifier.classify(&content), classifier.classify(&content));
    }

    #[test]
    fn test_audio_uri_extracted_exactly(
        prefix in "[a-z ]{0,20}",
        payload in "[A-Za-z0-9+/]{1,64}={0,2}",
    ) {
        let uri = format!("data:audio/mpeg;base64,{payload}");
        let content = format!("{prefix}{uri} now");
        let parsed = classifier().classify(&content);
        prop_assert_eq!(parsed.kind, ContentKind::Audio);
        prop_assert_eq!(parsed.content, uri);
    }

    #[test]
    fn test_markdown_image_alt_and_url(alt in "[a-z ]{0,20}", path in "[a-z0-9]{1,20}") {
        let url = format!("https://img.example/{path}.png");
        let parsed = classifier().classify(&format!("![{alt}]({url})"));
        prop_assert_eq!(parsed.kind, ContentKind::Image);
        prop_assert_eq!(parsed.content, url);
        prop_assert_eq!(parsed.metadata.and_then(|m| m.alt), Some(alt));
    }
}

#[test]
fn test_parsed_content_json_shape() {
    let parsed = classifier().classify(r#"{"videoUrl":"https://v.example/a.mp4","videoEmbed":1,"title":"Demo"}"#);
    let json = serde_json::to_value(&parsed).unwrap();

    assert_eq!(json["type"], "video");
    assert_eq!(json["content"], "https://v.example/a.mp4");
    assert_eq!(json["metadata"]["isEmbedded"], true);
    assert_eq!(json["metadata"]["title"], "Demo");
    assert!(json["metadata"].get("artist").is_none());
}

#[test]
fn test_text_has_no_metadata_key() {
    let json = serde_json::to_value(classifier().classify("hi")).unwrap();
    assert_eq!(json, serde_json::json!({"type": "text", "content": "hi"}));
}
