use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::analysis::client::{GeminiConfig, GeminiVisionClient};
use crate::analysis::extract::DEFAULT_EMOTION;

struct CannedClient {
    reply: Result<&'static str, ()>,
    calls: AtomicUsize,
}

impl CannedClient {
    fn ok(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl VisionClient for CannedClient {
    fn name(&self) -> &str {
        "canned"
    }

    async fn analyze(
        &self,
        _image: &ImageInput,
        instruction: &str,
    ) -> Result<String, AnalysisError> {
        assert!(instruction.contains("dominant_colors"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(str::to_string)
            .map_err(|()| AnalysisError::Request("connection refused".into()))
    }
}

fn image_file(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join(name);
    std::fs::write(&p, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
    (dir, p)
}

#[test]
fn base_fallback_is_valid_with_background_secondary() {
    let schema = fallback_schema("upload.png");
    assert!(validate_schema(&schema).is_valid);
    assert_eq!(schema.elements.secondary, vec!["background"]);
    assert_eq!(schema.scene.emotion, DEFAULT_EMOTION);
    assert_eq!(schema.composition.perspective, "medium");
}

#[test]
fn portrait_reference_shifts_perspective_and_subject() {
    let schema = fallback_schema("/uploads/Portrait_of_Ana.jpg");
    assert_eq!(schema.composition.perspective, "close-up");
    assert_eq!(schema.elements.primary, vec!["person", "subject"]);
}

#[test]
fn rules_compose_in_table_order() {
    let schema = fallback_schema("night-city-landscape.png");
    assert_eq!(schema.composition.perspective, "wide");
    assert_eq!(
        schema.scene.depth_layers,
        vec!["foreground", "midground", "background"]
    );
    assert_eq!(schema.scene.emotion, "mysterious");
    assert_eq!(schema.scene.lighting, "low-key");
    assert_eq!(schema.scene.colors[0], "#0b0c10");
    assert_eq!(schema.elements.primary, vec!["buildings", "subject"]);
    assert_eq!(schema.elements.secondary, vec!["background", "sky", "street"]);
    assert!(validate_schema(&schema).is_valid);
}

#[test]
fn product_reference_sets_commercial_style() {
    let schema = fallback_schema("product_shot.webp");
    assert_eq!(schema.composition.style, "commercial");
    assert_eq!(schema.composition.focus, "product");
}

#[test]
fn fallback_is_deterministic() {
    assert_eq!(fallback_schema("dark.png"), fallback_schema("dark.png"));
}

#[tokio::test]
async fn offline_mapper_falls_back() {
    let (_dir, p) = image_file("portrait.png");
    let mapper = Mapper::offline();
    assert!(mapper.client_name().is_none());
    assert!(matches!(
        mapper.analyze(&p).await,
        Err(AnalysisError::MissingCredentials(_))
    ));
    let schema = mapper.map(&p).await;
    assert_eq!(schema, fallback_schema(&p.to_string_lossy()));
}

#[tokio::test]
async fn service_answer_is_extracted() {
    let (_dir, p) = image_file("photo.png");
    let client = CannedClient::ok(
        "Here you go:\n```json\n{\"scene\": {\"emotion\": \"joyful\", \"colors\": [\"#ffcc00\"]}, \"composition\": {\"focus\": \"kite\"}}\n```",
    );
    let mapper = Mapper::new(Some(client.clone()));
    assert_eq!(mapper.client_name(), Some("canned"));

    let schema = mapper.map(&p).await;
    assert_eq!(schema.scene.emotion, "joyful");
    assert_eq!(schema.composition.focus, "kite");
    assert_eq!(schema.visual_analysis.dominant_colors, vec!["#ffcc00"]);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unusable_answers_fall_back() {
    let (_dir, p) = image_file("landscape.png");
    for reply in ["I cannot help with that.", "{\"unrelated\": true}"] {
        let mapper = Mapper::new(Some(CannedClient::ok(reply)));
        assert!(matches!(
            mapper.analyze(&p).await,
            Err(AnalysisError::Parse(_))
        ));
        assert_eq!(mapper.map(&p).await.composition.perspective, "wide");
    }
}

#[tokio::test]
async fn failing_service_falls_back() {
    let (_dir, p) = image_file("photo.png");
    let client = CannedClient::failing();
    let mapper = Mapper::new(Some(client.clone()));
    let schema = mapper.map(&p).await;
    assert!(validate_schema(&schema).is_valid);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_image_falls_back_without_calling_service() {
    let client = CannedClient::ok("{}");
    let mapper = Mapper::new(Some(client.clone()));
    let schema = mapper.map(Path::new("/nowhere/product.png")).await;
    assert_eq!(schema.composition.style, "commercial");
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_backend_yields_valid_schema() {
    let uri = {
        let server = wiremock::MockServer::start().await;
        server.uri()
    };
    let client = GeminiVisionClient::new(GeminiConfig {
        api_key: "test-key".to_string(),
        model: "gemini-2.5-flash".to_string(),
        base_url: uri,
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let (_dir, p) = image_file("photo.png");
    let schema = Mapper::new(Some(Arc::new(client))).map(&p).await;
    assert!(validate_schema(&schema).is_valid);
}

#[test]
fn client_construction_failures_are_split_by_kind() {
    let offline =
        Mapper::from_client::<GeminiVisionClient>(Err(AnalysisError::MissingCredentials(
            "GEMINI_API_KEY not set".into(),
        )))
        .unwrap();
    assert_eq!(offline.client_name(), None);

    let broken = Mapper::from_client::<GeminiVisionClient>(Err(AnalysisError::Request(
        "build HTTP client: no TLS backend".into(),
    )))
    .unwrap_err();
    assert!(matches!(broken, crate::StillmotionError::Analysis(msg) if msg.contains("TLS")));

    let client = GeminiVisionClient::new(GeminiConfig {
        api_key: "k".into(),
        model: "m".into(),
        base_url: "http://localhost".into(),
        timeout: Duration::from_secs(1),
    });
    let online = Mapper::from_client(client).unwrap();
    assert_eq!(online.client_name(), Some("gemini"));
}
