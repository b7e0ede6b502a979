//! Session-level tests driven by an in-memory transport.
//!
//! The fake transport counts calls and records every request, so each test
//! can assert both the state transitions and whether the network was touched.

use async_trait::async_trait;
use imgtrans::pipeline::llm::{ContentPart, MessageContent};
use imgtrans::prompts::EXTRACT_PROMPT;
use imgtrans::{
    ChatRequest, ChatTransport, ClientConfig, CredentialStore, ExportFormat, ImagePayload,
    ImgTransError, InferenceClient, MemoryCredentialStore, Phase, Session, TargetLanguage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const KEY: &str = "gsk_test_key";
const MIB: usize = 1024 * 1024;

#[derive(Default)]
struct FakeTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<(ChatRequest, String)>>,
    replies: Mutex<VecDeque<Result<String, ImgTransError>>>,
}

impl FakeTransport {
    fn with_replies(replies: Vec<Result<String, ImgTransError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn request(&self, i: usize) -> (ChatRequest, String) {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_chat(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<String, ImgTransError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), api_key.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ImgTransError::Http { status: 500 }))
    }
}

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn session_with(transport: Arc<FakeTransport>, key: Option<&str>) -> Session {
    session_with_config(transport, key, ClientConfig::default()).await
}

async fn session_with_config(
    transport: Arc<FakeTransport>,
    key: Option<&str>,
    config: ClientConfig,
) -> Session {
    init_tracing();
    let store = match key {
        Some(k) => MemoryCredentialStore::with_secret(k),
        None => MemoryCredentialStore::new(),
    };
    let client = InferenceClient::with_transport(config, transport);
    Session::new(Arc::new(store), client).await
}

fn image(len: usize) -> ImagePayload {
    ImagePayload::from_bytes("photo.jpg", vec![0xAB; len])
}

// ── Size ceiling ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_image_never_reaches_the_network() {
    let transport = FakeTransport::with_replies(vec![Ok("unused".into())]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;

    assert!(session.select_image(image(4 * MIB + 1)));
    assert!(!session.extract().await);

    assert_eq!(transport.calls(), 0);
    let state = session.state();
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.extracted_text(), "");
    assert!(
        state.error().unwrap().contains("exceeds"),
        "got: {:?}",
        state.error()
    );
}

#[tokio::test]
async fn image_at_the_ceiling_is_sent() {
    let transport = FakeTransport::with_replies(vec![Ok("text".into())]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;

    session.select_image(image(4 * MIB));
    assert!(session.extract().await);
    assert_eq!(transport.calls(), 1);
    assert_eq!(session.state().extracted_text(), "text");
}

// ── Full flow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_translate_export() {
    let transport =
        FakeTransport::with_replies(vec![Ok("Hello".into()), Ok("你好".into())]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;

    session.select_image(ImagePayload::from_bytes("hello.bin", b"raw".to_vec()));
    assert!(session.extract().await);
    session.select_target_language(TargetLanguage::Zh);
    assert!(session.translate().await);

    let state = session.state();
    assert_eq!(state.extracted_text(), "Hello");
    assert_eq!(state.translated_text(), "你好");
    assert!(state.error().is_none());
    assert!(!state.is_busy());

    // Extraction request: multimodal, cold, 1024 tokens.
    let (extract, key) = transport.request(0);
    assert_eq!(key, KEY);
    assert_eq!(extract.model, "llama-3.2-11b-vision-preview");
    assert_eq!(extract.temperature, 0.1);
    assert_eq!(extract.max_tokens, 1024);
    match &extract.messages[0].content {
        MessageContent::Parts(parts) => {
            assert_eq!(parts.len(), 2);
            assert_eq!(
                parts[0],
                ContentPart::Text {
                    text: EXTRACT_PROMPT.to_string()
                }
            );
            match &parts[1] {
                ContentPart::ImageUrl { image_url } => {
                    assert_eq!(image_url.url, "data:image/jpeg;base64,cmF3")
                }
                other => panic!("expected image part, got {other:?}"),
            }
        }
        other => panic!("expected multimodal content, got {other:?}"),
    }

    // Translation request: plain string, warmer, 2048 tokens.
    let (translate, _) = transport.request(1);
    assert_eq!(translate.temperature, 0.3);
    assert_eq!(translate.max_tokens, 2048);
    match &translate.messages[0].content {
        MessageContent::Text(prompt) => {
            assert!(prompt.contains("中文"));
            assert!(prompt.ends_with("Hello"));
        }
        other => panic!("expected text content, got {other:?}"),
    }

    let dir = tempfile::tempdir().unwrap();
    let path = session.export(ExportFormat::Txt, dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "translation.txt");
    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "原文：\nHello\n\n译文：\n你好"
    );
}

// ── Answer cleanup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn answers_are_stored_verbatim_by_default() {
    let fenced = "```python\nprint(1)\n```";
    let family = "家庭 👨\u{200D}👩\u{200D}👧";
    let transport = FakeTransport::with_replies(vec![Ok(fenced.into()), Ok(family.into())]);
    let mut session = session_with(transport, Some(KEY)).await;

    session.select_image(image(10));
    assert!(session.extract().await);
    assert_eq!(session.state().extracted_text(), fenced);

    session.select_target_language(TargetLanguage::Zh);
    assert!(session.translate().await);
    assert_eq!(session.state().translated_text(), family);
}

#[tokio::test]
async fn opt_in_cleanup_strips_fence_but_keeps_joiners() {
    let transport = FakeTransport::with_replies(vec![
        Ok("```\r\nHello\r\n```".into()),
        Ok("👨\u{200D}👩\u{200B}".into()),
    ]);
    let config = ClientConfig::builder().clean_output(true).build().unwrap();
    let mut session = session_with_config(transport, Some(KEY), config).await;

    session.select_image(image(10));
    assert!(session.extract().await);
    assert_eq!(session.state().extracted_text(), "Hello");

    session.select_target_language(TargetLanguage::Ko);
    assert!(session.translate().await);
    assert_eq!(session.state().translated_text(), "👨\u{200D}👩");
}

// ── Preconditions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credential_blocks_both_actions() {
    let transport = FakeTransport::with_replies(vec![]);
    let mut session = session_with(transport.clone(), None).await;
    assert!(session.state().error().is_some(), "startup should flag the missing key");

    session.select_image(image(10));
    assert!(!session.extract().await);
    assert!(session.state().error().unwrap().contains("API key"));
    assert!(!session.translate().await);
    assert_eq!(transport.calls(), 0);
    assert!(session.state().image().is_some());
}

#[tokio::test]
async fn trigger_gates_follow_credential_and_inputs() {
    let transport = FakeTransport::with_replies(vec![Ok("Hello".into())]);
    let store = Arc::new(MemoryCredentialStore::new());
    let client = InferenceClient::with_transport(ClientConfig::default(), transport);
    let mut session = Session::new(store, client).await;

    session.select_image(image(10));
    session.select_target_language(TargetLanguage::En);
    assert!(!session.can_extract().await, "no key yet");

    assert!(session.save_credential(KEY).await);
    assert!(session.can_extract().await);
    assert!(!session.can_translate().await, "nothing extracted yet");

    assert!(session.extract().await);
    assert!(session.can_translate().await);
}

#[tokio::test]
async fn translate_without_extracted_text_is_a_no_op() {
    let transport = FakeTransport::with_replies(vec![]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;
    session.select_target_language(TargetLanguage::En);

    assert!(!session.translate().await);
    assert_eq!(transport.calls(), 0);
    assert_eq!(session.state().translated_text(), "");
    assert!(session.state().error().unwrap().contains("extracted text"));
}

#[tokio::test]
async fn translate_without_language_is_a_no_op() {
    let transport = FakeTransport::with_replies(vec![Ok("Hello".into())]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;
    session.select_image(image(10));
    session.extract().await;

    assert!(!session.translate().await);
    assert_eq!(transport.calls(), 1);
    assert_eq!(session.state().extracted_text(), "Hello");
}

#[tokio::test]
async fn export_requires_translation() {
    let transport = FakeTransport::with_replies(vec![]);
    let mut session = session_with(transport, Some(KEY)).await;
    let dir = tempfile::tempdir().unwrap();

    assert!(session.export(ExportFormat::Md, dir.path()).await.is_none());
    assert!(session.state().error().unwrap().contains("translated text"));
    assert!(!dir.path().join("translation.md").exists());
}

// ── Failure asymmetry ────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_extraction_empties_text() {
    let transport = FakeTransport::with_replies(vec![
        Ok("first".into()),
        Err(ImgTransError::Http { status: 429 }),
    ]);
    let mut session = session_with(transport, Some(KEY)).await;
    session.select_image(image(10));
    assert!(session.extract().await);
    assert!(!session.extract().await);

    assert_eq!(session.state().extracted_text(), "");
    assert!(session.state().error().unwrap().contains("429"));
    assert!(!session.state().is_busy());
}

#[tokio::test]
async fn failed_translation_keeps_previous_translation() {
    let transport = FakeTransport::with_replies(vec![
        Ok("Hello".into()),
        Ok("Bonjour".into()),
        Err(ImgTransError::Parse {
            detail: "missing choices[0].message.content".into(),
        }),
    ]);
    let mut session = session_with(transport.clone(), Some(KEY)).await;
    session.select_image(image(10));
    session.extract().await;
    session.select_target_language(TargetLanguage::En);
    assert!(session.translate().await);
    assert!(!session.translate().await);

    assert_eq!(transport.calls(), 3);
    assert_eq!(session.state().translated_text(), "Bonjour");
    assert!(session.state().error().is_some());

    // A later success clears the banner.
    let transport = FakeTransport::with_replies(vec![Ok("Hello".into()), Ok("Hi".into())]);
    let mut session = session_with(transport, Some(KEY)).await;
    session.select_image(image(10));
    session.extract().await;
    session.select_target_language(TargetLanguage::En);
    session.translate().await;
    assert!(session.state().error().is_none());
}

// ── Image selection ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_image_clears_derived_text() {
    let transport = FakeTransport::with_replies(vec![Ok("Hello".into()), Ok("你好".into())]);
    let mut session = session_with(transport, Some(KEY)).await;
    session.select_image(image(10));
    session.extract().await;
    session.select_target_language(TargetLanguage::Zh);
    session.translate().await;

    session.select_image(image(20));
    assert_eq!(session.state().extracted_text(), "");
    assert_eq!(session.state().translated_text(), "");
    assert_eq!(session.state().target_language(), Some(TargetLanguage::Zh));
}

#[tokio::test]
async fn unreadable_file_reports_error() {
    let transport = FakeTransport::with_replies(vec![]);
    let mut session = session_with(transport, Some(KEY)).await;
    assert!(!session.select_image_file("/no/such/image.png").await);
    assert!(session.state().error().unwrap().contains("Failed to read image"));
    assert!(session.state().image().is_none());
}

// ── Credentials ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn saved_credential_is_used_by_next_request() {
    let transport = FakeTransport::with_replies(vec![Ok("ok".into())]);
    let store = Arc::new(MemoryCredentialStore::new());
    let client = InferenceClient::with_transport(ClientConfig::default(), transport.clone());
    init_tracing();
    let mut session = Session::new(store.clone(), client).await;

    assert!(session.save_credential("gsk_one").await);
    assert!(session.save_credential("gsk_two").await);
    assert_eq!(store.get().await.unwrap().as_deref(), Some("gsk_two"));

    session.select_image(image(10));
    assert!(session.extract().await);
    assert_eq!(transport.request(0).1, "gsk_two");
}

#[tokio::test]
async fn empty_credential_is_rejected() {
    let transport = FakeTransport::with_replies(vec![]);
    let mut session = session_with(transport, None).await;
    assert!(!session.save_credential("").await);
    assert!(session.credential().await.is_none());
}
