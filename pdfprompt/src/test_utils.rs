//! Test helpers: an in-process generative client and test server setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use tempfile::TempDir;
use tokio::sync::Barrier;

use crate::config::Config;
use crate::gemini::{self, ContentPart, GeminiError, GenerativeClient, UploadedFile};
use crate::scratch::ScratchDir;
use crate::{AppState, build_router};

/// What the collaborator saw for one upload.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub mime_type: String,
    /// Contents of the scratch file at upload time
    pub document: Vec<u8>,
    pub scratch_path: PathBuf,
    pub parts: Vec<ContentPart>,
    /// Whether the scratch file was still on disk when generation was requested
    pub scratch_present_at_generation: bool,
}

enum Behavior {
    Reply(String),
    FailUpload(Box<dyn Fn() -> GeminiError + Send + Sync>),
    FailGeneration(Box<dyn Fn() -> GeminiError + Send + Sync>),
    /// Reply with the document text, after `Barrier` has been reached by every request
    Echo(Barrier),
}

/// A [`GenerativeClient`] that records every call and answers from a fixed script.
pub struct RecordingGenerator {
    behavior: Behavior,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingGenerator {
    fn with_behavior(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Always generate `text`.
    pub fn replying(text: &str) -> Arc<Self> {
        Self::with_behavior(Behavior::Reply(text.to_string()))
    }

    /// Fail every upload with the error produced by `make_error`.
    pub fn failing(make_error: impl Fn() -> GeminiError + Send + Sync + 'static) -> Arc<Self> {
        Self::with_behavior(Behavior::FailUpload(Box::new(make_error)))
    }

    /// Accept every upload, then fail generation with the error produced by `make_error`.
    pub fn failing_generation(make_error: impl Fn() -> GeminiError + Send + Sync + 'static) -> Arc<Self> {
        Self::with_behavior(Behavior::FailGeneration(Box::new(make_error)))
    }

    /// Generate the uploaded document's text, holding each upload until `requests` uploads are
    /// in flight at once.
    pub fn echoing_with_rendezvous(requests: usize) -> Arc<Self> {
        Self::with_behavior(Behavior::Echo(Barrier::new(requests)))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeClient for RecordingGenerator {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> gemini::Result<UploadedFile> {
        let document = tokio::fs::read(path).await.expect("scratch file should exist during upload");

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                model: String::new(),
                mime_type: mime_type.to_string(),
                document,
                scratch_path: path.to_path_buf(),
                parts: Vec::new(),
                scratch_present_at_generation: false,
            });
            calls.len() - 1
        };

        match &self.behavior {
            Behavior::FailUpload(make_error) => return Err(make_error()),
            Behavior::Echo(barrier) => {
                barrier.wait().await;
            }
            Behavior::Reply(_) | Behavior::FailGeneration(_) => {}
        }

        Ok(UploadedFile {
            name: format!("files/{index}"),
            uri: format!("https://generativelanguage.test/v1beta/files/{index}"),
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate_content(&self, model: &str, parts: Vec<ContentPart>) -> gemini::Result<String> {
        let index: usize = parts
            .iter()
            .find_map(|part| match part {
                ContentPart::File(file) => file.name.strip_prefix("files/")?.parse().ok(),
                ContentPart::Text(_) => None,
            })
            .expect("generation request should reference an uploaded file");

        let document = {
            let mut calls = self.calls.lock().unwrap();
            let call = &mut calls[index];
            call.model = model.to_string();
            call.parts = parts;
            call.scratch_present_at_generation = call.scratch_path.exists();
            call.document.clone()
        };

        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Echo(_) => Ok(String::from_utf8_lossy(&document).into_owned()),
            Behavior::FailGeneration(make_error) => Err(make_error()),
            Behavior::FailUpload(_) => unreachable!("generation is never requested after a failed upload"),
        }
    }
}

/// Scratch directory of a test app, removed with the handle.
pub struct TestScratch {
    _dir: TempDir,
    path: PathBuf,
}

impl TestScratch {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn create_test_config(scratch_dir: &Path) -> Config {
    let mut config = Config::default();
    config.gemini.api_key = Some("test-api-key".to_string());
    config.scratch_dir = scratch_dir.to_path_buf();
    config
}

pub async fn create_test_app(generator: Arc<dyn GenerativeClient>, configure: impl FnOnce(&mut Config)) -> (Router, TestScratch) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("uploads");

    let mut config = create_test_config(&path);
    configure(&mut config);

    let scratch = ScratchDir::create(&path).await.expect("Failed to create scratch dir");
    let state = AppState::builder().config(config).scratch(scratch).generator(generator).build();

    (build_router(state), TestScratch { _dir: dir, path })
}

pub async fn create_test_server_with(
    generator: Arc<dyn GenerativeClient>,
    configure: impl FnOnce(&mut Config),
) -> (TestServer, TestScratch) {
    let (router, scratch) = create_test_app(generator, configure).await;
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, scratch)
}

pub async fn create_test_server(generator: Arc<dyn GenerativeClient>) -> (TestServer, TestScratch) {
    create_test_server_with(generator, |_| {}).await
}

/// Number of files left in the scratch directory.
pub fn scratch_entries(scratch: &TestScratch) -> usize {
    std::fs::read_dir(scratch.path()).map(|entries| entries.count()).unwrap_or(0)
}

pub fn pdf_part(filename: &str, contents: &[u8]) -> Part {
    Part::bytes(contents.to_vec())
        .file_name(filename.to_string())
        .mime_type("application/pdf")
}

/// A complete upload form.
pub fn upload_form(filename: &str, contents: &[u8], prompt_text: &str) -> MultipartForm {
    MultipartForm::new()
        .add_part("pdfFile", pdf_part(filename, contents))
        .add_text("promptText", prompt_text.to_string())
}
