//! Stub collaborators shared by pipeline, batch and router tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::document::renderer::RenderError;
use crate::document::{DocumentRenderer, LayoutOptions};
use crate::forecast::pipeline::{ForecastPipeline, OutputStore};
use crate::llm_client::{LlmError, TextGenerator};
use crate::storage::{StorageError, Uploader};

pub const TWO_LIFE_PATHS: &str = "# Numerology Forecast\n\
Welcome, seeker.\n\
This month brings change.\n\
---\n\
### Life Path 1: The Pioneer\n\
**Career & Finances:**\n\
Start the project.\n\
### Life Path 2: The Diplomat\n\
Listen closely.\n";

/// Replays scripted responses, then falls back to `default`.
pub struct StubGenerator {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    default: String,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn always(text: &str) -> Self {
        Self::scripted_then(Vec::new(), text)
    }

    pub fn scripted(script: Vec<Result<String, LlmError>>) -> Self {
        Self::scripted_then(script, TWO_LIFE_PATHS)
    }

    pub fn scripted_then(script: Vec<Result<String, LlmError>>, default: &str) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default: default.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(next) => next,
            None => Ok(self.default.clone()),
        }
    }
}

/// Writes a file of a scripted byte length instead of launching a browser.
pub struct StubRenderer {
    sizes: Mutex<VecDeque<usize>>,
    default_size: usize,
    fail: bool,
    renders: AtomicUsize,
}

impl StubRenderer {
    pub fn fixed(size: usize) -> Arc<Self> {
        Self::sized(Vec::new(), size)
    }

    /// Uses `sizes` in order, then `default_size` for every later render.
    pub fn sized(sizes: Vec<usize>, default_size: usize) -> Arc<Self> {
        Arc::new(Self {
            sizes: Mutex::new(sizes.into()),
            default_size,
            fail: false,
            renders: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sizes: Mutex::new(VecDeque::new()),
            default_size: 0,
            fail: true,
            renders: AtomicUsize::new(0),
        })
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render_to_file(&self, _markup: &str, destination: &Path) -> Result<(), RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RenderError::Browser {
                status: "exit status: 1".to_string(),
                stderr: "stub failure".to_string(),
            });
        }
        let size = self
            .sizes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_size);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, vec![b'%'; size]).await?;
        Ok(())
    }

    async fn close(&self) {}
}

/// Records uploads and deletes; optionally fails every call.
pub struct RecordingUploader {
    fail: bool,
    uploads: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl RecordingUploader {
    pub fn working() -> Self {
        Self {
            fail: false,
            uploads: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn upload_attempts(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, _local_path: &Path, display_name: &str) -> Result<String, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::S3("bucket unreachable".to_string()));
        }
        Ok(format!("remote/{display_name}"))
    }

    async fn delete(&self, remote_id: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(remote_id.to_string());
        if self.fail {
            return Err(StorageError::S3("bucket unreachable".to_string()));
        }
        Ok(())
    }
}

pub fn pipeline_in(
    dir: &Path,
    generator: Arc<dyn TextGenerator>,
    renderer: Arc<dyn DocumentRenderer>,
    uploader: Option<Arc<RecordingUploader>>,
) -> ForecastPipeline {
    ForecastPipeline::new(
        generator,
        renderer,
        uploader.map(|u| u as Arc<dyn Uploader>),
        OutputStore::new(dir.to_path_buf(), "http://localhost:8080"),
        LayoutOptions::default(),
    )
}
