//! Forecast Pipeline: one forecast, end to end.
//!
//! Flow: normalize input → build prompt → generate → parse → assemble HTML →
//!       render PDF → optional upload → `ForecastResult`.
//!
//! Generator and render failures propagate to the caller. Upload and remote
//! delete are best-effort and only logged.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{assemble_document, CoverInfo, DocumentRenderer, LayoutOptions};
use crate::errors::AppError;
use crate::forecast::models::{ForecastInput, ForecastResult, FORECAST_TITLE};
use crate::forecast::parser::parse_forecast;
use crate::forecast::prompts::build_prompt;
use crate::llm_client::TextGenerator;
use crate::storage::Uploader;

/// Where generated files live and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
    public_base_url: String,
}

impl OutputStore {
    pub fn new(dir: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.pdf"))
    }

    pub fn url_for(&self, id: Uuid) -> String {
        format!("{}/static/{id}.pdf", self.public_base_url)
    }
}

pub struct ForecastPipeline {
    generator: Arc<dyn TextGenerator>,
    renderer: Arc<dyn DocumentRenderer>,
    uploader: Option<Arc<dyn Uploader>>,
    output: OutputStore,
    layout: LayoutOptions,
}

impl ForecastPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn DocumentRenderer>,
        uploader: Option<Arc<dyn Uploader>>,
        output: OutputStore,
        layout: LayoutOptions,
    ) -> Self {
        Self {
            generator,
            renderer,
            uploader,
            output,
            layout,
        }
    }

    /// Runs the full single-forecast pipeline.
    pub async fn run(&self, input: ForecastInput) -> Result<ForecastResult, AppError> {
        let input = input.normalized().map_err(AppError::Validation)?;
        let date_label = input.date_label();

        let prompt = build_prompt(&input);
        info!("Generating forecast for {date_label}");
        let raw = self.generator.generate(&prompt).await?;

        let parsed = parse_forecast(&raw);
        info!(
            "Parsed forecast for {}: {} sections, {} intro lines",
            date_label,
            parsed.sections.len(),
            parsed.intro.len()
        );

        let html = assemble_document(
            &parsed,
            &CoverInfo {
                date_label: &date_label,
                period_label: input.forecast_period(),
                theme: input.theme(),
            },
            &self.layout,
        );

        let id = Uuid::new_v4();
        let path = self.output.path_for(id);
        self.renderer.render_to_file(&html, &path).await?;

        let file_name = input.file_name();
        let remote_id = if input.upload {
            self.upload(&path, &file_name).await
        } else {
            None
        };

        Ok(ForecastResult {
            id,
            title: FORECAST_TITLE.to_string(),
            summary: parsed.summary,
            sections: parsed.sections,
            pdf_url: self.output.url_for(id),
            file_name,
            remote_id,
        })
    }

    async fn upload(&self, path: &Path, file_name: &str) -> Option<String> {
        let Some(uploader) = &self.uploader else {
            warn!("Upload requested for {file_name} but no storage is configured");
            return None;
        };
        match uploader.upload(path, file_name).await {
            Ok(remote_id) => Some(remote_id),
            Err(e) => {
                warn!("Upload of {file_name} failed, keeping local copy only: {e}");
                None
            }
        }
    }

    /// Size in bytes of a rendered document.
    pub async fn file_size(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(tokio::fs::metadata(self.output.path_for(id)).await?.len())
    }

    /// Removes the local file and, best-effort, the remote copy.
    /// Deleting a file that is already gone succeeds.
    pub async fn delete(&self, id: Uuid, remote_id: Option<&str>) -> Result<(), AppError> {
        match tokio::fs::remove_file(self.output.path_for(id)).await {
            Ok(()) => info!("Deleted forecast {id}"),
            Err(e) if e.kind() == ErrorKind::NotFound => info!("Forecast {id} already gone"),
            Err(e) => return Err(e.into()),
        }

        if let Some(remote_id) = remote_id.filter(|r| !r.trim().is_empty()) {
            match &self.uploader {
                Some(uploader) => {
                    if let Err(e) = uploader.delete(remote_id).await {
                        warn!("Remote delete of {remote_id} failed: {e}");
                    }
                }
                None => warn!("Remote id {remote_id} given but no storage is configured"),
            }
        }
        Ok(())
    }
}
