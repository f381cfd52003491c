//! Headless-browser PDF rendering.
//!
//! `ChromeRenderer` is the single browser resource of the process. It is created
//! once in `main`, handed to the pipeline as `Arc<dyn DocumentRenderer>`, and
//! closed once on shutdown. The session directory is created lazily on the first
//! render. Every render gets its own directory inside it, holding the transient
//! page file and the browser's user data, removed when the render finishes
//! whatever the outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser exited with {status}: {stderr}")]
    Browser { status: String, stderr: String },

    #[error("browser produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("renderer has been closed")]
    Closed,
}

/// Markup in, binary document out.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Creates or overwrites the document at `destination`.
    async fn render_to_file(&self, markup: &str, destination: &Path) -> Result<(), RenderError>;

    /// Releases the underlying browser. Later renders fail with `RenderError::Closed`.
    async fn close(&self);
}

/// A running browser profile. Dropping the last handle deletes the profile directory.
struct BrowserSession {
    profile: TempDir,
}

impl BrowserSession {
    /// Private directory for one render. Chrome locks its user-data-dir, so two
    /// browser processes must never be pointed at the same one.
    fn render_dir(&self) -> std::io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix("render-")
            .tempdir_in(self.profile.path())
    }
}

enum Lifecycle {
    Idle,
    Running(Arc<BrowserSession>),
    Closed,
}

pub struct ChromeRenderer {
    binary: PathBuf,
    state: Mutex<Lifecycle>,
}

impl ChromeRenderer {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            state: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Returns the shared session, launching it on first use.
    async fn session(&self) -> Result<Arc<BrowserSession>, RenderError> {
        let mut state = self.state.lock().await;
        match &*state {
            Lifecycle::Running(session) => Ok(Arc::clone(session)),
            Lifecycle::Closed => Err(RenderError::Closed),
            Lifecycle::Idle => {
                let profile = tempfile::Builder::new()
                    .prefix("forecast-browser-")
                    .tempdir()?;
                info!(
                    "Browser profile started at {} ({})",
                    profile.path().display(),
                    self.binary.display()
                );
                let session = Arc::new(BrowserSession { profile });
                *state = Lifecycle::Running(Arc::clone(&session));
                Ok(session)
            }
        }
    }
}

#[async_trait]
impl DocumentRenderer for ChromeRenderer {
    async fn render_to_file(&self, markup: &str, destination: &Path) -> Result<(), RenderError> {
        let session = self.session().await?;

        // Removed on drop, including on every error path below.
        let workdir = session.render_dir()?;
        let page = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".html")
            .tempfile_in(workdir.path())?;
        tokio::fs::write(page.path(), markup).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = tokio::process::Command::new(&self.binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--no-pdf-header-footer")
            .arg("--virtual-time-budget=10000")
            .arg(format!("--user-data-dir={}", workdir.path().display()))
            .arg(format!("--print-to-pdf={}", destination.display()))
            .arg(format!("file://{}", page.path().display()))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("Browser render failed: {stderr}");
            return Err(RenderError::Browser {
                status: output.status.to_string(),
                stderr,
            });
        }

        if tokio::fs::metadata(destination).await.is_err() {
            return Err(RenderError::MissingOutput(destination.to_path_buf()));
        }

        debug!("Rendered {}", destination.display());
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, Lifecycle::Closed);
        if matches!(previous, Lifecycle::Running(_)) {
            info!("Browser profile released");
        }
    }
}
