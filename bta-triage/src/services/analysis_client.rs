//! Inference endpoint client
//!
//! Uploads one scan image to the external tumor-prediction endpoint and
//! returns the diagnosis label, confidence, and processed-image reference.
//! One analysis may be in flight per client at a time; a second call while
//! pending is rejected outright, never queued or retried.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const USER_AGENT: &str = "bta-triage/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Analysis client errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis already in progress")]
    Busy,

    #[error("Please select an image first")]
    NoFileSelected,

    #[error("Failed to read image file: {0}")]
    UnreadableFile(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Analysis failed ({status}): {message}")]
    Endpoint { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Transient diagnosis output from the inference endpoint
///
/// Exists only in memory between a successful analysis and its consumption
/// by submit (or its replacement by a newer analysis). Never persisted
/// standalone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Diagnosis label, e.g. "Glioma Tumor"
    pub label: String,
    /// Confidence percentage as returned by the endpoint (0-100, no
    /// client-side normalization)
    pub confidence: f64,
    /// Reference to the processed image
    pub image_ref: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    image: String,
    filename: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    result: String,
    confidence: f64,
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct PredictErrorBody {
    error: String,
}

/// HTTP client for the tumor-prediction endpoint
pub struct AnalysisClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    in_flight: AtomicBool,
}

impl AnalysisClient {
    pub fn new(endpoint_url: String) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint_url,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Analyze one scan image
    ///
    /// Encodes the file as a base64 data URL, sends a single request, and
    /// returns the diagnosis. Fails with `Busy` if another analysis is
    /// pending on this client. On any failure no partial result is left
    /// behind.
    pub async fn analyze(&self, file: &Path) -> Result<AnalysisResult, AnalysisError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(AnalysisError::Busy);
        }
        let outcome = self.analyze_inner(file).await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn analyze_inner(&self, file: &Path) -> Result<AnalysisResult, AnalysisError> {
        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("uploaded_image.jpg")
            .to_string();

        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| AnalysisError::UnreadableFile(e.to_string()))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let image = format!("data:{};base64,{}", mime_for_filename(&filename), encoded);

        tracing::debug!(
            filename = %filename,
            bytes = bytes.len(),
            endpoint = %self.endpoint_url,
            "Uploading scan for analysis"
        );

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&PredictRequest { image, filename: &filename })
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<PredictErrorBody>(&body) {
                Ok(parsed) => parsed.error,
                Err(_) if !body.trim().is_empty() => body,
                Err(_) => format!("Server error ({})", status.as_u16()),
            };
            return Err(AnalysisError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;

        let image_ref = match parsed.image_url {
            Some(url) if !url.is_empty() => url,
            _ => format!("/uploads/{}", filename),
        };

        tracing::info!(
            label = %parsed.result,
            confidence = parsed.confidence,
            "Analysis completed"
        );

        Ok(AnalysisResult {
            label: parsed.result,
            confidence: parsed.confidence,
            image_ref,
        })
    }
}

/// Mime type from the filename extension; scans default to JPEG
fn mime_for_filename(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Local, revocable preview of a selected scan
///
/// The preview is a temp-dir copy, independent of the network; revoking it
/// (or dropping it) removes the copy.
#[derive(Debug)]
pub struct PreviewRef {
    path: PathBuf,
}

impl PreviewRef {
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Release the preview and delete the local copy
    pub fn revoke(self) {}
}

impl Drop for PreviewRef {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Per-upload state for the scan selection and analysis step
///
/// Selecting a file produces a local preview and clears any previous
/// result or error; analyzing delegates to the shared [`AnalysisClient`].
pub struct ScanUpload {
    client: Arc<AnalysisClient>,
    selected: Option<PathBuf>,
    preview: Option<PreviewRef>,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl ScanUpload {
    pub fn new(client: Arc<AnalysisClient>) -> Self {
        Self {
            client,
            selected: None,
            preview: None,
            result: None,
            error: None,
        }
    }

    /// Select a scan file, producing a local preview
    ///
    /// Clears any previous result and error; the prior preview (if any) is
    /// revoked by replacement.
    pub fn select_file(&mut self, path: &Path) -> Result<(), AnalysisError> {
        self.result = None;
        self.error = None;
        self.preview = None;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("uploaded_image.jpg");
        let preview_path = std::env::temp_dir().join(format!(
            "bta-preview-{}-{}",
            Uuid::new_v4().simple(),
            filename
        ));
        std::fs::copy(path, &preview_path)
            .map_err(|e| AnalysisError::UnreadableFile(e.to_string()))?;

        self.selected = Some(path.to_path_buf());
        self.preview = Some(PreviewRef { path: preview_path });
        Ok(())
    }

    pub fn preview_url(&self) -> Option<String> {
        self.preview.as_ref().map(|p| p.url())
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Analyze the selected scan
    pub async fn analyze(&mut self) -> Result<AnalysisResult, AnalysisError> {
        let Some(path) = self.selected.clone() else {
            return Err(AnalysisError::NoFileSelected);
        };

        match self.client.analyze(&path).await {
            Ok(result) => {
                self.error = None;
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
