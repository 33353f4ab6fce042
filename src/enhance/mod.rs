use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use natord::compare;
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Emitter};
use thiserror::Error;
use walkdir::WalkDir;

pub mod compositor;
pub mod dimensions;
pub mod pipeline;
pub mod remote;
pub mod sharpen;

use compositor::composite_cover;
use dimensions::Dimensions;
use pipeline::{artifact_file_name, encode_jpeg, sharpen_and_encode, ArtifactKind, PipelineError};
use remote::RemoteError;
pub use remote::{RemoteUpscaleClient, Upscaler};
use sharpen::SharpenSettings;
pub use dimensions::{RoundingPolicy, TargetSpec};

pub const BATCH_PROGRESS_EVENT: &str = "enhance-batch-progress";

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhanceMode {
    Free,
    Ai,
    Legacy,
}

impl EnhanceMode {
    /// Provider key the persisted credential is stored under, when the mode
    /// needs one.
    pub fn credential_provider(self) -> Option<&'static str> {
        match self {
            EnhanceMode::Free => None,
            EnhanceMode::Ai => Some("upscale"),
            EnhanceMode::Legacy => Some("legacy"),
        }
    }

    fn requires_remote(self) -> bool {
        !matches!(self, EnhanceMode::Free)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Processed strictly in this order.
    pub files: Vec<PathBuf>,
    pub target: TargetSpec,
    #[serde(default)]
    pub rounding: RoundingPolicy,
    #[serde(default = "default_quality")]
    pub quality: u8,
    pub mode: EnhanceMode,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Artifacts land next to their sources when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub sharpen: Option<SharpenSettings>,
    #[serde(default)]
    pub service_url: Option<String>,
}

fn default_quality() -> u8 {
    100
}

/// Immutable per-run configuration, resolved once before the first file is
/// touched. Nothing here changes while the batch runs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    files: Vec<PathBuf>,
    target: TargetSpec,
    dims: Dimensions,
    suffix: String,
    quality: u8,
    mode: EnhanceMode,
    api_key: String,
    output_dir: Option<PathBuf>,
    sharpen: SharpenSettings,
    warnings: Vec<String>,
}

impl BatchConfig {
    pub fn from_options(options: BatchOptions) -> Result<Self, BatchError> {
        if options.files.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let api_key = options.api_key.unwrap_or_default().trim().to_string();
        if options.mode.requires_remote() && api_key.is_empty() {
            return Err(BatchError::Unauthenticated);
        }

        let mut warnings = Vec::new();
        let (target, substitution) = dimensions::normalize(options.target);
        if let Some(warning) = substitution {
            warnings.push(warning);
        }
        if options.mode == EnhanceMode::Legacy {
            warnings.push(
                "the legacy provider only runs server-side; every file will use the local path"
                    .to_string(),
            );
        }

        // normalize() already replaced any invalid custom spec.
        let dims = dimensions::plan(&target, options.rounding).unwrap_or(Dimensions {
            width: dimensions::DEFAULT_CUSTOM_WIDTH,
            height: dimensions::DEFAULT_CUSTOM_HEIGHT,
        });
        let suffix = dimensions::suffix(&target);

        Ok(Self {
            files: options.files,
            target,
            dims,
            suffix,
            quality: options.quality.min(100),
            mode: options.mode,
            api_key,
            output_dir: options.output_dir,
            sharpen: options.sharpen.unwrap_or_default(),
            warnings,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("no input files selected")]
    EmptyBatch,
    #[error("an API key is required before AI upscaling can start")]
    Unauthenticated,
}

#[derive(Debug, Error)]
enum FileError {
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to write artifact: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileOutcome {
    Success,
    SuccessViaFallback,
    Failure { reason: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub total_files: usize,
    pub succeeded: usize,
    pub used_fallback: bool,
    pub reports: Vec<FileReport>,
    pub warnings: Vec<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total_files: usize,
    pub processed_files: usize,
    pub percent: u8,
    pub current_file: Option<PathBuf>,
    pub stage: BatchStage,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BatchStage {
    Initializing,
    Processing,
    Completed,
}

/// Runs one batch to completion. Files are processed strictly in input order,
/// one at a time; a failed file is recorded and never aborts the run.
pub fn run_batch(
    app: Option<&AppHandle>,
    upscaler: &dyn Upscaler,
    options: BatchOptions,
) -> Result<BatchOutcome, BatchError> {
    let config = BatchConfig::from_options(options)?;
    let total = config.files.len();

    emit_progress(
        app,
        BatchProgress {
            total_files: total,
            processed_files: 0,
            percent: 0,
            current_file: None,
            stage: BatchStage::Initializing,
        },
    );

    let mut reports = Vec::with_capacity(total);
    let mut succeeded = 0usize;
    let mut used_fallback = false;

    for (index, source) in config.files.iter().enumerate() {
        let report = process_file(&config, upscaler, source, &mut used_fallback);
        if !matches!(report.outcome, FileOutcome::Failure { .. }) {
            succeeded += 1;
        }
        reports.push(report);

        // Progress moves only after the file's outcome is final.
        let processed = index + 1;
        emit_progress(
            app,
            BatchProgress {
                total_files: total,
                processed_files: processed,
                percent: percent_done(processed, total),
                current_file: Some(source.clone()),
                stage: BatchStage::Processing,
            },
        );
    }

    let mut outcome = BatchOutcome {
        total_files: total,
        succeeded,
        used_fallback,
        reports,
        warnings: config.warnings.clone(),
        summary: build_summary(succeeded, total, used_fallback),
        report_path: None,
    };

    match write_report(&config, &outcome) {
        Ok(path) => outcome.report_path = Some(path),
        Err(err) => outcome
            .warnings
            .push(format!("failed to write batch report: {}", err)),
    }

    emit_progress(
        app,
        BatchProgress {
            total_files: total,
            processed_files: total,
            percent: 100,
            current_file: None,
            stage: BatchStage::Completed,
        },
    );

    Ok(outcome)
}

fn process_file(
    config: &BatchConfig,
    upscaler: &dyn Upscaler,
    source: &Path,
    used_fallback: &mut bool,
) -> FileReport {
    match process_file_inner(config, upscaler, source, used_fallback) {
        Ok((output, fell_back)) => {
            FileReport {
                source: source.to_path_buf(),
                output: Some(output),
                outcome: if fell_back {
                    FileOutcome::SuccessViaFallback
                } else {
                    FileOutcome::Success
                },
            }
        }
        Err(err) => FileReport {
            source: source.to_path_buf(),
            output: None,
            outcome: FileOutcome::Failure {
                reason: err.to_string(),
            },
        },
    }
}

fn process_file_inner(
    config: &BatchConfig,
    upscaler: &dyn Upscaler,
    source: &Path,
    used_fallback: &mut bool,
) -> Result<(PathBuf, bool), FileError> {
    let decoded = image::open(source)?;
    let canvas = composite_cover(&decoded, config.dims);
    drop(decoded);

    let (bytes, kind, fell_back) = match config.mode {
        EnhanceMode::Free => (
            sharpen_and_encode(canvas, config.sharpen, config.quality)?,
            ArtifactKind::Enhanced,
            false,
        ),
        EnhanceMode::Ai | EnhanceMode::Legacy => {
            let remote = match config.mode {
                EnhanceMode::Ai => {
                    let upload = encode_jpeg(&canvas, remote::UPLOAD_JPEG_QUALITY)?;
                    upscaler.upscale(&upload, &config.api_key)
                }
                // The legacy provider has no client-side path; its remote step
                // fails unconditionally so the shared fallback branch runs.
                _ => Err(RemoteError::ServiceUnavailable(
                    "legacy provider only runs server-side".to_string(),
                )),
            };
            match remote {
                Ok(bytes) => (bytes, ArtifactKind::AiUpscaled, false),
                Err(_) => {
                    // Recorded before the local attempt; the flag holds even
                    // when the fallback itself fails.
                    *used_fallback = true;
                    (
                        sharpen_and_encode(canvas, config.sharpen, config.quality)?,
                        ArtifactKind::Enhanced,
                        true,
                    )
                }
            }
        }
    };

    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");
    let directory = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&directory)?;

    let output = directory.join(artifact_file_name(stem, &config.suffix, kind));
    fs::write(&output, &bytes)?;
    Ok((output, fell_back))
}

fn percent_done(processed: usize, total: usize) -> u8 {
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

fn build_summary(succeeded: usize, total: usize, used_fallback: bool) -> String {
    let mut summary = format!("Processed {} of {} images", succeeded, total);
    if used_fallback {
        summary.push_str(" (AI upscaling was unavailable for some files, used local enhancement)");
    }
    summary
}

fn emit_progress(app: Option<&AppHandle>, progress: BatchProgress) {
    if let Some(handle) = app {
        let _ = handle.emit(BATCH_PROGRESS_EVENT, progress);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReportFile<'a> {
    version: u32,
    created_at: String,
    target: &'a TargetSpec,
    quality: u8,
    mode: EnhanceMode,
    total_files: usize,
    succeeded: usize,
    used_fallback: bool,
    reports: &'a [FileReport],
    warnings: &'a [String],
}

fn write_report(config: &BatchConfig, outcome: &BatchOutcome) -> io::Result<PathBuf> {
    let directory = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => config
            .files
            .first()
            .and_then(|file| file.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&directory)?;

    let report = BatchReportFile {
        version: 1,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        target: &config.target,
        quality: config.quality,
        mode: config.mode,
        total_files: outcome.total_files,
        succeeded: outcome.succeeded,
        used_fallback: outcome.used_fallback,
        reports: &outcome.reports,
        warnings: &outcome.warnings,
    };

    let path = directory.join("enhance_report.json");
    let json = serde_json::to_vec_pretty(&report)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    fs::write(&path, json)?;
    Ok(path)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCandidate {
    pub path: PathBuf,
    pub file_name: String,
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("failed to read directory: {0}")]
    Io(#[from] io::Error),
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists the images under `directory` in natural order, for the file picker.
pub fn list_batch_candidates(directory: &Path) -> Result<Vec<BatchCandidate>, ListError> {
    if !directory.exists() || !directory.is_dir() {
        return Err(ListError::DirectoryNotFound(directory.to_path_buf()));
    }

    let mut entries: Vec<BatchCandidate> = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();
        if !is_supported_image(&path) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let relative_path = path
            .strip_prefix(directory)
            .map(|relative| relative.to_string_lossy().to_string())
            .unwrap_or_else(|_| file_name.clone());
        let file_size = entry.metadata().ok().map(|meta| meta.len());

        entries.push(BatchCandidate {
            path,
            file_name,
            relative_path,
            file_size,
        });
    }

    entries.sort_by(|a, b| compare(&a.relative_path, &b.relative_path));
    Ok(entries)
}
