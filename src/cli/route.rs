//! CLI route: single route table and run context. Dispatches to the orchestrator and output.

use crate::cli::help::command_name;
use crate::cli::output::{
    format_generate_json, format_generate_text, format_modules_json, format_modules_text,
    format_scan_json, format_scan_text, FileStatus, GenerateReport, GeneratedFile,
};
use crate::cli::parse::{Commands, OutputFormat};
use crate::config::{ConfigLoader, MarkgenConfig};
use crate::document::Document;
use crate::error::SynthError;
use crate::orchestrator::Orchestrator;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Suffix of generated files: `lib.rs` regenerates into `lib.generated.rs`
pub const GENERATED_SUFFIX: &str = ".generated.rs";

const GENERATED_HEADER: &str = "// @generated by markgen";

/// Printed output plus whether the command should exit successfully
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub output: String,
    pub success: bool,
}

/// Runtime context for CLI execution: workspace, configuration and the pipeline.
pub struct RunContext {
    workspace_root: PathBuf,
    config: MarkgenConfig,
    orchestrator: Orchestrator,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SynthError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: MarkgenConfig) -> Result<Self, SynthError> {
        let orchestrator = Orchestrator::from_config(&config)?;
        Ok(Self::with_orchestrator(workspace_root, config, orchestrator))
    }

    /// Context over a caller-assembled pipeline
    pub fn with_orchestrator(
        workspace_root: PathBuf,
        config: MarkgenConfig,
        orchestrator: Orchestrator,
    ) -> Self {
        RunContext {
            workspace_root,
            config,
            orchestrator,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &MarkgenConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(
        &self,
        command: &Commands,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, SynthError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = name, workspace = %self.workspace_root.display(), "Executing command");

        let result = self.execute_inner(command, cancel).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => info!(command = name, success = outcome.success, elapsed_ms, "Command finished"),
            Err(e) => warn!(command = name, error = %e, elapsed_ms, "Command failed"),
        }
        result
    }

    async fn execute_inner(
        &self,
        command: &Commands,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, SynthError> {
        match command {
            Commands::Generate {
                paths,
                out_dir,
                check,
                format,
            } => {
                let report = self
                    .generate(paths, out_dir.as_deref(), *check, cancel)
                    .await?;
                let output = match format {
                    OutputFormat::Text => format_generate_text(&report),
                    OutputFormat::Json => format_generate_json(&report)?,
                };
                Ok(CommandOutcome {
                    output,
                    success: report.is_success(),
                })
            }
            Commands::Scan { path, format } => {
                let path = self.resolve(path);
                let document = Document::load(&path)?;
                let scan = self.orchestrator.scan(&document);
                let display = self.relative(&path);
                let output = match format {
                    OutputFormat::Text => format_scan_text(&display, &scan),
                    OutputFormat::Json => format_scan_json(&display, &scan)?,
                };
                Ok(CommandOutcome {
                    output,
                    success: scan.rejected.is_empty(),
                })
            }
            Commands::Modules { format } => {
                let modules = self.orchestrator.registry().modules();
                let markers: Vec<_> = self.orchestrator.catalog().definitions().collect();
                let output = match format {
                    OutputFormat::Text => format_modules_text(&modules, &markers),
                    OutputFormat::Json => format_modules_json(&modules, &markers)?,
                };
                Ok(CommandOutcome {
                    output,
                    success: true,
                })
            }
        }
    }

    /// Regenerate every source under `paths`.
    ///
    /// Documents run concurrently; the orchestrator bounds the generator
    /// invocations they start. Per-document failures land in the report.
    /// Only cancellation of `cancel` aborts the run.
    pub async fn generate(
        &self,
        paths: &[PathBuf],
        out_dir: Option<&Path>,
        check: bool,
        cancel: &CancellationToken,
    ) -> Result<GenerateReport, SynthError> {
        let sources = self.collect_sources(paths)?;
        let out_dir = out_dir.map(|dir| self.resolve(dir));
        let documents_in_flight = self.orchestrator.settings().max_concurrent_invocations.max(1);
        info!(sources = sources.len(), check, "Regenerating sources");

        let mut files: Vec<GeneratedFile> = stream::iter(sources)
            .map(|source| self.generate_file(source, out_dir.as_deref(), check, cancel))
            .buffer_unordered(documents_in_flight)
            .try_collect()
            .await?;
        files.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(GenerateReport { files })
    }

    async fn generate_file(
        &self,
        source: PathBuf,
        out_dir: Option<&Path>,
        check: bool,
        cancel: &CancellationToken,
    ) -> Result<GeneratedFile, SynthError> {
        let display = self.relative(&source);
        let document = match Document::load(&source) {
            Ok(document) => document,
            Err(e) => return Ok(GeneratedFile::failed(display, &e)),
        };

        let unit = match self.orchestrator.regenerate_bounded(&document, cancel).await {
            Ok(unit) => unit,
            Err(e) if e.is_cancelled() && cancel.is_cancelled() => return Err(e),
            Err(e) => return Ok(GeneratedFile::failed(display, &e)),
        };

        let output = self.output_path(&source, out_dir);
        let existing = std::fs::read_to_string(&output).ok();
        let status = if unit.is_empty() {
            match existing {
                Some(ref text) if text.starts_with(GENERATED_HEADER) => {
                    if check {
                        FileStatus::Stale
                    } else {
                        std::fs::remove_file(&output)?;
                        debug!(output = %output.display(), "Removed generated file with no remaining markers");
                        FileStatus::Empty
                    }
                }
                _ => FileStatus::Empty,
            }
        } else {
            let rendered = unit.render();
            if existing.as_deref() == Some(rendered.as_str()) {
                FileStatus::Unchanged
            } else if check {
                FileStatus::Stale
            } else {
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&output, rendered)?;
                FileStatus::Written
            }
        };

        Ok(GeneratedFile {
            source: display,
            output: (status != FileStatus::Empty).then(|| self.relative(&output)),
            status,
            fingerprint: Some(unit.fingerprint.to_hex()),
            declarations: unit.declarations.len(),
            diagnostics: unit.diagnostics.clone(),
            error: None,
        })
    }

    /// Source files named by `paths`, de-duplicated and sorted
    fn collect_sources(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, SynthError> {
        let mut sources = BTreeSet::new();
        for path in paths {
            let path = self.resolve(path);
            if path.is_dir() {
                let walker = WalkDir::new(&path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
                for entry in walker {
                    let entry = entry.map_err(|e| SynthError::Io(e.into()))?;
                    if entry.file_type().is_file() && is_source(entry.path()) {
                        sources.insert(entry.into_path());
                    }
                }
            } else if path.is_file() {
                sources.insert(path);
            } else {
                return Err(SynthError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
        }
        Ok(sources.into_iter().collect())
    }

    fn output_path(&self, source: &Path, out_dir: Option<&Path>) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{}{}", stem, GENERATED_SUFFIX);
        match out_dir {
            Some(dir) => {
                let relative_parent = source
                    .strip_prefix(&self.workspace_root)
                    .ok()
                    .and_then(Path::parent)
                    .unwrap_or_else(|| Path::new(""));
                dir.join(relative_parent).join(file_name)
            }
            None => source.with_file_name(file_name),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.workspace_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn is_source(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.ends_with(".rs") && !name.ends_with(GENERATED_SUFFIX)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || name == "target")
}
