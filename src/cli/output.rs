//! CLI output: report types, tables, JSON and error mapping.

use crate::diagnostic::{Diagnostic, Severity};
use crate::error::SynthError;
use crate::marker::MarkerDefinition;
use crate::registry::ModuleSummary;
use crate::scanner::ScanOutput;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

/// What `generate` did with one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Written,
    Unchanged,
    /// `--check` found the generated file out of date
    Stale,
    /// No declarations were generated
    Empty,
    Failed,
}

impl FileStatus {
    fn label(&self) -> String {
        match self {
            FileStatus::Written => "written".green().to_string(),
            FileStatus::Unchanged => "unchanged".dimmed().to_string(),
            FileStatus::Stale => "stale".yellow().to_string(),
            FileStatus::Empty => "nothing generated".dimmed().to_string(),
            FileStatus::Failed => "failed".red().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub fingerprint: Option<String>,
    pub declarations: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<String>,
}

impl GeneratedFile {
    pub(crate) fn failed(source: PathBuf, error: &SynthError) -> Self {
        GeneratedFile {
            source,
            output: None,
            status: FileStatus::Failed,
            fingerprint: None,
            declarations: 0,
            diagnostics: Vec::new(),
            error: Some(map_error(error)),
        }
    }
}

/// Result of a `generate` run, ordered by source path
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateReport {
    pub files: Vec<GeneratedFile>,
}

impl GenerateReport {
    /// No failed or stale files and no error diagnostics
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|file| {
            !matches!(file.status, FileStatus::Failed | FileStatus::Stale)
                && !file.diagnostics.iter().any(|d| d.severity.is_error())
        })
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Map pipeline errors to a string for CLI output.
pub fn map_error(e: &SynthError) -> String {
    format!("error[{}]: {}", e.code(), e)
}

pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// `path:line:col: severity[code]: message`
pub fn format_diagnostic(source: &Path, diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error".red().bold().to_string(),
        Severity::Warning => "warning".yellow().bold().to_string(),
        Severity::Info => "info".cyan().to_string(),
    };
    let location = diagnostic
        .location
        .or_else(|| diagnostic.origin.as_ref().map(|site| site.span))
        .map(|span| format!("{}:{}", source.display(), span))
        .unwrap_or_else(|| source.display().to_string());
    let code = diagnostic
        .code
        .as_ref()
        .map(|c| format!("[{}]", c))
        .unwrap_or_default();
    let mut line = format!("{}: {}{}: {}", location, severity, code, diagnostic.message);
    if let Some(site) = &diagnostic.origin {
        line.push_str(&format!(" {}", format!("(#[{}] on `{}`)", site.attribute, site.declaration).dimmed()));
    }
    line
}

pub fn format_generate_text(report: &GenerateReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Generated units")));
    if report.files.is_empty() {
        out.push_str("No source files found.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Source", "Output", "Status", "Decls", "Diagnostics"]);
    for file in &report.files {
        table.add_row(vec![
            file.source.display().to_string(),
            file.output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            file.status.label(),
            file.declarations.to_string(),
            file.diagnostics.len().to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    let problems: Vec<String> = report
        .files
        .iter()
        .flat_map(|file| {
            file.error
                .iter()
                .map(move |e| format!("{}: {}", file.source.display(), e.red()))
                .chain(file.diagnostics.iter().map(move |d| format_diagnostic(&file.source, d)))
        })
        .collect();
    if !problems.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n\n", format_section_heading("Diagnostics")));
        for line in problems {
            out.push_str(&line);
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "\n{} written, {} unchanged, {} stale, {} failed\n",
        report.count(FileStatus::Written),
        report.count(FileStatus::Unchanged),
        report.count(FileStatus::Stale),
        report.count(FileStatus::Failed),
    ));
    out
}

pub fn format_generate_json(report: &GenerateReport) -> Result<String, SynthError> {
    let value = json!({
        "success": report.is_success(),
        "files": report.files,
    });
    to_pretty_json(&value)
}

pub fn format_scan_text(source: &Path, scan: &ScanOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Markers in {}", source.display()))
    ));
    if scan.is_empty() {
        out.push_str("No markers found.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Marker", "Declaration", "Generator", "Arguments", "At"]);
    for marked in &scan.marked {
        let marker = &marked.marker;
        table.add_row(vec![
            marker.site.ordinal.to_string(),
            format!("#[{}]", marker.site.attribute),
            marked.declaration.qualified_name(),
            marker.identity.to_string(),
            marker.args.to_string(),
            marker.site.span.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    if !scan.rejected.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n\n", format_section_heading("Rejected")));
        for rejected in &scan.rejected {
            out.push_str(&format!(
                "{}:{}: {}\n",
                source.display(),
                rejected.site.span,
                map_error(&rejected.error).red()
            ));
        }
    }
    out
}

pub fn format_scan_json(source: &Path, scan: &ScanOutput) -> Result<String, SynthError> {
    let markers: Vec<_> = scan
        .marked
        .iter()
        .map(|marked| {
            json!({
                "declaration": marked.declaration.qualified_name(),
                "kind": marked.declaration.kind,
                "marker": &*marked.marker,
            })
        })
        .collect();
    let rejected: Vec<_> = scan
        .rejected
        .iter()
        .map(|rejected| {
            json!({
                "site": rejected.site,
                "identity": rejected.identity,
                "code": rejected.error.code(),
                "message": rejected.error.to_string(),
            })
        })
        .collect();
    to_pretty_json(&json!({
        "path": source,
        "markers": markers,
        "rejected": rejected,
    }))
}

pub fn format_modules_text(modules: &[ModuleSummary], markers: &[&MarkerDefinition]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Generator modules")));
    if modules.is_empty() {
        out.push_str("No modules on the search path.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Location", "Module", "Exports"]);
        for module in modules {
            table.add_row(vec![
                module.location.clone(),
                module.module.clone(),
                module.exports.join(", "),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }

    out.push('\n');
    out.push_str(&format!("{}\n\n", format_section_heading("Markers")));
    if markers.is_empty() {
        out.push_str("No markers registered.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Attribute", "Generator", "Targets"]);
    for definition in markers {
        let targets = if definition.targets.is_empty() {
            "any".to_string()
        } else {
            definition
                .targets
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            format!("#[{}]", definition.attribute),
            definition.identity.to_string(),
            targets,
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_modules_json(
    modules: &[ModuleSummary],
    markers: &[&MarkerDefinition],
) -> Result<String, SynthError> {
    to_pretty_json(&json!({
        "modules": modules,
        "markers": markers,
    }))
}

fn to_pretty_json(value: &serde_json::Value) -> Result<String, SynthError> {
    serde_json::to_string_pretty(value).map_err(|e| SynthError::Io(e.into()))
}
