//! Orchestrates one extract-subclass run end to end: extraction over the
//! source file, then usage discovery and propagation over every other Java
//! file under the project root.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shear_project::list_java_files;
use shear_syntax::{parse, TokenStream};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{discover_usages, extract_subclass, propagate_usages};
use crate::{ConfigError, ExtractError, ExtractSubclassParams};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A dependent file the run decided to leave alone, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefactorReport {
    /// Path of the written subclass file.
    pub generated_file: PathBuf,
    /// Constructors that migrated with the moved members.
    pub migrated_constructors: usize,
    /// Dependent files examined after extraction.
    pub dependents_scanned: usize,
    /// Files whose text actually changed, source file included.
    pub files_changed: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// Runs the full three-pass refactoring described by `params`.
///
/// The source file is rewritten in place and the subclass file is created
/// under the output directory. Every other Java file under the project root
/// then goes through usage discovery and propagation; files that do not
/// change are not rewritten, so a run over already-refactored sources is a
/// no-op. Per-file failures (unreadable or non-UTF-8 content, rewrite
/// conflicts) are recorded in [`RefactorReport::skipped`] and the run
/// continues; only configuration, extraction and io failures are fatal.
pub fn run(params: &ExtractSubclassParams) -> Result<RefactorReport, DriverError> {
    params.validate()?;
    let moves = params.move_set();
    info!(
        source_class = %params.source_class,
        new_class = %params.new_class,
        fields = moves.fields.len(),
        methods = moves.methods.len(),
        "starting extract-subclass run"
    );

    // Pass 1: extraction over the source file.
    let source_text = read_file(&params.source_file)?;
    let stream = TokenStream::of(source_text.as_str());
    let parsed = parse(&stream);
    if !parsed.errors.is_empty() {
        warn!(
            path = %params.source_file.display(),
            errors = parsed.errors.len(),
            "source file parsed with errors; proceeding on the recovered tree"
        );
    }
    let outcome = extract_subclass(
        &stream,
        &parsed.unit,
        &params.source_class,
        &params.new_class,
        &moves,
    )?;

    let mut report = RefactorReport {
        generated_file: params.generated_file(),
        migrated_constructors: outcome.migrated_constructors,
        ..RefactorReport::default()
    };

    if outcome.rewritten_source != source_text {
        write_file(&params.source_file, &outcome.rewritten_source)?;
        report.files_changed.push(params.source_file.clone());
    }
    if let Some(parent) = report.generated_file.parent() {
        std::fs::create_dir_all(parent).map_err(|source| DriverError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write_file(&report.generated_file, &outcome.subclass_text)?;

    // Passes 2 and 3 over every other Java file in the project.
    let dependents = list_java_files(
        &params.project_root,
        &[params.source_file.as_path(), report.generated_file.as_path()],
    );
    report.dependents_scanned = dependents.len();
    for path in dependents {
        let outcome = rewrite_dependent(&path, params)?;
        if outcome.changed {
            report.files_changed.push(path.clone());
        }
        if let Some(reason) = outcome.skipped {
            warn!(path = %path.display(), %reason, "skipping dependent file");
            report.skipped.push(SkippedFile { path, reason });
        }
    }

    info!(
        changed = report.files_changed.len(),
        skipped = report.skipped.len(),
        "extract-subclass run complete"
    );
    Ok(report)
}

/// What happened to one dependent file. A file can be both changed and
/// skipped: discovery may commit its retypes before propagation fails.
struct DependentOutcome {
    changed: bool,
    skipped: Option<String>,
}

impl DependentOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            changed: false,
            skipped: Some(reason.into()),
        }
    }
}

fn rewrite_dependent(
    path: &Path,
    params: &ExtractSubclassParams,
) -> Result<DependentOutcome, DriverError> {
    // Non-UTF-8 and unreadable dependents are skipped, not fatal.
    let original = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            return Ok(DependentOutcome::skipped("not valid UTF-8"));
        }
        Err(err) => return Ok(DependentOutcome::skipped(err.to_string())),
    };

    let moves = params.move_set();
    let stream = TokenStream::of(original.as_str());
    let parsed = parse(&stream);
    if !parsed.errors.is_empty() {
        debug!(
            path = %path.display(),
            errors = parsed.errors.len(),
            "dependent parsed with errors; proceeding on the recovered tree"
        );
    }
    let discovered = match discover_usages(
        &stream,
        &parsed.unit,
        &params.source_class,
        &params.new_class,
        params.signature_retype,
    ) {
        Ok(outcome) => outcome,
        Err(err) => return Ok(DependentOutcome::skipped(format!("rewrite conflict: {err}"))),
    };

    // Discovery output is committed to disk before propagation re-parses it,
    // so a propagation failure never discards the file's signature retypes.
    let mut changed = false;
    if discovered.rewritten != original {
        write_file(path, &discovered.rewritten)?;
        changed = true;
    }

    let stream = TokenStream::of(discovered.rewritten.as_str());
    let parsed = parse(&stream);
    let propagated = match propagate_usages(
        &stream,
        &parsed.unit,
        &params.source_class,
        &params.new_class,
        &moves,
        &discovered.table,
        params.signature_retype,
    ) {
        Ok(text) => text,
        Err(err) => {
            return Ok(DependentOutcome {
                changed,
                skipped: Some(format!("rewrite conflict: {err}")),
            })
        }
    };

    if propagated != discovered.rewritten {
        write_file(path, &propagated)?;
        changed = true;
    }
    Ok(DependentOutcome {
        changed,
        skipped: None,
    })
}

fn read_file(path: &Path) -> Result<String, DriverError> {
    std::fs::read_to_string(path).map_err(|source| DriverError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, text: &str) -> Result<(), DriverError> {
    std::fs::write(path, text).map_err(|source| DriverError::Write {
        path: path.to_path_buf(),
        source,
    })
}
