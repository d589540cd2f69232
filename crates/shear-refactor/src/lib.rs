//! Extract-subclass refactoring for Java sources.
//!
//! Given a class, a set of member names to move, and a target subclass name,
//! the engine rewrites the program text so the selected members live on a new
//! derived type and dependent declarations are retargeted. Three passes run
//! in a fixed order:
//! 1. [`extract`]: migrate the selected members out of the source class into
//!    generated subclass text.
//! 2. [`discover`]: per dependent file, record which members are accessed
//!    through each source-typed identifier, and retype signature positions.
//! 3. [`propagate`]: narrow declaration retyping to identifiers whose
//!    recorded usage intersects the moved member set, and retarget matching
//!    constructions.
//!
//! Resolution is syntactic: type *names* are matched, not verified type
//! identity. There is no type checking, overload resolution, or
//! generics-aware inference here.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod discover;
mod driver;
mod extract;
mod propagate;
mod scope;
mod usage;

pub use discover::{discover_usages, DiscoverOutcome};
pub use driver::{run, DriverError, RefactorReport, SkippedFile};
pub use extract::{extract_subclass, ExtractError, ExtractOutcome};
pub use propagate::propagate_usages;
pub use scope::{ScopeFrame, ScopePath, ScopeStack};
pub use usage::{IdentifierUsage, UsageTable};

/// The immutable set of member names selected for relocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveSet {
    pub fields: BTreeSet<String>,
    pub methods: BTreeSet<String>,
}

impl MoveSet {
    pub fn new<F, M>(fields: F, methods: M) -> Self
    where
        F: IntoIterator<Item = String>,
        M: IntoIterator<Item = String>,
    {
        Self {
            fields: fields.into_iter().collect(),
            methods: methods.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty()
    }
}

/// Policy for rewriting method return types and formal parameter types of the
/// source type in dependent files.
///
/// The default rewrites every signature position while field and local
/// declarations are narrowed by recorded usage. The asymmetry is deliberate
/// and surfaced as a policy rather than hard-coded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureRetype {
    /// Rewrite every matching return/parameter type, independent of usage.
    #[default]
    Unconditional,
    /// Rewrite signatures only when the file's recorded usage intersects the
    /// moved member set; applied during the propagation pass.
    UsageGated,
}

/// Configuration record for one extract-subclass run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSubclassParams {
    /// Name of the class whose members are being extracted.
    pub source_class: String,
    /// Name of the generated subclass.
    pub new_class: String,
    #[serde(default)]
    pub moved_fields: Vec<String>,
    #[serde(default)]
    pub moved_methods: Vec<String>,
    /// File declaring the source class.
    pub source_file: PathBuf,
    /// Root to traverse for dependent files.
    pub project_root: PathBuf,
    /// Directory receiving the generated subclass file.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub signature_retype: SignatureRetype,
}

impl ExtractSubclassParams {
    /// The reference default subclass name for a source class.
    pub fn default_new_class(source_class: &str) -> String {
        format!("{source_class}extracted")
    }

    pub fn move_set(&self) -> MoveSet {
        MoveSet::new(self.moved_fields.iter().cloned(), self.moved_methods.iter().cloned())
    }

    /// Validates the configuration. Called by the driver before any file is
    /// touched; a failure here is fatal and never retried.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_class.is_empty() {
            return Err(ConfigError::MissingSourceClass);
        }
        if self.new_class.is_empty() {
            return Err(ConfigError::MissingNewClass);
        }
        if self.new_class == self.source_class {
            return Err(ConfigError::SameClassName(self.source_class.clone()));
        }
        if self
            .moved_fields
            .iter()
            .chain(self.moved_methods.iter())
            .any(|name| name.is_empty())
        {
            return Err(ConfigError::EmptyMemberName);
        }
        if !self.source_file.is_file() {
            return Err(ConfigError::SourceFileNotFound(self.source_file.clone()));
        }
        if !self.project_root.is_dir() {
            return Err(ConfigError::ProjectRootNotFound(self.project_root.clone()));
        }
        Ok(())
    }

    /// Path of the generated subclass file.
    pub fn generated_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.java", self.new_class))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("source class name is required")]
    MissingSourceClass,
    #[error("new class name is required")]
    MissingNewClass,
    #[error("new class name must differ from source class name `{0}`")]
    SameClassName(String),
    #[error("moved member names must not be empty")]
    EmptyMemberName,
    #[error("source file not found: {0}")]
    SourceFileNotFound(PathBuf),
    #[error("project root not found: {0}")]
    ProjectRootNotFound(PathBuf),
}
