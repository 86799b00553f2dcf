#![allow(clippy::result_large_err)]
//! causal-codegen: Python artifacts from causal rules.
//!
//! Two independent backends walk the parsed rules:
//!
//! - [`recognizer`] -- `causes(v)`, the forward candidate-cause function
//! - [`decomposer`] -- one pyhop method per intention, the inverse mapping
//!
//! [`generate_python()`] runs both against one source text and writes an
//! artifact for every backend that succeeds.

pub mod decomposer;
pub mod error;
pub mod python;
pub mod recognizer;
pub mod tail;
pub mod template;

use std::fmt;
use std::path::{Path, PathBuf};

pub use decomposer::{compile_decomposer, Method, MethodTable, Shape};
pub use error::CodegenError;
pub use recognizer::{compile_recognizer, RecognizerOutput};
pub use template::Template;

/// Default artifact file names.
pub const RECOGNIZER_FILE: &str = "facility_domain.py";
pub const DECOMPOSER_FILE: &str = "imitation.py";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Recognizer,
    Decomposer,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Recognizer, Backend::Decomposer];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Recognizer => f.write_str("recognizer"),
            Backend::Decomposer => f.write_str("decomposer"),
        }
    }
}

/// Configuration for Python artifact generation.
#[derive(Debug, Clone)]
pub struct PythonConfig {
    pub out_dir: PathBuf,
    pub recognizer_file: String,
    pub decomposer_file: String,
    pub recognizer_template: Template,
    pub decomposer_template: Template,
}

impl PythonConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        PythonConfig {
            out_dir: out_dir.into(),
            recognizer_file: RECOGNIZER_FILE.to_owned(),
            decomposer_file: DECOMPOSER_FILE.to_owned(),
            recognizer_template: Template::builtin_recognizer(),
            decomposer_template: Template::builtin_decomposer(),
        }
    }

    pub fn path_for(&self, backend: Backend) -> PathBuf {
        match backend {
            Backend::Recognizer => self.out_dir.join(&self.recognizer_file),
            Backend::Decomposer => self.out_dir.join(&self.decomposer_file),
        }
    }

    fn template_for(&self, backend: Backend) -> &Template {
        match backend {
            Backend::Recognizer => &self.recognizer_template,
            Backend::Decomposer => &self.decomposer_template,
        }
    }
}

/// Full text of the recognizer module for `src`.
pub fn recognizer_artifact(src: &str, template: &Template) -> Result<String, CodegenError> {
    let program = causal_core::parse_source(src)?;
    let output = compile_recognizer(&program)?;
    let causes = output.render();
    let m = output.m.to_string();
    template.fill(&[
        (template::CAUSES_MARKER, causes.as_str()),
        (template::M_MARKER, m.as_str()),
    ])
}

/// Full text of the decomposer module for `src`. Parses afresh, sharing
/// nothing with the recognizer.
pub fn decomposer_artifact(src: &str, template: &Template) -> Result<String, CodegenError> {
    let program = causal_core::parse_source(src)?;
    let table = compile_decomposer(&program)?;
    let methods = table.render();
    template.fill(&[(template::METHODS_MARKER, methods.as_str())])
}

pub fn artifact(src: &str, backend: Backend, template: &Template) -> Result<String, CodegenError> {
    match backend {
        Backend::Recognizer => recognizer_artifact(src, template),
        Backend::Decomposer => decomposer_artifact(src, template),
    }
}

/// Outcome of one backend in a [`generate_python`] run.
#[derive(Debug)]
pub struct BackendReport {
    pub backend: Backend,
    /// Path written on success.
    pub result: Result<PathBuf, CodegenError>,
}

/// Run both backends and write each artifact whose backend succeeded. A
/// failing backend leaves its output file untouched and does not stop the
/// other one.
pub fn generate_python(src: &str, config: &PythonConfig) -> Vec<BackendReport> {
    Backend::ALL
        .iter()
        .map(|&backend| {
            let result = artifact(src, backend, config.template_for(backend))
                .and_then(|text| write_artifact(&config.path_for(backend), &text));
            match &result {
                Ok(path) => tracing::info!(%backend, path = %path.display(), "artifact written"),
                Err(e) => tracing::warn!(%backend, error = %e, "backend failed"),
            }
            BackendReport { backend, result }
        })
        .collect()
}

fn write_artifact(path: &Path, text: &str) -> Result<PathBuf, CodegenError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            CodegenError::IoError(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }
    std::fs::write(path, text)
        .map_err(|e| CodegenError::IoError(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(path.to_path_buf())
}
