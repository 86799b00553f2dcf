//! Compiler configuration for `causalc`.
//!
//! Every section and key is optional; command-line flags override what the
//! file says.
//!
//! # Example
//!
//! ```toml
//! [output]
//! dir = "generated"
//! recognizer = "facility_domain.py"
//! decomposer = "imitation.py"
//!
//! [templates]
//! recognizer = "templates/recognizer.py.tmpl"
//! decomposer = "templates/decomposer.py.tmpl"
//!
//! [log]
//! file = "logs/compiler.log"
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use causal_codegen::{PythonConfig, Template};
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "causalc.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// `[output]` section: where the two artifacts are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub dir: Option<PathBuf>,
    /// File name of the recognizer module.
    pub recognizer: Option<String>,
    /// File name of the decomposer module.
    pub decomposer: Option<String>,
}

/// `[templates]` section: overrides for the built-in templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSettings {
    pub recognizer: Option<PathBuf>,
    pub decomposer: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    /// Stage log file, written whether or not compilation succeeds.
    pub file: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: Option<String>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config file from `path`.
///
/// Returns a human-readable error string on failure.
pub fn read_config(path: &Path) -> Result<CompilerConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// Config named on the command line, else `causalc.toml` if it exists,
/// else the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<CompilerConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_config(default)
            } else {
                Ok(CompilerConfig::default())
            }
        }
    }
}

impl CompilerConfig {
    /// Artifact settings with `out_dir` (from `--out`) taking precedence over
    /// `[output] dir`. Template overrides are read here.
    pub fn python_config(&self, out_dir: Option<&Path>) -> Result<PythonConfig, String> {
        let dir = out_dir
            .map(Path::to_path_buf)
            .or_else(|| self.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = PythonConfig::new(dir);
        if let Some(name) = &self.output.recognizer {
            config.recognizer_file = name.clone();
        }
        if let Some(name) = &self.output.decomposer {
            config.decomposer_file = name.clone();
        }
        if let Some(path) = &self.templates.recognizer {
            config.recognizer_template = Template::from_file(path).map_err(|e| e.to_string())?;
        }
        if let Some(path) = &self.templates.decomposer {
            config.decomposer_template = Template::from_file(path).map_err(|e| e.to_string())?;
        }
        Ok(config)
    }
}
