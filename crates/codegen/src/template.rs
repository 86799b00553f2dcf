//! Output templates the generated code is inserted into.

use std::path::Path;

use crate::error::CodegenError;

pub const CAUSES_MARKER: &str = "{{CAUSES}}";
pub const M_MARKER: &str = "{{M}}";
pub const METHODS_MARKER: &str = "{{METHODS}}";

const RECOGNIZER: &str = include_str!("../templates/recognizer.py.tmpl");
const DECOMPOSER: &str = include_str!("../templates/decomposer.py.tmpl");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Where the text came from, for diagnostics.
    pub name: String,
    pub text: String,
}

impl Template {
    pub fn builtin_recognizer() -> Self {
        Template {
            name: "built-in recognizer template".into(),
            text: RECOGNIZER.into(),
        }
    }

    pub fn builtin_decomposer() -> Self {
        Template {
            name: "built-in decomposer template".into(),
            text: DECOMPOSER.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CodegenError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CodegenError::IoError(format!("cannot read template {}: {}", path.display(), e))
        })?;
        Ok(Template {
            name: path.display().to_string(),
            text,
        })
    }

    /// Replace each marker with its text. Every marker must be present.
    pub fn fill(&self, inserts: &[(&str, &str)]) -> Result<String, CodegenError> {
        let mut out = self.text.clone();
        for (marker, text) in inserts {
            if !out.contains(marker) {
                return Err(CodegenError::MissingMarker {
                    template: self.name.clone(),
                    marker: (*marker).to_owned(),
                });
            }
            out = out.replace(marker, text.trim_end_matches('\n'));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_carry_their_markers() {
        let r = Template::builtin_recognizer();
        assert!(r.text.contains(CAUSES_MARKER));
        assert!(r.text.contains(M_MARKER));
        assert!(Template::builtin_decomposer().text.contains(METHODS_MARKER));
    }

    #[test]
    fn fill_replaces_markers() {
        let t = Template {
            name: "t".into(),
            text: "M = {{M}}\n".into(),
        };
        assert_eq!(t.fill(&[(M_MARKER, "2")]).unwrap(), "M = 2\n");
    }

    #[test]
    fn missing_marker_is_an_error() {
        let t = Template {
            name: "custom.tmpl".into(),
            text: "nothing here".into(),
        };
        let err = t.fill(&[(METHODS_MARKER, "x")]).unwrap_err();
        assert!(err.to_string().contains("custom.tmpl"), "{}", err);
    }

    #[test]
    fn unreadable_template_file_is_an_io_error() {
        let err = Template::from_file(Path::new("/definitely/not/here.tmpl")).unwrap_err();
        assert!(matches!(err, CodegenError::IoError(_)));
    }
}
