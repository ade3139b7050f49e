use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CanvasError, CanvasResult};
use crate::jsx::Dialect;

/// Editor settings. Every field has a default so a partial YAML file is enough.
///
/// ```yaml
/// dialect: TSX
/// max_render_depth: 32
/// preserved_attributes: [key, ref, data-testid]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub dialect: Dialect,
    /// Name of the component that wraps a bare markup fragment
    pub wrapper_component: String,
    /// Element the synthetic wrapper renders as
    pub wrapper_tag: String,
    /// Attributes the patcher never removes from a matched element
    pub preserved_attributes: Vec<String>,
    /// Editor-only attributes; never written to source or clean output
    pub instrumentation_attributes: Vec<String>,
    pub max_render_depth: usize,
    /// Script placed in the preview document head
    pub tailwind_cdn: String,
    /// Outline color of the hover highlight in selection mode
    pub highlight_color: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Jsx,
            wrapper_component: "Sandbox".to_string(),
            wrapper_tag: "div".to_string(),
            preserved_attributes: vec!["key".to_string(), "ref".to_string()],
            instrumentation_attributes: vec![
                "contenteditable".to_string(),
                "data-editing".to_string(),
                "data-canvas-hover".to_string(),
            ],
            max_render_depth: 64,
            tailwind_cdn: "https://cdn.tailwindcss.com".to_string(),
            highlight_color: "#ef4444".to_string(),
        }
    }
}

impl CanvasConfig {
    pub fn from_yaml_str(yaml: &str) -> CanvasResult<Self> {
        let config: CanvasConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CanvasError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> CanvasResult<()> {
        if self.max_render_depth == 0 {
            return Err(CanvasError::Config(
                "max_render_depth must be at least 1".to_string(),
            ));
        }
        let tag_ok = self
            .wrapper_tag
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase())
            .unwrap_or(false)
            && self.wrapper_tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !tag_ok {
            return Err(CanvasError::Config(format!(
                "wrapper_tag '{}' is not an intrinsic element name",
                self.wrapper_tag
            )));
        }
        if self.wrapper_component.is_empty() {
            return Err(CanvasError::Config("wrapper_component must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn is_preserved(&self, attribute: &str) -> bool {
        self.preserved_attributes.iter().any(|a| a == attribute)
    }

    pub fn is_instrumentation(&self, attribute: &str) -> bool {
        self.instrumentation_attributes.iter().any(|a| a == attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = CanvasConfig::from_yaml_str("dialect: TSX\nmax_render_depth: 8\n").unwrap();
        assert_eq!(config.dialect, Dialect::Tsx);
        assert_eq!(config.max_render_depth, 8);
        assert_eq!(config.wrapper_component, "Sandbox");
        assert!(config.is_preserved("key"));
        assert!(config.is_instrumentation("contenteditable"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(CanvasConfig::from_yaml_str("max_render_depth: 0").is_err());
        assert!(CanvasConfig::from_yaml_str("wrapper_tag: Div").is_err());
        assert!(CanvasConfig::from_yaml_str("dialect: [1, 2]").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wrapper_tag: section").unwrap();
        let config = CanvasConfig::from_file(file.path()).unwrap();
        assert_eq!(config.wrapper_tag, "section");

        let missing = CanvasConfig::from_file("/nonexistent/livecanvas.yaml");
        assert!(matches!(missing, Err(CanvasError::Config(_))));
    }
}
