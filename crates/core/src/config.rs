//! Editor configuration.
//!
//! Values come from [`EditorConfig::default`], a TOML file, or environment
//! variables layered over the defaults.

use doc_model::{defaults, Color};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const ENV_HISTORY_CAPACITY: &str = "PDF_MARKUP_HISTORY_CAPACITY";
pub const ENV_IMAGE_SCALE: &str = "PDF_MARKUP_IMAGE_SCALE";
pub const ENV_EXPORT_NAME: &str = "PDF_MARKUP_EXPORT_NAME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub font_size: f32,
    pub font_family: String,
    pub color: Color,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_size: defaults::FONT_SIZE,
            font_family: defaults::FONT_FAMILY.to_owned(),
            color: defaults::TEXT_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightDefaults {
    pub color: Color,
    pub opacity: f32,
}

impl Default for HighlightDefaults {
    fn default() -> Self {
        Self { color: defaults::HIGHLIGHT_COLOR, opacity: defaults::HIGHLIGHT_OPACITY }
    }
}

/// Freehand brush used by the draw tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    pub color: Color,
    pub width: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self { color: defaults::BRUSH_COLOR, width: defaults::BRUSH_WIDTH }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo depth; the oldest command is evicted beyond this.
    pub history_capacity: usize,
    pub text: TextDefaults,
    pub highlight: HighlightDefaults,
    pub brush: BrushSettings,
    /// Factor applied to an inserted image's pixel size.
    pub image_scale: f32,
    pub export_file_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            text: TextDefaults::default(),
            highlight: HighlightDefaults::default(),
            brush: BrushSettings::default(),
            image_scale: 0.5,
            export_file_name: "edited.pdf".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_image_scale(mut self, scale: f32) -> Self {
        self.image_scale = scale;
        self
    }

    pub fn with_export_file_name(mut self, name: impl Into<String>) -> Self {
        self.export_file_name = name.into();
        self
    }

    /// Loads configuration from environment variables over the defaults.
    ///
    /// - `PDF_MARKUP_HISTORY_CAPACITY`: undo depth (default: 50)
    /// - `PDF_MARKUP_IMAGE_SCALE`: inserted image scale (default: 0.5)
    /// - `PDF_MARKUP_EXPORT_NAME`: exported file name (default: `edited.pdf`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(ENV_HISTORY_CAPACITY) {
            self.history_capacity = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_HISTORY_CAPACITY.to_owned()))?;
        }

        if let Ok(val) = std::env::var(ENV_IMAGE_SCALE) {
            self.image_scale = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_IMAGE_SCALE.to_owned()))?;
        }

        if let Ok(val) = std::env::var(ENV_EXPORT_NAME) {
            self.export_file_name = val;
        }

        self.validate()?;
        Ok(self)
    }

    /// Loads configuration from a TOML file; missing keys keep their defaults.
    ///
    /// ```toml
    /// history_capacity = 100
    /// image_scale = 0.25
    ///
    /// [highlight]
    /// color = "#00ff00"
    /// opacity = 0.4
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidValue("history_capacity".to_owned()));
        }
        if self.image_scale.is_nan() || self.image_scale <= 0.0 {
            return Err(ConfigError::InvalidValue("image_scale".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.highlight.opacity) {
            return Err(ConfigError::InvalidValue("highlight.opacity".to_owned()));
        }
        if self.text.font_size <= 0.0 {
            return Err(ConfigError::InvalidValue("text.font_size".to_owned()));
        }
        if self.brush.width <= 0.0 {
            return Err(ConfigError::InvalidValue("brush.width".to_owned()));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("export_file_name".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.text.font_size, 16.0);
        assert_eq!(config.text.font_family, "Helvetica");
        assert_eq!(config.highlight.color, Color::YELLOW);
        assert_eq!(config.highlight.opacity, 0.3);
        assert_eq!(config.brush, BrushSettings { color: Color::BLACK, width: 3.0 });
        assert_eq!(config.image_scale, 0.5);
        assert_eq!(config.export_file_name, "edited.pdf");
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EditorConfig::from_toml(
            r##"
            history_capacity = 10

            [highlight]
            color = "#00ff00"
        "##,
        )
        .unwrap();

        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.highlight.color, Color::rgb(0, 255, 0));
        assert_eq!(config.highlight.opacity, 0.3);
        assert_eq!(config.image_scale, 0.5);
    }

    #[test]
    fn test_from_toml_rejects_bad_color() {
        let result = EditorConfig::from_toml("[brush]\ncolor = \"black\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_toml_rejects_zero_capacity() {
        let result = EditorConfig::from_toml("history_capacity = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "history_capacity"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        let config = EditorConfig::default()
            .with_history_capacity(7)
            .with_image_scale(0.25)
            .with_export_file_name("signed.pdf");

        config.save_to_file(&path).unwrap();
        assert_eq!(EditorConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&[ENV_HISTORY_CAPACITY, ENV_IMAGE_SCALE, ENV_EXPORT_NAME]);

        env::set_var(ENV_HISTORY_CAPACITY, "5");
        env::set_var(ENV_IMAGE_SCALE, "1.5");
        env::set_var(ENV_EXPORT_NAME, "out.pdf");

        let config = EditorConfig::from_env().unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.image_scale, 1.5);
        assert_eq!(config.export_file_name, "out.pdf");
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&[ENV_HISTORY_CAPACITY, ENV_IMAGE_SCALE, ENV_EXPORT_NAME]);

        env::remove_var(ENV_IMAGE_SCALE);
        env::remove_var(ENV_EXPORT_NAME);
        env::set_var(ENV_HISTORY_CAPACITY, "lots");
        assert!(EditorConfig::from_env().is_err());
    }

    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
