//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and convert into the application-layer
//! [`EngineConfig`] after validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use webpilot_application::{EngineConfig, ModelRoles};
use webpilot_domain::{TaskIntent, Variable, Viewport};

/// Problems found while turning a [`FileConfig`] into an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("invalid viewport {width}x{height}: both sides must be non-zero")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },
}

/// Complete file configuration (raw TOML structure)
///
/// # Example
///
/// ```toml
/// [engine]
/// max_retries = 2
/// enable_replanning = true
/// critical_steps = ["log in"]
///
/// [browser]
/// headless = true
/// viewport = { width = 1280, height = 720 }
///
/// [models]
/// planner = "large"
/// executor = "fast"
///
/// [[variables]]
/// name = "username"
/// value = "jdoe"
///
/// [[variables]]
/// name = "password"
/// value = "hunter2"
/// secret = true
///
/// [logging]
/// event_log = "runs/events.jsonl"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Control loop settings
    pub engine: FileEngineConfig,
    /// Browser session settings
    pub browser: FileBrowserConfig,
    /// Role-based model selection
    pub models: FileModelsConfig,
    /// Variables available for `{{name}}` interpolation
    pub variables: Vec<FileVariableConfig>,
    /// Event log settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Convert into the engine configuration, validating browser and
    /// variable settings on the way.
    pub fn into_engine_config(self) -> Result<EngineConfig, ConfigValidationError> {
        let viewport = Viewport::new(self.browser.viewport.width, self.browser.viewport.height)
            .map_err(|_| ConfigValidationError::InvalidViewport {
                width: self.browser.viewport.width,
                height: self.browser.viewport.height,
            })?;

        let mut variables = Vec::with_capacity(self.variables.len());
        for raw in &self.variables {
            let variable = if raw.secret {
                Variable::secret(&raw.name, &raw.value)
            } else {
                Variable::new(&raw.name, &raw.value)
            };
            variables.push(variable.map_err(|e| {
                ConfigValidationError::InvalidVariable {
                    name: raw.name.clone(),
                    reason: e.to_string(),
                }
            })?);
        }

        Ok(EngineConfig {
            max_retries: self.engine.max_retries,
            task_timeout_ms: self.engine.task_timeout_ms,
            workflow_timeout_ms: self.engine.workflow_timeout_ms,
            enable_replanning: self.engine.enable_replanning,
            allow_early_exit: self.engine.allow_early_exit,
            min_acceptable_completion: self.engine.min_acceptable_completion.min(100),
            critical_steps: self.engine.critical_steps,
            max_replans_per_step: self.engine.max_replans_per_step,
            max_total_replans: self.engine.max_total_replans,
            unknown_intent_fallback: self.engine.unknown_intent_fallback,
            headless: self.browser.headless,
            viewport,
            variables,
            models: self.models.to_model_roles(),
        })
    }
}

/// Control loop settings from TOML (`[engine]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Maximum retries per task before it fails terminally
    pub max_retries: u32,
    /// Per-task execution timeout in milliseconds
    pub task_timeout_ms: u64,
    /// Whole-run timeout in milliseconds
    pub workflow_timeout_ms: u64,
    /// Whether failures and page drift may trigger a replan
    pub enable_replanning: bool,
    /// Whether the run may stop early once the completion floor is reached
    pub allow_early_exit: bool,
    /// Completion percentage required before an early exit (0..=100)
    pub min_acceptable_completion: u8,
    /// Steps that must succeed before an early exit
    pub critical_steps: Vec<String>,
    /// Replans allowed for any single step
    pub max_replans_per_step: u32,
    /// Replans allowed across the whole run
    pub max_total_replans: u32,
    /// Concrete intent used when a strategic intent has no mapping
    pub unknown_intent_fallback: TaskIntent,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            max_retries: engine.max_retries,
            task_timeout_ms: engine.task_timeout_ms,
            workflow_timeout_ms: engine.workflow_timeout_ms,
            enable_replanning: engine.enable_replanning,
            allow_early_exit: engine.allow_early_exit,
            min_acceptable_completion: engine.min_acceptable_completion,
            critical_steps: engine.critical_steps,
            max_replans_per_step: engine.max_replans_per_step,
            max_total_replans: engine.max_total_replans,
            unknown_intent_fallback: engine.unknown_intent_fallback,
        }
    }
}

/// Browser session settings from TOML (`[browser]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBrowserConfig {
    /// Run without a visible window
    pub headless: bool,
    pub viewport: FileViewportConfig,
}

impl Default for FileBrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: FileViewportConfig::default(),
        }
    }
}

/// Viewport dimensions from TOML; validated on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FileViewportConfig {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
        }
    }
}

/// Role-based model configuration from TOML (`[models]` section)
///
/// Missing or blank roles fall back to the [`ModelRoles`] defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub planner: Option<String>,
    pub executor: Option<String>,
    pub evaluator: Option<String>,
    pub error_handler: Option<String>,
    pub summarizer: Option<String>,
}

fn role(value: &Option<String>, fallback: String) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(fallback)
}

impl FileModelsConfig {
    pub fn to_model_roles(&self) -> ModelRoles {
        let defaults = ModelRoles::default();
        ModelRoles {
            planner: role(&self.planner, defaults.planner),
            executor: role(&self.executor, defaults.executor),
            evaluator: role(&self.evaluator, defaults.evaluator),
            error_handler: role(&self.error_handler, defaults.error_handler),
            summarizer: role(&self.summarizer, defaults.summarizer),
        }
    }
}

/// One `[[variables]]` entry. `name` and `value` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVariableConfig {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub secret: bool,
}

/// Event log settings from TOML (`[logging]` section)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Where the JSONL event log goes; absent means no event log file
    pub event_log: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.engine.max_replans_per_step, 2);
        assert!(config.browser.headless);
        assert_eq!(config.browser.viewport.width, 1280);
        assert!(config.variables.is_empty());
        assert!(config.logging.event_log.is_none());
    }

    #[test]
    fn test_partial_engine_section_keeps_other_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
            [engine]
            max_retries = 1
            allow_early_exit = true
        "#,
        )
        .unwrap();
        assert_eq!(config.engine.max_retries, 1);
        assert!(config.engine.allow_early_exit);
        assert_eq!(config.engine.task_timeout_ms, 30_000);
        assert!(config.engine.enable_replanning);
    }

    #[test]
    fn test_unknown_intent_fallback_parses_lowercase() {
        let config: FileConfig = toml::from_str(
            r#"
            [engine]
            unknown_intent_fallback = "navigate"
        "#,
        )
        .unwrap();
        assert_eq!(config.engine.unknown_intent_fallback, TaskIntent::Navigate);
    }

    #[test]
    fn test_variables_parse_with_secret_flag() {
        let config: FileConfig = toml::from_str(
            r#"
            [[variables]]
            name = "username"
            value = "jdoe"

            [[variables]]
            name = "password"
            value = "hunter2"
            secret = true
        "#,
        )
        .unwrap();
        assert_eq!(config.variables.len(), 2);
        assert!(!config.variables[0].secret);
        assert!(config.variables[1].secret);

        let engine = config.into_engine_config().unwrap();
        assert_eq!(engine.variables.len(), 2);
        assert!(engine.variables[1].is_secret());
        assert_eq!(engine.variables[1].public_value(), "{{password}}");
    }

    #[test]
    fn test_blank_model_role_falls_back_to_default() {
        let config: FileConfig = toml::from_str(
            r#"
            [models]
            planner = "huge"
            evaluator = "  "
        "#,
        )
        .unwrap();
        let roles = config.models.to_model_roles();
        assert_eq!(roles.planner, "huge");
        assert_eq!(roles.evaluator, "fast");
        assert_eq!(roles.error_handler, "large");
    }

    #[test]
    fn test_zero_viewport_is_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [browser]
            viewport = { width = 0, height = 720 }
        "#,
        )
        .unwrap();
        let err = config.into_engine_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::InvalidViewport { width: 0, .. }
        ));
    }

    #[test]
    fn test_empty_variable_name_is_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [[variables]]
            name = "  "
            value = "x"
        "#,
        )
        .unwrap();
        assert!(matches!(
            config.into_engine_config(),
            Err(ConfigValidationError::InvalidVariable { .. })
        ));
    }

    #[test]
    fn test_completion_floor_is_capped() {
        let config: FileConfig = toml::from_str(
            r#"
            [engine]
            min_acceptable_completion = 101
        "#,
        )
        .unwrap();
        let engine = config.into_engine_config().unwrap();
        assert_eq!(engine.min_acceptable_completion, 100);
    }
}
