//! Workflow variables and the vault that holds them.
//!
//! Secret values never leave the vault in plain form except through
//! [`Variable::dangerous_value`], which only browser-input code calls at the
//! moment of typing. Everything else (logs, prompts, events, summaries) sees
//! the redacted placeholder.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named workflow variable, optionally secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    value: String,
    secret: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyVariableName);
        }
        Ok(Self {
            name,
            value: value.into(),
            secret: false,
        })
    }

    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Result<Self, DomainError> {
        let mut var = Self::new(name, value)?;
        var.secret = true;
        Ok(var)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// The value as it may appear in logs, prompts and events.
    ///
    /// Secrets come back as their `{{name}}` placeholder.
    pub fn public_value(&self) -> String {
        if self.secret {
            format!("{{{{{}}}}}", self.name)
        } else {
            self.value.clone()
        }
    }

    /// The raw value. Only the browser input path should call this.
    pub fn dangerous_value(&self) -> &str {
        &self.value
    }
}

/// Holds all variables for a run and performs placeholder interpolation.
#[derive(Debug, Clone, Default)]
pub struct VariableVault {
    variables: HashMap<String, Variable>,
}

impl VariableVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: Variable) {
        self.variables.insert(variable.name().to_string(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Replaces every `{{name}}` placeholder with the raw variable value.
    ///
    /// Unknown placeholders are left untouched. The result goes straight
    /// into the browser; it must never be logged.
    pub fn interpolate_dangerously(&self, text: &str) -> String {
        let mut result = text.to_string();
        for variable in self.variables.values() {
            let placeholder = format!("{{{{{}}}}}", variable.name());
            if result.contains(&placeholder) {
                result = result.replace(&placeholder, variable.dangerous_value());
            }
        }
        result
    }

    /// Replaces placeholders with public values, so non-secret variables
    /// resolve while secrets stay redacted. Safe for prompts and logs.
    pub fn interpolate_public(&self, text: &str) -> String {
        let mut result = text.to_string();
        for variable in self.variables.values() {
            let placeholder = format!("{{{{{}}}}}", variable.name());
            if result.contains(&placeholder) {
                result = result.replace(&placeholder, &variable.public_value());
            }
        }
        result
    }

    /// `true` if the text still contains a known placeholder.
    pub fn has_placeholder(&self, text: &str) -> bool {
        self.variables
            .values()
            .any(|v| text.contains(&format!("{{{{{}}}}}", v.name())))
    }
}
