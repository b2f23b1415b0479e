use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_class::ValueClass;

/// Evaluation and inference bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Shared tick budget for every loop, quantifier and recursion step.
    pub max_iterations: usize,
    /// Largest set a cartesian product may materialize.
    pub max_set_cardinality: usize,
    /// Largest base whose power set may be materialized.
    pub max_boolean_base: usize,
    /// Deepest chain of nested function and predicate calls.
    pub max_call_depth: usize,
    pub recursion_type_retries: usize,
}

/// Power sets are enumerated through `u64` bitmasks.
pub const BOOLEAN_BASE_CEILING: usize = 63;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            max_set_cardinality: 100_000,
            max_boolean_base: 20,
            max_call_depth: 64,
            recursion_type_retries: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid environment file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("global '{alias}': {message}")]
    Invalid { alias: String, message: String },
    #[error("limits: {0}")]
    Limits(String),
}

impl ConfigError {
    fn invalid(alias: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid { alias: alias.to_string(), message: message.into() }
    }
}

// ---- TOML deserialization types ----

/// A basic or constant carrier set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseDecl {
    pub alias: String,
    #[serde(default)]
    pub ordered: bool,
    /// Enumeration text, e.g. `{1, 2, 3}`.
    pub value: Option<String>,
}

/// Static and runtime facts about one global.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalDecl {
    /// Typification text, e.g. `ℬ(X1×X1)`.
    #[serde(rename = "type")]
    pub typification: Option<String>,
    pub value: Option<String>,
    pub class: Option<ValueClass>,
    /// Function or predicate definition text, e.g. `[a∈ℬ(R1)] card(a)`.
    pub definition: Option<String>,
}

/// Contents of an environment file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub base: Vec<BaseDecl>,
    #[serde(default)]
    pub global: BTreeMap<String, GlobalDecl>,
}

impl Environment {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let env: Environment = toml::from_str(text)?;
        env.validate()?;
        Ok(env)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_boolean_base > BOOLEAN_BASE_CEILING {
            return Err(ConfigError::Limits(format!(
                "max_boolean_base may not exceed {BOOLEAN_BASE_CEILING}"
            )));
        }
        for base in &self.base {
            if !is_global_name(&base.alias, &['X', 'C']) {
                return Err(ConfigError::invalid(&base.alias, "base sets are named X<n> or C<n>"));
            }
        }
        for (alias, decl) in &self.global {
            if !is_global_name(alias, &['X', 'C', 'S', 'D', 'A', 'T', 'F', 'P']) {
                return Err(ConfigError::invalid(alias, "not a global identifier"));
            }
            if decl.definition.is_some() {
                if !is_global_name(alias, &['F', 'P']) {
                    return Err(ConfigError::invalid(alias, "only F<n> and P<n> take a definition"));
                }
                if decl.typification.is_some() || decl.value.is_some() {
                    return Err(ConfigError::invalid(alias, "a definition cannot be combined with 'type' or 'value'"));
                }
            } else if decl.typification.is_none() && decl.value.is_none() && decl.class.is_none() {
                return Err(ConfigError::invalid(alias, "expected 'type', 'value', 'class' or 'definition'"));
            }
        }
        Ok(())
    }
}

fn is_global_name(alias: &str, prefixes: &[char]) -> bool {
    let mut chars = alias.chars();
    chars.next().is_some_and(|c| prefixes.contains(&c))
        && alias.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}
