//! Factory configuration.
//!
//! Settings come from an optional `sitefab.toml`, overlaid by environment
//! variables, then validated.
//!
//! ```toml
//! max_trials_per_component = 3
//! max_trials_final = 5
//! output_root = "output"
//! scaffold_dir = "templates/nextjs"
//!
//! [llm]
//! provider = "anthropic"
//!
//! [validators]
//! build = "npm run build"
//!
//! [validators.timeouts]
//! end_to_end = 900
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sitefab_agents::{LlmAdapter, LlmProvider, RetryPolicy};
use sitefab_kb::DEFAULT_KB_PATH;
use sitefab_runner::ValidatorConfig;

use crate::error::{CoreError, CoreResult};

/// File looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sitefab.toml";

/// Model selection for the default LLM-backed agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider; when unset the first provider with an API key is used
    pub provider: Option<LlmProvider>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmSettings {
    /// Build the HTTP adapter. API keys are only ever read from the environment.
    pub fn adapter(&self) -> CoreResult<LlmAdapter> {
        let mut adapter = match self.provider {
            Some(provider) => {
                let api_key = std::env::var(provider.api_key_var())
                    .ok()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        CoreError::Config(format!(
                            "provider {} selected but {} is not set",
                            provider,
                            provider.api_key_var()
                        ))
                    })?;
                LlmAdapter::new(provider, api_key, self.model.clone())
            }
            None => {
                let adapter = LlmAdapter::from_env()?;
                match &self.model {
                    Some(model) => adapter.with_model(model.clone()),
                    None => adapter,
                }
            }
        };
        if let Some(temperature) = self.temperature {
            adapter = adapter.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            adapter = adapter.with_max_tokens(max_tokens);
        }
        Ok(adapter)
    }
}

/// Configuration of one factory run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Recovery attempts per component
    pub max_trials_per_component: u32,
    /// Recovery attempts for final validation
    pub max_trials_final: u32,
    /// Components generated concurrently
    pub max_parallel_units: usize,
    /// Timeout for a single agent call
    pub agent_timeout_secs: u64,
    /// Transport attempts per agent call, independent of trial budgets
    pub agent_retries: u32,
    /// Base delay of the linear retry back-off
    pub agent_retry_delay_ms: u64,
    /// Directory that receives `site-<timestamp>` output folders
    pub output_root: PathBuf,
    /// Project template copied into every new output folder
    pub scaffold_dir: Option<PathBuf>,
    pub kb_path: PathBuf,
    /// Similar knowledge base entries offered to the debugger
    pub similar_k: usize,
    /// Directory of `<role>.md` prompt overrides
    pub prompts_dir: Option<PathBuf>,
    pub llm: LlmSettings,
    pub validators: ValidatorConfig,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_trials_per_component: 3,
            max_trials_final: 5,
            max_parallel_units: 4,
            agent_timeout_secs: 180,
            agent_retries: 3,
            agent_retry_delay_ms: 1000,
            output_root: PathBuf::from("output"),
            scaffold_dir: None,
            kb_path: PathBuf::from(DEFAULT_KB_PATH),
            similar_k: 2,
            prompts_dir: None,
            llm: LlmSettings::default(),
            validators: ValidatorConfig::default(),
        }
    }
}

impl FactoryConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Read a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Load the effective configuration.
    ///
    /// An explicit path must exist. Without one, `sitefab.toml` in the working
    /// directory is used when present. The environment overlay and validation
    /// are applied in both cases.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                Self::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) -> CoreResult<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SITEFAB_MAX_TRIALS_PER_COMPONENT") {
            self.max_trials_per_component = parse_var("SITEFAB_MAX_TRIALS_PER_COMPONENT", &v)?;
        }
        if let Some(v) = get("SITEFAB_MAX_TRIALS_FINAL") {
            self.max_trials_final = parse_var("SITEFAB_MAX_TRIALS_FINAL", &v)?;
        }
        if let Some(v) = get("SITEFAB_MAX_PARALLEL_UNITS") {
            self.max_parallel_units = parse_var("SITEFAB_MAX_PARALLEL_UNITS", &v)?;
        }
        if let Some(v) = get("SITEFAB_AGENT_TIMEOUT_SECS") {
            self.agent_timeout_secs = parse_var("SITEFAB_AGENT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("SITEFAB_AGENT_RETRIES") {
            self.agent_retries = parse_var("SITEFAB_AGENT_RETRIES", &v)?;
        }
        if let Some(v) = get("SITEFAB_SIMILAR_K") {
            self.similar_k = parse_var("SITEFAB_SIMILAR_K", &v)?;
        }
        if let Some(v) = get("SITEFAB_OUTPUT_ROOT") {
            self.output_root = PathBuf::from(v);
        }
        if let Some(v) = get("SITEFAB_SCAFFOLD_DIR") {
            self.scaffold_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SITEFAB_KB_PATH") {
            self.kb_path = PathBuf::from(v);
        }
        if let Some(v) = get("SITEFAB_PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("AI_PROVIDER") {
            let provider = LlmProvider::parse(&v).ok_or_else(|| {
                CoreError::Config(format!(
                    "AI_PROVIDER must be openai or anthropic, got '{}'",
                    v
                ))
            })?;
            self.llm.provider = Some(provider);
        }
        if let Some(v) = get("SITEFAB_LLM_MODEL") {
            self.llm.model = Some(v);
        }
        Ok(())
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_trials_per_component < 1 {
            return Err(CoreError::Config(
                "max_trials_per_component must be at least 1".to_string(),
            ));
        }
        if self.max_trials_final < 1 {
            return Err(CoreError::Config(
                "max_trials_final must be at least 1".to_string(),
            ));
        }
        if self.max_parallel_units < 1 {
            return Err(CoreError::Config(
                "max_parallel_units must be at least 1".to_string(),
            ));
        }
        if self.agent_timeout_secs == 0 {
            return Err(CoreError::Config(
                "agent_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.agent_retries,
            Duration::from_millis(self.agent_retry_delay_ms),
        )
    }

    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    pub fn with_scaffold_dir(mut self, scaffold_dir: impl Into<PathBuf>) -> Self {
        self.scaffold_dir = Some(scaffold_dir.into());
        self
    }

    pub fn with_trials(mut self, per_component: u32, final_stage: u32) -> Self {
        self.max_trials_per_component = per_component;
        self.max_trials_final = final_stage;
        self
    }

    pub fn with_parallelism(mut self, max_parallel_units: usize) -> Self {
        self.max_parallel_units = max_parallel_units;
        self
    }

    pub fn with_validators(mut self, validators: ValidatorConfig) -> Self {
        self.validators = validators;
        self
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{} has an invalid value '{}'", key, value)))
}
