//! Application configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every section has
//! defaults so a missing or partial file is valid.

use serde::{Deserialize, Serialize};

use crate::import::ImportOption;
use crate::layout::Theme;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub failure_log: FailureLogConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FailureLogConfig {
    /// Oldest entries are evicted past this many.
    #[serde(default = "default_failure_log_capacity")]
    pub capacity: usize,
}

fn default_failure_log_capacity() -> usize {
    100
}

impl Default for FailureLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_failure_log_capacity(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Show the metadata editor after a successful transfer.
    #[serde(default = "default_true")]
    pub edit_model_info: bool,
    #[serde(default)]
    pub default_option: ImportOption,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            edit_model_info: true,
            default_option: ImportOption::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_true")]
    pub show_left_panel: bool,
    #[serde(default = "default_true")]
    pub show_right_panel: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            show_left_panel: true,
            show_right_panel: true,
        }
    }
}

fn default_true() -> bool {
    true
}
