// SPDX-License-Identifier: Apache-2.0

//! The incremental tailing core: per-file cursors and the engine that
//! drives them from change notifications.

mod cursor;
mod engine;

pub use cursor::FileCursor;
pub use engine::{EngineState, TailEngine};

use std::path::PathBuf;

/// Configuration for the tail engine
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Files to monitor
    pub files: Vec<PathBuf>,
    /// Keywords to watch for, in priority order
    pub keywords: Vec<String>,
    /// Number of words of a matching line copied into the outgoing message
    pub word_limit: usize,
}

impl TailConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.files.is_empty() {
            return Err("At least one file to monitor must be specified".to_string());
        }

        if self.keywords.is_empty() {
            return Err("At least one keyword must be specified".to_string());
        }

        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err("Keywords must be non-empty".to_string());
        }

        if self.word_limit == 0 {
            return Err("Word limit must be a positive integer".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TailConfig {
        TailConfig {
            files: vec![PathBuf::from("/var/log/app.log")],
            keywords: vec!["ERROR".to_string()],
            word_limit: 10,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_requires_files() {
        let mut config = valid_config();
        config.files.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_requires_keywords() {
        let mut config = valid_config();
        config.keywords.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.keywords.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_word_limit() {
        let mut config = valid_config();
        config.word_limit = 0;
        assert!(config.validate().is_err());
    }
}
