//! Run configuration: one [`PipelineConfig`] per dataset, optionally loaded
//! from a TOML job file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::helpers::sanitize_column_name;
use crate::io::resolve_encoding;
use crate::truncate::Fraction;
use crate::{DEFAULT_ENCODING, DEFAULT_FRACTIONS};

/// Names of the key columns in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub conversation: String,
    pub speaker: String,
    pub message: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            conversation: "conversation_num".to_string(),
            speaker: "speaker_nickname".to_string(),
            message: "message".to_string(),
        }
    }
}

impl ColumnNames {
    /// The same names with the header sanitization rule applied.
    pub fn sanitized(&self) -> Self {
        Self {
            conversation: sanitize_column_name(&self.conversation),
            speaker: sanitize_column_name(&self.speaker),
            message: sanitize_column_name(&self.message),
        }
    }
}

/// Configuration for featurizing one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input CSV.
    pub input_file_path: PathBuf,
    /// Output path for the full (fraction 1.0) chat-level table; truncated
    /// outputs are derived from it.
    pub output_file_path_chat_level: PathBuf,
    /// Conversation-prefix fractions to write, each in [0, 1].
    #[serde(default = "default_fractions")]
    pub analyze_first_pct: Vec<f64>,
    /// Collapse consecutive same-speaker messages into turns.
    #[serde(default)]
    pub turns: bool,
    /// WHATWG label of the input encoding, e.g. `utf-8` or `macintosh`.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Directory for truncated outputs. When unset, `first_<pct>` is inserted
    /// after the `output` directory of the base path.
    #[serde(default)]
    pub truncated_output_dir: Option<PathBuf>,
    #[serde(default)]
    pub columns: ColumnNames,
}

fn default_fractions() -> Vec<f64> {
    DEFAULT_FRACTIONS.to_vec()
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

fn default_delimiter() -> char {
    ','
}

impl PipelineConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(input_file_path: impl Into<PathBuf>, output_file_path_chat_level: impl Into<PathBuf>) -> Self {
        Self {
            input_file_path: input_file_path.into(),
            output_file_path_chat_level: output_file_path_chat_level.into(),
            analyze_first_pct: default_fractions(),
            turns: false,
            encoding: default_encoding(),
            delimiter: default_delimiter(),
            truncated_output_dir: None,
            columns: ColumnNames::default(),
        }
    }

    /// Validated truncation fractions, in configured order.
    pub fn fractions(&self) -> Result<Vec<Fraction>> {
        if self.analyze_first_pct.is_empty() {
            return Err(Error::Config(
                "analyze_first_pct must list at least one fraction".to_string(),
            ));
        }
        self.analyze_first_pct
            .iter()
            .map(|&p| Fraction::new(p))
            .collect()
    }

    /// Check every setting that can be checked without touching the input.
    pub fn validate(&self) -> Result<()> {
        self.fractions()?;
        resolve_encoding(&self.encoding)?;
        if !self.delimiter.is_ascii() {
            return Err(Error::Config(format!(
                "delimiter '{}' is not a single-byte character",
                self.delimiter
            )));
        }
        let names = self.columns.sanitized();
        for (role, name) in [
            ("conversation", &names.conversation),
            ("speaker", &names.speaker),
            ("message", &names.message),
        ] {
            if name.is_empty() {
                return Err(Error::Config(format!("{role} column name is empty")));
            }
        }
        Ok(())
    }
}

/// A job file listing several datasets.
///
/// ```toml
/// [[dataset]]
/// input_file_path = "data/raw_data/juries_tiny.csv"
/// output_file_path_chat_level = "output/chat/jury_tiny_chat_level.csv"
/// analyze_first_pct = [0.25, 0.5, 0.75, 1.0]
/// turns = false
/// encoding = "macintosh"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineConfig {
    #[serde(rename = "dataset", default)]
    pub datasets: Vec<PipelineConfig>,
}

impl FeatureEngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid job file: {e}")))?;
        if config.datasets.is_empty() {
            return Err(Error::Config("job file lists no [[dataset]] entries".to_string()));
        }
        for dataset in &config.datasets {
            dataset.validate()?;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read job file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("in.csv", "output/chat/out.csv");
        assert_eq!(config.analyze_first_pct, vec![1.0]);
        assert!(!config.turns);
        assert_eq!(config.encoding, "utf-8");
        assert_eq!(config.columns.conversation, "conversation_num");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fraction_out_of_range_is_config_error() {
        let mut config = PipelineConfig::new("in.csv", "out.csv");
        config.analyze_first_pct = vec![0.5, 1.5];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.analyze_first_pct = vec![];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_encoding_is_config_error() {
        let mut config = PipelineConfig::new("in.csv", "out.csv");
        config.encoding = "klingon".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_job_file_parses_datasets() {
        let text = r#"
            [[dataset]]
            input_file_path = "data/juries.csv"
            output_file_path_chat_level = "output/chat/juries.csv"
            analyze_first_pct = [0.25, 0.5, 0.75, 1.0]
            encoding = "macintosh"

            [[dataset]]
            input_file_path = "data/csop.csv"
            output_file_path_chat_level = "output/chat/csop.csv"
            turns = true

            [dataset.columns]
            speaker = "speaker"
        "#;
        let config = FeatureEngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.datasets.len(), 2);
        assert_eq!(config.datasets[0].analyze_first_pct, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(config.datasets[0].encoding, "macintosh");
        assert!(config.datasets[1].turns);
        assert_eq!(config.datasets[1].analyze_first_pct, vec![1.0]);
        assert_eq!(config.datasets[1].columns.speaker, "speaker");
        assert_eq!(config.datasets[1].columns.message, "message");
    }

    #[test]
    fn test_job_file_rejects_bad_fraction_eagerly() {
        let text = r#"
            [[dataset]]
            input_file_path = "a.csv"
            output_file_path_chat_level = "b.csv"
            analyze_first_pct = [-0.1]
        "#;
        assert!(matches!(
            FeatureEngineConfig::from_toml_str(text),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_job_file_requires_datasets() {
        assert!(FeatureEngineConfig::from_toml_str("").is_err());
    }
}
