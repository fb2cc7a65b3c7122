use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage, used to attribute a failure to the step that was running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Load,
    Preprocess,
    Featurize,
    Write(f64),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Preprocess => write!(f, "preprocess"),
            Stage::Featurize => write!(f, "featurize"),
            Stage::Write(p) => write!(f, "write (fraction {p})"),
        }
    }
}

/// One artifact that could not be produced.
#[derive(Debug)]
pub struct ArtifactFailure {
    pub fraction: f64,
    pub path: PathBuf,
    pub error: Error,
}

/// Error type for schema, configuration, feature and output failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("feature '{feature}' failed on row {row} (conversation '{conversation_id}'): {reason}")]
    FeatureComputation {
        row: usize,
        conversation_id: String,
        feature: String,
        reason: String,
    },
    #[error("failed to write '{}': {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
    #[error("{}", describe_failures(.failures, .written))]
    ArtifactsFailed {
        failures: Vec<ArtifactFailure>,
        written: Vec<PathBuf>,
    },
}

impl Error {
    /// Attach the stage that was in progress when this error occurred.
    pub fn in_stage(self, stage: Stage) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

fn describe_failures(failures: &[ArtifactFailure], written: &[PathBuf]) -> String {
    let total = failures.len() + written.len();
    match failures.first() {
        Some(first) => format!(
            "{} of {} artifacts failed; first failure at '{}': {}",
            failures.len(),
            total,
            first.path.display(),
            first.error
        ),
        None => format!("0 of {total} artifacts failed"),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_names_fraction() {
        let err = Error::Config("bad".into()).in_stage(Stage::Write(0.25));
        assert_eq!(
            err.to_string(),
            "write (fraction 0.25) stage failed: configuration error: bad"
        );
    }

    #[test]
    fn test_feature_error_names_row() {
        let err = Error::FeatureComputation {
            row: 3,
            conversation_id: "7".into(),
            feature: "num_words".into(),
            reason: "boom".into(),
        };
        assert!(err.to_string().contains("row 3"));
        assert!(err.to_string().contains("conversation '7'"));
    }
}
