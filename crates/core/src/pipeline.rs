//! Pipeline driving a dataset from raw CSV to one featurized CSV per
//! truncation fraction.
//!
//! Features are computed once on the full preprocessed table; every fraction
//! then truncates that same featurized table and writes its own artifact.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::calculator::ChatLevelCalculator;
use crate::config::PipelineConfig;
use crate::error::{ArtifactFailure, Error, Result, Stage};
use crate::features::FeatureRegistry;
use crate::io::{read_raw_table, write_table};
use crate::preprocess::{preprocess, PreprocessOptions};
use crate::truncate::{truncate, Fraction};
use crate::TextVariant;

/// Directory component whose contents get a `first_<pct>` level inserted.
const OUTPUT_SEGMENT: &str = "output";

/// One written artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactReport {
    pub fraction: Fraction,
    pub path: PathBuf,
    pub rows: usize,
    pub conversations: usize,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub input_file_path: PathBuf,
    pub input_rows: usize,
    pub preprocessed_rows: usize,
    pub conversations: usize,
    pub turns: bool,
    pub feature_columns: Vec<String>,
    pub artifacts: Vec<ArtifactReport>,
}

impl PipelineReport {
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.path.clone()).collect()
    }
}

/// Output path for one fraction.
///
/// With `turns`, every `chat` in the base path becomes `turn`. The full
/// fraction writes to the base path itself. Other fractions go to
/// `truncated_dir/first_<pct>/<file name>` when a directory is given,
/// otherwise a `first_<pct>` directory is inserted after each `output`
/// directory of the base path, or next to the file when there is none.
pub fn derive_output_path(
    base: &Path,
    fraction: Fraction,
    turns: bool,
    truncated_dir: Option<&Path>,
) -> PathBuf {
    let base = if turns {
        PathBuf::from(base.to_string_lossy().replace("chat", "turn"))
    } else {
        base.to_path_buf()
    };
    if fraction.is_full() {
        return base;
    }

    let segment = format!("first_{}", fraction.percent());
    let file_name = base.file_name().unwrap_or_else(|| OsStr::new("")).to_os_string();
    if let Some(dir) = truncated_dir {
        return dir.join(&segment).join(file_name);
    }

    let components: Vec<Component<'_>> = base.components().collect();
    let last = components.len().saturating_sub(1);
    let mut rewritten = PathBuf::new();
    let mut inserted = false;
    for (i, component) in components.iter().enumerate() {
        rewritten.push(component.as_os_str());
        if i < last && component.as_os_str() == OUTPUT_SEGMENT {
            rewritten.push(&segment);
            inserted = true;
        }
    }
    if inserted {
        return rewritten;
    }

    match base.parent() {
        Some(parent) => parent.join(&segment).join(file_name),
        None => PathBuf::from(&segment).join(file_name),
    }
}

/// Featurizes one dataset.
#[derive(Debug)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    calculator: ChatLevelCalculator,
}

impl FeaturePipeline {
    /// Pipeline with the default feature set.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_registry(config, FeatureRegistry::with_default_features())
    }

    pub fn with_registry(config: PipelineConfig, registry: FeatureRegistry) -> Self {
        Self {
            config,
            calculator: ChatLevelCalculator::new(registry),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, preprocess and featurize once, then truncate and write one
    /// artifact per configured fraction.
    ///
    /// Configuration is validated before the input is read. A failed write
    /// does not stop the remaining fractions or remove artifacts already
    /// written; the run then ends with [`Error::ArtifactsFailed`].
    pub fn run(&self) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;
        let fractions = config.fractions()?;
        let delimiter = config.delimiter as u8;

        info!(input = %config.input_file_path.display(), "initializing featurization");
        let raw = read_raw_table(&config.input_file_path, &config.encoding, delimiter)
            .map_err(|e| e.in_stage(Stage::Load))?;
        let input_rows = raw.len();

        let options = PreprocessOptions {
            columns: config.columns.clone(),
            turns: config.turns,
            keep_punctuated_copy: self
                .calculator
                .registry()
                .needs(TextVariant::LowerWithPunctuation),
        };
        let clean = preprocess(raw, &options).map_err(|e| e.in_stage(Stage::Preprocess))?;
        let preprocessed_rows = clean.len();
        let original_width = clean.columns().len();

        info!("generating chat-level features");
        let featurized = self
            .calculator
            .compute(clean)
            .map_err(|e| e.in_stage(Stage::Featurize))?;
        let feature_columns = featurized.columns()[original_width..].to_vec();
        let conversations = featurized.conversation_ids().len();

        let mut artifacts = Vec::with_capacity(fractions.len());
        let mut failures = Vec::new();
        for fraction in fractions {
            let path = derive_output_path(
                &config.output_file_path_chat_level,
                fraction,
                config.turns,
                config.truncated_output_dir.as_deref(),
            );
            let truncated = truncate(&featurized, fraction);
            info!(
                %fraction,
                rows = truncated.len(),
                path = %path.display(),
                "writing chat-level features"
            );
            match write_table(&truncated, &path) {
                Ok(()) => artifacts.push(ArtifactReport {
                    fraction,
                    rows: truncated.len(),
                    conversations: truncated.conversation_ids().len(),
                    path,
                }),
                Err(e) => {
                    error!(%fraction, path = %path.display(), error = %e, "failed to write artifact");
                    failures.push(ArtifactFailure {
                        fraction: fraction.value(),
                        path,
                        error: e.in_stage(Stage::Write(fraction.value())),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(Error::ArtifactsFailed {
                failures,
                written: artifacts.into_iter().map(|a| a.path).collect(),
            });
        }

        info!(artifacts = artifacts.len(), "all done");
        Ok(PipelineReport {
            input_file_path: config.input_file_path.clone(),
            input_rows,
            preprocessed_rows,
            conversations,
            turns: config.turns,
            feature_columns,
            artifacts,
        })
    }
}

/// Featurize `input_path` with the default features and write one artifact
/// per fraction; returns the written paths in fraction order.
pub fn run(
    input_path: impl Into<PathBuf>,
    output_base_path: impl Into<PathBuf>,
    fractions: &[f64],
    turns: bool,
) -> Result<Vec<PathBuf>> {
    let mut config = PipelineConfig::new(input_path, output_base_path);
    config.analyze_first_pct = fractions.to_vec();
    config.turns = turns;
    let report = FeaturePipeline::new(config).run()?;
    Ok(report.output_paths())
}
