//! Chat-level feature extraction for conversational transcripts.
//!
//! This crate turns a flat table of chat messages into the same table enriched
//! with per-message feature columns. The [`pipeline`] module drives the whole
//! run: preprocessing, featurizing every row once, then writing one artifact
//! per requested conversation-prefix fraction.

use std::borrow::Cow;

/// Trait for chat-level feature functions.
///
/// Implementors map one message to a record of named scalars. They must be
/// pure, deterministic and total: empty or whitespace-only input yields a
/// defined result, never an error.
pub trait ChatFeature: Send + Sync {
    /// Name used when attributing failures.
    fn name(&self) -> &str;

    /// Every field this feature can emit, in column order, with the value
    /// used when a record leaves the field out.
    fn fields(&self) -> &[FieldSpec];

    /// Which normalization of the message this feature reads.
    fn input(&self) -> TextVariant {
        TextVariant::Cleaned
    }

    /// Compute the record for a single message.
    fn compute(&self, message: &str) -> std::result::Result<FeatureRecord, FeatureFailure>;
}

/// Declared output field of a [`ChatFeature`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: Cow<'static, str>,
    pub default: Value,
}

impl FieldSpec {
    pub fn new(name: impl Into<Cow<'static, str>>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

/// Message normalizations produced by preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextVariant {
    /// Lowercase, punctuation stripped, whitespace collapsed.
    Cleaned,
    /// Lowercase, punctuation kept, whitespace collapsed.
    LowerWithPunctuation,
}

mod calculator;
pub mod config;
mod error;
pub mod features;
mod helpers;
pub mod io;
pub mod pipeline;
mod preprocess;
mod table;
mod truncate;

pub use calculator::ChatLevelCalculator;
pub use config::{ColumnNames, FeatureEngineConfig, PipelineConfig};
pub use error::{ArtifactFailure, Error, Result, Stage};
pub use features::{FeatureFailure, FeatureRecord, FeatureRegistry};
pub use helpers::{
    clean_message, lowercase_with_punctuation, normalize_whitespace, sanitize_column_name,
    strip_punctuation, word_tokens,
};
pub use pipeline::{derive_output_path, run, ArtifactReport, FeaturePipeline, PipelineReport};
pub use preprocess::{preprocess, PreprocessOptions};
pub use table::{ChatRow, ChatTable, KeyColumns, RawTable, Value};
pub use truncate::{truncate, Fraction};

/// Column holding the lowercase-with-punctuation copy of each message.
pub const MESSAGE_WITH_PUNCTUATION_COLUMN: &str = "message_lower_with_punc";

/// Fractions analyzed when none are configured.
pub const DEFAULT_FRACTIONS: [f64; 1] = [1.0];

/// Encoding label used when none is configured.
pub const DEFAULT_ENCODING: &str = "utf-8";
