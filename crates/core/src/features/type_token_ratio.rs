//! Word type-token ratio.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::features::{FeatureFailure, FeatureRecord};
use crate::helpers::word_tokens;
use crate::table::Value;
use crate::{ChatFeature, FieldSpec};

static FIELDS: [FieldSpec; 1] = [FieldSpec {
    name: Cow::Borrowed("word_TTR"),
    default: Value::Float(0.0),
}];

/// Distinct lowercased words divided by total words; 0 for a message with no
/// words.
///
/// `"Please, oh please can I go to the ball?"` gives 8/9.
pub fn word_ttr(text: &str) -> f64 {
    let tokens = word_tokens(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    distinct.len() as f64 / tokens.len() as f64
}

/// Emits `word_TTR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTypeTokenRatio;

impl ChatFeature for WordTypeTokenRatio {
    fn name(&self) -> &str {
        "word_type_token_ratio"
    }

    fn fields(&self) -> &[FieldSpec] {
        &FIELDS
    }

    fn compute(&self, message: &str) -> Result<FeatureRecord, FeatureFailure> {
        Ok(FeatureRecord::single("word_TTR", word_ttr(message)))
    }
}
