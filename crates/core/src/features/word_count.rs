//! Number of words in a message.

use std::borrow::Cow;

use crate::features::{FeatureFailure, FeatureRecord};
use crate::helpers::word_tokens;
use crate::table::Value;
use crate::{ChatFeature, FieldSpec};

static FIELDS: [FieldSpec; 1] = [FieldSpec {
    name: Cow::Borrowed("num_words"),
    default: Value::Int(0),
}];

/// Count the words in a message.
///
/// Punctuation is dropped before splitting on whitespace, so
/// `"Hello, how are you?"` has 4 words and `"?? !!"` has none.
pub fn count_words(text: &str) -> usize {
    word_tokens(text).len()
}

/// Emits `num_words`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl ChatFeature for WordCount {
    fn name(&self) -> &str {
        "word_count"
    }

    fn fields(&self) -> &[FieldSpec] {
        &FIELDS
    }

    fn compute(&self, message: &str) -> Result<FeatureRecord, FeatureFailure> {
        Ok(FeatureRecord::single("num_words", count_words(message)))
    }
}
