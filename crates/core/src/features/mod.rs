//! Feature functions and the ordered registry that holds them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::helpers::sanitize_column_name;
use crate::table::Value;
use crate::{ChatFeature, FieldSpec, TextVariant};

mod politeness;
mod type_token_ratio;
mod word_count;

pub use politeness::{PolitenessStrategies, POLITENESS_STRATEGIES};
pub use type_token_ratio::{word_ttr, WordTypeTokenRatio};
pub use word_count::{count_words, WordCount};

/// Failure reported by a feature function for a message it should have handled.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct FeatureFailure(pub String);

/// Named scalar outputs of one feature for one message.
///
/// Fields a record leaves out are filled from the feature's declared defaults
/// when the record is laid out into columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    values: Vec<(Cow<'static, str>, Value)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record holding exactly one field.
    pub fn single(name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self::new().with(name, value)
    }

    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lay the record out against a declared field list.
    ///
    /// The result has one value per declared field, in declaration order.
    /// A field that is not declared is rejected rather than dropped.
    pub fn layout(
        mut self,
        fields: &[FieldSpec],
    ) -> std::result::Result<Vec<Value>, FeatureFailure> {
        if let Some((name, _)) = self
            .values
            .iter()
            .find(|(n, _)| !fields.iter().any(|f| f.name == *n))
        {
            return Err(FeatureFailure(format!("emitted undeclared field '{name}'")));
        }
        Ok(fields
            .iter()
            .map(|field| {
                match self.values.iter().position(|(n, _)| *n == field.name) {
                    Some(pos) => self.values.swap_remove(pos).1,
                    None => field.default.clone(),
                }
            })
            .collect())
    }
}

/// Ordered set of feature functions applied to every row.
///
/// Registration order is column order in the output.
#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<Box<dyn ChatFeature>>,
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.features.iter().map(|feat| feat.name()))
            .finish()
    }
}

impl FeatureRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Word count, type-token ratio, then politeness strategies.
    pub fn with_default_features() -> Self {
        Self::new()
            .with(WordCount)
            .with(WordTypeTokenRatio)
            .with(PolitenessStrategies)
    }

    pub fn register(&mut self, feature: impl ChatFeature + 'static) -> &mut Self {
        self.features.push(Box::new(feature));
        self
    }

    pub fn with(mut self, feature: impl ChatFeature + 'static) -> Self {
        self.register(feature);
        self
    }

    pub fn features(&self) -> &[Box<dyn ChatFeature>] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether any registered feature reads the given text variant.
    pub fn needs(&self, variant: TextVariant) -> bool {
        self.features.iter().any(|f| f.input() == variant)
    }

    /// Sanitized output column names, in registration and declaration order.
    ///
    /// Fails when two sanitized names collide with each other or with one of
    /// the `existing` columns.
    pub fn output_columns(&self, existing: &[String]) -> Result<Vec<String>> {
        let mut owners: HashMap<String, String> = existing
            .iter()
            .map(|c| (c.clone(), "input table".to_string()))
            .collect();
        let mut columns = Vec::new();
        for feature in &self.features {
            for field in feature.fields() {
                let column = sanitize_column_name(&field.name);
                if column.is_empty() {
                    return Err(Error::Config(format!(
                        "feature '{}' declares field '{}' which has no valid column characters",
                        feature.name(),
                        field.name
                    )));
                }
                if let Some(owner) = owners.get(&column) {
                    return Err(Error::Config(format!(
                        "column '{column}' from feature '{}' (field '{}') collides with {owner}",
                        feature.name(),
                        field.name
                    )));
                }
                owners.insert(column.clone(), format!("feature '{}'", feature.name()));
                columns.push(column);
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        fields: Vec<FieldSpec>,
    }

    impl ChatFeature for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn fields(&self) -> &[FieldSpec] {
            &self.fields
        }

        fn compute(&self, _message: &str) -> std::result::Result<FeatureRecord, FeatureFailure> {
            Ok(FeatureRecord::new())
        }
    }

    fn fixed(name: &'static str, fields: &[&'static str]) -> Fixed {
        Fixed {
            name,
            fields: fields.iter().map(|f| FieldSpec::new(*f, 0i64)).collect(),
        }
    }

    #[test]
    fn test_layout_fills_defaults_in_declared_order() {
        let fields = vec![FieldSpec::new("a", 0i64), FieldSpec::new("b", -1i64)];
        let record = FeatureRecord::new().with("b", 7i64);
        assert_eq!(record.layout(&fields).unwrap(), vec![Value::Int(0), Value::Int(7)]);
    }

    #[test]
    fn test_layout_rejects_undeclared_field() {
        let fields = vec![FieldSpec::new("a", 0i64)];
        let record = FeatureRecord::single("z", 1i64);
        assert!(record.layout(&fields).is_err());
    }

    #[test]
    fn test_insert_replaces_existing_value() {
        let mut record = FeatureRecord::single("a", 1i64);
        record.insert("a", 2i64);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_output_columns_sanitized_in_order() {
        let registry = FeatureRegistry::new()
            .with(fixed("first", &["num_words"]))
            .with(fixed("second", &["indirect_(btw)", "1st_person_pl."]));
        let columns = registry.output_columns(&["message".to_string()]).unwrap();
        assert_eq!(columns, vec!["num_words", "indirect_btw", "1st_person_pl"]);
    }

    #[test]
    fn test_output_columns_detects_post_sanitization_collision() {
        let registry = FeatureRegistry::new()
            .with(fixed("first", &["hedge(s)"]))
            .with(fixed("second", &["hedges"]));
        let err = registry.output_columns(&[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("hedges"));
    }

    #[test]
    fn test_output_columns_detects_collision_with_input() {
        let registry = FeatureRegistry::new().with(fixed("dup", &["message"]));
        assert!(registry.output_columns(&["message".to_string()]).is_err());
    }

    #[test]
    fn test_default_registry_order() {
        let registry = FeatureRegistry::with_default_features();
        let names: Vec<&str> = registry.features().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["word_count", "word_type_token_ratio", "politeness_strategies"]);
        assert!(registry.needs(TextVariant::LowerWithPunctuation));
        let columns = registry.output_columns(&[]).unwrap();
        assert_eq!(columns.len(), 2 + POLITENESS_STRATEGIES.len());
    }
}
