//! Applies every registered feature to every row.

use rayon::prelude::*;
use tracing::info;

use crate::error::{Error, Result};
use crate::features::FeatureRegistry;
use crate::table::{ChatRow, ChatTable, Value};
use crate::{ChatFeature, TextVariant, MESSAGE_WITH_PUNCTUATION_COLUMN};

/// Computes chat-level features for a preprocessed table.
///
/// Rows are featurized in parallel; results are collected by row index, so
/// the values appended to row `i` always come from row `i`'s own message.
#[derive(Debug, Default)]
pub struct ChatLevelCalculator {
    registry: FeatureRegistry,
}

impl ChatLevelCalculator {
    pub fn new(registry: FeatureRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Return `table` with one column per declared feature field appended, in
    /// registration order.
    ///
    /// Column names are checked for collisions before any feature runs. A
    /// feature failure aborts the whole computation and names the row.
    pub fn compute(&self, table: ChatTable) -> Result<ChatTable> {
        let columns = self.registry.output_columns(table.columns())?;
        let punctuated = if self.registry.needs(TextVariant::LowerWithPunctuation) {
            Some(table.column_index(MESSAGE_WITH_PUNCTUATION_COLUMN).ok_or_else(|| {
                Error::Schema(format!(
                    "a registered feature reads '{MESSAGE_WITH_PUNCTUATION_COLUMN}' but the table has no such column"
                ))
            })?)
        } else {
            None
        };

        let values: Vec<Vec<Value>> = table
            .rows()
            .par_iter()
            .enumerate()
            .map(|(index, row)| self.compute_row(&table, index, row, punctuated, columns.len()))
            .collect::<Result<_>>()?;

        info!(
            rows = table.len(),
            features = self.registry.len(),
            columns = columns.len(),
            "computed chat-level features"
        );
        table.append_columns(columns, values)
    }

    fn compute_row(
        &self,
        table: &ChatTable,
        index: usize,
        row: &ChatRow,
        punctuated: Option<usize>,
        width: usize,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(width);
        for feature in self.registry.features() {
            let text = match (feature.input(), punctuated) {
                (TextVariant::LowerWithPunctuation, Some(idx)) => row.cells[idx].to_text(),
                _ => table.message(row),
            };
            let laid_out = feature
                .compute(&text)
                .and_then(|record| record.layout(feature.fields()))
                .map_err(|failure| Error::FeatureComputation {
                    row: index,
                    conversation_id: table.conversation_id(row).into_owned(),
                    feature: feature.name().to_string(),
                    reason: failure.0,
                })?;
            values.extend(laid_out);
        }
        Ok(values)
    }
}
