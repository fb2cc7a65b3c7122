//! Normalizes raw input rows into the canonical chat table.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::ColumnNames;
use crate::error::{Error, Result};
use crate::helpers::{clean_message, lowercase_with_punctuation, sanitize_column_name};
use crate::table::{ChatRow, ChatTable, KeyColumns, RawTable, Value};
use crate::MESSAGE_WITH_PUNCTUATION_COLUMN;

/// Grouping columns a conversation id can be derived from.
const BATCH_COLUMN: &str = "batch_num";
const ROUND_COLUMN: &str = "round_num";

/// Options for [`preprocess`].
#[derive(Debug, Clone, Default)]
pub struct PreprocessOptions {
    pub columns: ColumnNames,
    /// Collapse consecutive same-speaker rows of a conversation into one turn.
    pub turns: bool,
    /// Also produce a lowercase copy of each message with punctuation kept.
    pub keep_punctuated_copy: bool,
}

/// Turn a raw table into a chat table with cleaned messages.
///
/// Header names are sanitized, the conversation id is taken from the
/// configured column or derived from `batch_num`/`round_num`, and the required
/// key columns are checked before any row is touched.
pub fn preprocess(raw: RawTable, options: &PreprocessOptions) -> Result<ChatTable> {
    let input_rows = raw.len();
    let RawTable { headers, records } = raw;
    let mut headers: Vec<String> = headers.iter().map(|h| sanitize_column_name(h)).collect();
    let mut records = records;

    if let Some(dup) = first_duplicate(&headers) {
        return Err(Error::Schema(format!(
            "column '{dup}' appears more than once after sanitizing the header"
        )));
    }
    if let Some((i, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != headers.len())
    {
        return Err(Error::Schema(format!(
            "input row {} has {} fields but the header has {}",
            i + 1,
            record.len(),
            headers.len()
        )));
    }

    let names = options.columns.sanitized();
    if !headers.contains(&names.conversation) {
        derive_conversation_column(&mut headers, &mut records, &names.conversation);
    }

    let missing: Vec<&str> = [&names.conversation, &names.speaker, &names.message]
        .into_iter()
        .filter(|name| !headers.contains(*name))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(Error::Schema(format!(
            "missing required column(s): {}; found: {}",
            missing.join(", "),
            headers.join(", ")
        )));
    }

    let keys = KeyColumns {
        conversation: position(&headers, &names.conversation),
        speaker: position(&headers, &names.speaker),
        message: position(&headers, &names.message),
    };

    if let Some(i) = records
        .iter()
        .position(|r| r[keys.conversation].trim().is_empty())
    {
        return Err(Error::Schema(format!(
            "input row {} has an empty '{}' value",
            i + 1,
            names.conversation
        )));
    }

    if options.turns {
        records = collapse_turns(records, keys);
        debug!(turns = records.len(), "collapsed consecutive same-speaker rows");
    }

    if options.keep_punctuated_copy {
        if headers.iter().any(|h| h == MESSAGE_WITH_PUNCTUATION_COLUMN) {
            return Err(Error::Schema(format!(
                "input already has a '{MESSAGE_WITH_PUNCTUATION_COLUMN}' column"
            )));
        }
        headers.push(MESSAGE_WITH_PUNCTUATION_COLUMN.to_string());
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let rows = records
        .into_iter()
        .map(|mut record| {
            let counter = positions
                .entry(record[keys.conversation].clone())
                .or_insert(0);
            let sequence_index = *counter;
            *counter += 1;

            let raw_message = std::mem::take(&mut record[keys.message]);
            if options.keep_punctuated_copy {
                record.push(lowercase_with_punctuation(&raw_message));
            }
            record[keys.message] = clean_message(&raw_message);

            ChatRow {
                sequence_index,
                cells: record.into_iter().map(Value::Text).collect(),
            }
        })
        .collect();

    let table = ChatTable::new(headers, keys, rows)?;
    info!(
        input_rows,
        rows = table.len(),
        conversations = positions.len(),
        turns = options.turns,
        "preprocessed chat data"
    );
    Ok(table)
}

fn position(headers: &[String], name: &str) -> usize {
    headers.iter().position(|h| h == name).unwrap_or_default()
}

fn first_duplicate(headers: &[String]) -> Option<&str> {
    headers
        .iter()
        .enumerate()
        .find(|(i, h)| headers[..*i].contains(*h))
        .map(|(_, h)| h.as_str())
}

/// Number each distinct (batch, round) pair in order of first appearance and
/// insert the result as the first column. No-op when either grouping column is
/// absent.
fn derive_conversation_column(headers: &mut Vec<String>, records: &mut [Vec<String>], name: &str) {
    let (Some(batch), Some(round)) = (
        headers.iter().position(|h| h == BATCH_COLUMN),
        headers.iter().position(|h| h == ROUND_COLUMN),
    ) else {
        return;
    };

    let mut ids: HashMap<(String, String), usize> = HashMap::new();
    for record in records.iter_mut() {
        let key = (record[batch].clone(), record[round].clone());
        let next = ids.len();
        let id = *ids.entry(key).or_insert(next);
        record.insert(0, id.to_string());
    }
    headers.insert(0, name.to_string());
    debug!(
        conversations = ids.len(),
        "derived '{name}' from '{BATCH_COLUMN}' and '{ROUND_COLUMN}'"
    );
}

/// Merge consecutive rows of the same speaker within each conversation.
///
/// Messages are joined with a single space; every other cell keeps the value
/// of the turn's first row. Conversations may interleave in the input: a row
/// is compared with the previous row of its own conversation.
fn collapse_turns(records: Vec<Vec<String>>, keys: KeyColumns) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = Vec::with_capacity(records.len());
    let mut last_in_conversation: HashMap<String, usize> = HashMap::new();

    for record in records {
        let conversation = record[keys.conversation].clone();
        match last_in_conversation.get(&conversation) {
            Some(&idx) if out[idx][keys.speaker] == record[keys.speaker] => {
                let message = &mut out[idx][keys.message];
                if message.is_empty() {
                    *message = record[keys.message].clone();
                } else if !record[keys.message].is_empty() {
                    message.push(' ');
                    message.push_str(&record[keys.message]);
                }
            }
            _ => {
                last_in_conversation.insert(conversation, out.len());
                out.push(record);
            }
        }
    }
    out
}
