//! Conversation-prefix truncation.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{ChatRow, ChatTable};

// Absorbs float error in products such as 10 * 0.3.
const EPSILON: f64 = 1e-9;

/// Share of each conversation, from its start, kept in one artifact.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Fraction(f64);

impl Fraction {
    pub const FULL: Fraction = Fraction(1.0);

    /// Accepts values in [0, 1]; anything else (including NaN) is a
    /// configuration error.
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Config(format!(
                "truncation fraction {value} is outside [0, 1]"
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_full(self) -> bool {
        self.0 == 1.0
    }

    /// Whole percentage used in output directory names (`0.25` -> 25).
    pub fn percent(self) -> u32 {
        (self.0 * 100.0 + EPSILON).floor() as u32
    }

    /// Rows kept from a conversation of `n` rows: `ceil(n * fraction)`, at
    /// least one when the fraction is positive, none when it is zero.
    pub fn keep_count(self, n: usize) -> usize {
        if n == 0 || self.0 == 0.0 {
            return 0;
        }
        let kept = (n as f64 * self.0 - EPSILON).ceil() as usize;
        kept.clamp(1, n)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Fraction {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Fraction::new(value)
    }
}

/// Keep the first `ceil(n * fraction)` rows of every conversation.
///
/// Conversations appear in order of first appearance and keep their internal
/// row order. The input table is left untouched.
pub fn truncate(table: &ChatTable, fraction: Fraction) -> ChatTable {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&ChatRow>> = HashMap::new();
    for row in table.rows() {
        let id = table.conversation_id(row);
        match groups.get_mut(id.as_ref()) {
            Some(group) => group.push(row),
            None => {
                order.push(id.to_string());
                groups.insert(id.into_owned(), vec![row]);
            }
        }
    }

    let mut rows: Vec<ChatRow> = Vec::new();
    for id in &order {
        let group = &groups[id];
        let keep = fraction.keep_count(group.len());
        debug!(conversation = %id, rows = group.len(), keep, "truncating conversation");
        rows.extend(group.iter().take(keep).map(|row| (*row).clone()));
    }
    table.with_rows(rows)
}
