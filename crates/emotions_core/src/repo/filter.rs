//! Parameterized WHERE-clause construction for emotion queries.
//!
//! # Invariants
//! - `user_context = ?` is always the first condition and is always bound to
//!   the caller's context; filters cannot widen the scope.
//! - Every filter value is a bind parameter. Only fixed column names and
//!   operators ever reach the SQL text.

use crate::model::emotion::{is_blank, EmotionFilter};
use chrono::NaiveDate;
use rusqlite::types::Value;

/// SQL fragment plus positional bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterClause {
    pub sql: String,
    pub bind_values: Vec<Value>,
}

struct ClauseBuilder {
    conditions: Vec<&'static str>,
    bind_values: Vec<Value>,
}

impl ClauseBuilder {
    fn push(&mut self, condition: &'static str, value: Value) {
        self.conditions.push(condition);
        self.bind_values.push(value);
    }

    fn push_contains(&mut self, condition: &'static str, needle: Option<&String>) {
        if let Some(needle) = needle {
            if !is_blank(Some(needle.as_str())) {
                self.push(condition, Value::Text(needle.to_lowercase()));
            }
        }
    }
}

/// Builds `WHERE ...` for the given context and filter.
pub(crate) fn build_filter_clause(user_context: &str, filter: &EmotionFilter) -> FilterClause {
    let mut builder = ClauseBuilder {
        conditions: Vec::new(),
        bind_values: Vec::new(),
    };

    builder.push("user_context = ?", Value::Text(user_context.to_string()));

    if let Some(nummer) = filter.nummer {
        builder.push("nummer = ?", Value::Integer(nummer));
    }
    builder.push_contains("instr(casefold(emotion), ?) > 0", filter.emotion.as_ref());
    if let Some(from) = filter.datum_von {
        builder.push("datum >= ?", date_value(from));
    }
    if let Some(until) = filter.datum_bis {
        builder.push("datum <= ?", date_value(until));
    }
    if let Some(from) = filter.alter_von {
        builder.push("\"alter\" >= ?", Value::Integer(from));
    }
    if let Some(until) = filter.alter_bis {
        builder.push("\"alter\" <= ?", Value::Integer(until));
    }
    if let Some(kind) = filter.quellenart {
        builder.push("quellenart = ?", Value::Text(kind.as_label().to_string()));
    }
    builder.push_contains("instr(casefold(quelle), ?) > 0", filter.quelle.as_ref());
    builder.push_contains(
        "instr(casefold(koerperteil), ?) > 0",
        filter.koerperteil.as_ref(),
    );
    builder.push_contains(
        "instr(casefold(auswirkungen), ?) > 0",
        filter.auswirkungen.as_ref(),
    );
    builder.push_contains(
        "instr(casefold(bemerkungen), ?) > 0",
        filter.bemerkungen.as_ref(),
    );

    FilterClause {
        sql: format!("WHERE {}", builder.conditions.join(" AND ")),
        bind_values: builder.bind_values,
    }
}

// Same text layout rusqlite uses when binding a `NaiveDate` directly.
fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}
