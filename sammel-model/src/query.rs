//! Structured query predicates and their rendering to query text.
//!
//! Operators are scoped by field type (see [`QueryOperator::for_field_type`]).
//! Every literal is rendered single-quoted with embedded quotes doubled; no
//! other sanitization is applied.

use std::fmt;

use thiserror::Error;

use crate::naming::{
    enclose_name_with_quotes, sanitize_single_quotes, select_column_name, table_name,
};
use crate::types::{FieldType, MetaItemField};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Album has no field named '{0}'")]
    UnknownField(String),
    #[error("Operator '{operator}' cannot be used with {field_type} field '{field}'")]
    OperatorNotAllowed {
        field: String,
        field_type: FieldType,
        operator: &'static str,
    },
    #[error("Field '{0}' needs a number to compare against")]
    EmptyValue(String),
}

// ── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperator {
    Equals,
    NotEquals,
    Like,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    DateEquals,
    Before,
    BeforeOrEqual,
    AfterOrEqual,
    After,
}

const TEXT_OPERATORS: &[QueryOperator] = &[
    QueryOperator::Equals,
    QueryOperator::NotEquals,
    QueryOperator::Like,
];

const NUMBER_OPERATORS: &[QueryOperator] = &[
    QueryOperator::Equals,
    QueryOperator::Less,
    QueryOperator::LessOrEqual,
    QueryOperator::Greater,
    QueryOperator::GreaterOrEqual,
];

const DATE_OPERATORS: &[QueryOperator] = &[
    QueryOperator::DateEquals,
    QueryOperator::Before,
    QueryOperator::BeforeOrEqual,
    QueryOperator::AfterOrEqual,
    QueryOperator::After,
];

const OPTION_OPERATORS: &[QueryOperator] = &[QueryOperator::Equals];

impl QueryOperator {
    /// Operators a field of the given type can be queried with.
    pub fn for_field_type(field_type: FieldType) -> &'static [QueryOperator] {
        match field_type {
            FieldType::Text | FieldType::Url => TEXT_OPERATORS,
            FieldType::Id
            | FieldType::Integer
            | FieldType::Decimal
            | FieldType::StarRating
            | FieldType::Time => NUMBER_OPERATORS,
            FieldType::Date => DATE_OPERATORS,
            FieldType::Option | FieldType::Uuid => OPTION_OPERATORS,
            FieldType::Picture => &[],
        }
    }

    /// Operator as it appears in query text.
    pub fn sql(self) -> &'static str {
        match self {
            QueryOperator::Equals | QueryOperator::DateEquals => "=",
            QueryOperator::NotEquals => "!=",
            QueryOperator::Like => "like",
            QueryOperator::Less | QueryOperator::Before => "<",
            QueryOperator::LessOrEqual | QueryOperator::BeforeOrEqual => "<=",
            QueryOperator::Greater | QueryOperator::After => ">",
            QueryOperator::GreaterOrEqual | QueryOperator::AfterOrEqual => ">=",
        }
    }

    /// Label shown to users. Date operators use before/after wording.
    pub fn label(self) -> &'static str {
        match self {
            QueryOperator::DateEquals => "equals",
            QueryOperator::Before => "before",
            QueryOperator::BeforeOrEqual => "before or equals",
            QueryOperator::AfterOrEqual => "after or equals",
            QueryOperator::After => "after",
            other => other.sql(),
        }
    }

    /// Look up an operator by label among those allowed for `field_type`.
    pub fn from_label(field_type: FieldType, label: &str) -> Option<Self> {
        let label = label.trim();
        Self::for_field_type(field_type)
            .iter()
            .copied()
            .find(|op| op.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Components ──────────────────────────────────────────────────────────────

/// One predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryComponent {
    pub field_name: String,
    pub operator: QueryOperator,
    pub value: String,
}

impl QueryComponent {
    pub fn new(field_name: impl Into<String>, operator: QueryOperator, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field_name: String,
    pub ascending: bool,
}

/// Render components into query text against `album_name`.
///
/// `fields` is the album's current schema; each component must name one of
/// them and use an operator allowed for its type. Components are joined with
/// `AND` when `connect_by_and` is set, `OR` otherwise. With no components the
/// query selects every row.
pub fn build_query(
    components: &[QueryComponent],
    connect_by_and: bool,
    album_name: &str,
    fields: &[MetaItemField],
    sort: Option<&SortOrder>,
) -> Result<String, QueryError> {
    let mut query = format!(
        "SELECT * FROM {}",
        enclose_name_with_quotes(&table_name(album_name))
    );

    let mut predicates = Vec::with_capacity(components.len());
    for component in components {
        let field = find_field(fields, &component.field_name)?;
        if !QueryOperator::for_field_type(field.field_type).contains(&component.operator) {
            return Err(QueryError::OperatorNotAllowed {
                field: field.name.clone(),
                field_type: field.field_type,
                operator: component.operator.label(),
            });
        }
        if field.field_type.is_numeric() && component.value.trim().is_empty() {
            return Err(QueryError::EmptyValue(field.name.clone()));
        }
        predicates.push(predicate(&field.name, component.operator, &component.value));
    }

    if !predicates.is_empty() {
        let connector = if connect_by_and { " AND " } else { " OR " };
        query.push_str(" WHERE ");
        query.push_str(&predicates.join(connector));
    }

    if let Some(sort) = sort {
        let field = find_field(fields, &sort.field_name)?;
        query.push_str(&format!(
            " ORDER BY {} {}",
            select_column_name(&field.name),
            if sort.ascending { "ASC" } else { "DESC" }
        ));
    }

    Ok(query)
}

/// `([field] op 'value')`, wrapping `like` values in `%`. Wildcards inside a
/// `like` value match literally, escaped with `\`.
pub fn predicate(field_name: &str, operator: QueryOperator, value: &str) -> String {
    let value = sanitize_single_quotes(value);
    let literal = match operator {
        QueryOperator::Like if value.contains(['%', '_']) => {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("'%{escaped}%' ESCAPE '\\'")
        }
        QueryOperator::Like => format!("'%{value}%'"),
        _ => format!("'{value}'"),
    };
    format!(
        "({} {} {})",
        select_column_name(field_name),
        operator.sql(),
        literal
    )
}

fn find_field<'a>(fields: &'a [MetaItemField], name: &str) -> Result<&'a MetaItemField, QueryError> {
    fields
        .iter()
        .find(|f| f.name == name)
        .or_else(|| fields.iter().find(|f| f.has_name(name)))
        .ok_or_else(|| QueryError::UnknownField(name.to_string()))
}
