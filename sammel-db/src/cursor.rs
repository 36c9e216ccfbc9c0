//! Row codec: typed values to storage values and back.
//!
//! `encode` and `decode` are the only places that know how each `FieldType`
//! is represented in a content table.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Rows;
use rusqlite::types::{Value, ValueRef};
use sammel_model::types::{DATE_FORMAT, TIME_FORMAT, parse_time};
use sammel_model::{AlbumItem, FieldType, FieldValue, ItemField, StarRating};
use uuid::Uuid;

use crate::content::{CONTENT_VERSION_COLUMN, ID_COLUMN, TYPE_INFO_COLUMN};
use crate::error::StoreError;

pub(crate) fn encode(value: &FieldValue) -> Value {
    match value {
        FieldValue::Id(n) | FieldValue::Integer(n) => Value::Integer(*n),
        FieldValue::Text(s) | FieldValue::Url(s) | FieldValue::Picture(s) => Value::Text(s.clone()),
        FieldValue::Decimal(d) => Value::Real(*d),
        FieldValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        FieldValue::Time(t) => Value::Text(t.format(TIME_FORMAT).to_string()),
        FieldValue::Option(o) => Value::Text(o.as_str().to_string()),
        FieldValue::StarRating(r) => Value::Integer(i64::from(r.value())),
        FieldValue::Uuid(u) => Value::Text(u.to_string()),
    }
}

pub(crate) fn decode(
    column: &str,
    field_type: FieldType,
    raw: ValueRef<'_>,
) -> Result<FieldValue, StoreError> {
    let fail = |reason: String| StoreError::decode(column, field_type, reason);

    if let ValueRef::Null = raw {
        return match field_type {
            FieldType::Text => Ok(FieldValue::Text(String::new())),
            FieldType::Url => Ok(FieldValue::Url(String::new())),
            FieldType::Picture => Ok(FieldValue::Picture(String::new())),
            FieldType::Integer => Ok(FieldValue::Integer(0)),
            FieldType::Decimal => Ok(FieldValue::Decimal(0.0)),
            _ => Err(fail("missing value".to_string())),
        };
    }

    match field_type {
        FieldType::Id => integer(raw).map(FieldValue::Id).ok_or_else(|| fail(describe(raw))),
        FieldType::Integer => integer(raw)
            .map(FieldValue::Integer)
            .ok_or_else(|| fail(describe(raw))),
        FieldType::Decimal => real(raw)
            .map(FieldValue::Decimal)
            .ok_or_else(|| fail(describe(raw))),
        FieldType::Text => text(raw).map(FieldValue::Text).ok_or_else(|| fail(describe(raw))),
        FieldType::Url => text(raw).map(FieldValue::Url).ok_or_else(|| fail(describe(raw))),
        FieldType::Picture => text(raw)
            .map(FieldValue::Picture)
            .ok_or_else(|| fail(describe(raw))),
        FieldType::Date => text(raw)
            .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
            .map(FieldValue::Date)
            .ok_or_else(|| fail(describe(raw))),
        FieldType::Time => text(raw)
            .and_then(|s| parse_time(&s))
            .map(FieldValue::Time)
            .ok_or_else(|| fail(describe(raw))),
        FieldType::Option => {
            let s = text(raw).ok_or_else(|| fail(describe(raw)))?;
            s.parse()
                .map(FieldValue::Option)
                .map_err(|_| fail(format!("'{s}' is not Yes, No or Unknown")))
        }
        FieldType::StarRating => integer(raw)
            .and_then(StarRating::from_value)
            .map(FieldValue::StarRating)
            .ok_or_else(|| fail(format!("{} is not a rating from 0 to 5", describe(raw)))),
        FieldType::Uuid => {
            let s = text(raw).ok_or_else(|| fail(describe(raw)))?;
            Uuid::parse_str(&s)
                .map(FieldValue::Uuid)
                .map_err(|e| fail(format!("'{s}': {e}")))
        }
    }
}

fn integer(raw: ValueRef<'_>) -> Option<i64> {
    match raw {
        ValueRef::Integer(n) => Some(n),
        ValueRef::Real(f) if f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn real(raw: ValueRef<'_>) -> Option<f64> {
    match raw {
        ValueRef::Real(f) => Some(f),
        ValueRef::Integer(n) => Some(n as f64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn text(raw: ValueRef<'_>) -> Option<String> {
    match raw {
        ValueRef::Text(t) => std::str::from_utf8(t).ok().map(str::to_string),
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        _ => None,
    }
}

fn describe(raw: ValueRef<'_>) -> String {
    match raw {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => format!("<{} byte blob>", b.len()),
    }
}

// ── Column Mapping ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum ColumnRole {
    Id,
    TypeInfo,
    ContentVersion,
    Field { name: String, field_type: FieldType },
}

/// How each column of a result set maps onto an `AlbumItem`.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMap {
    roles: Vec<ColumnRole>,
}

impl ColumnMap {
    pub(crate) fn new(
        column_names: &[&str],
        field_types: &HashMap<String, FieldType>,
    ) -> Result<Self, StoreError> {
        let roles = column_names
            .iter()
            .map(|&name| match name {
                ID_COLUMN => Ok(ColumnRole::Id),
                TYPE_INFO_COLUMN => Ok(ColumnRole::TypeInfo),
                CONTENT_VERSION_COLUMN => Ok(ColumnRole::ContentVersion),
                _ => field_types
                    .get(name)
                    .map(|&field_type| ColumnRole::Field {
                        name: name.to_string(),
                        field_type,
                    })
                    .ok_or_else(|| {
                        StoreError::Inconsistent(format!("column '{name}' has no recorded type"))
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { roles })
    }
}

/// Walks a result set row by row, decoding each row into an `AlbumItem`.
pub(crate) struct AlbumItemCursor<'stmt> {
    rows: Rows<'stmt>,
    columns: ColumnMap,
    album_name: String,
}

impl<'stmt> AlbumItemCursor<'stmt> {
    pub(crate) fn new(rows: Rows<'stmt>, columns: ColumnMap, album_name: &str) -> Self {
        Self {
            rows,
            columns,
            album_name: album_name.to_string(),
        }
    }

    pub(crate) fn next_item(&mut self) -> Result<Option<AlbumItem>, StoreError> {
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };

        let mut item = AlbumItem::new(self.album_name.clone());
        for (i, role) in self.columns.roles.iter().enumerate() {
            let raw = row.get_ref(i)?;
            match role {
                ColumnRole::Id => {
                    let id = integer(raw)
                        .ok_or_else(|| StoreError::decode(ID_COLUMN, FieldType::Id, describe(raw)))?;
                    item.id = Some(id);
                }
                ColumnRole::TypeInfo => {}
                ColumnRole::ContentVersion => {
                    let version = text(raw)
                        .and_then(|s| Uuid::parse_str(&s).ok())
                        .ok_or_else(|| {
                            StoreError::decode(CONTENT_VERSION_COLUMN, FieldType::Uuid, describe(raw))
                        })?;
                    item.content_version = Some(version);
                }
                ColumnRole::Field { name, field_type } => {
                    let value = decode(name, *field_type, raw)?;
                    item.fields.push(ItemField::new(name.clone(), value));
                }
            }
        }
        Ok(Some(item))
    }
}
