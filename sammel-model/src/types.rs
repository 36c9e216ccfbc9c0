//! Value and type model for albums.
//!
//! These types describe an album's schema (`FieldType`, `MetaItemField`) and
//! its content (`FieldValue`, `ItemField`, `AlbumItem`, `AlbumItemPicture`)
//! without any knowledge of how they are persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Text form used for stored and user-entered dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text form used for stored times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("Unknown field type: {0}")]
    UnknownType(String),
    #[error("'{input}' is not a valid {field_type} value")]
    Invalid { field_type: FieldType, input: String },
    #[error("{0} values are assigned by the store and cannot be entered")]
    NotEditable(FieldType),
}

// ── Field Types ─────────────────────────────────────────────────────────────

/// The closed set of types an album field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Id,
    Text,
    Integer,
    Decimal,
    Date,
    Time,
    Option,
    StarRating,
    Url,
    Uuid,
    Picture,
}

impl FieldType {
    /// Types that may be chosen for user-authored fields.
    pub const USER_TYPES: [FieldType; 8] = [
        FieldType::Text,
        FieldType::Integer,
        FieldType::Decimal,
        FieldType::StarRating,
        FieldType::Option,
        FieldType::Date,
        FieldType::Time,
        FieldType::Url,
    ];

    pub fn is_user_type(self) -> bool {
        Self::USER_TYPES.contains(&self)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Id | FieldType::Integer | FieldType::Decimal | FieldType::StarRating
        )
    }

    /// Name recorded in an album's type-info table.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Id => "Id",
            FieldType::Text => "Text",
            FieldType::Integer => "Integer",
            FieldType::Decimal => "Decimal",
            FieldType::Date => "Date",
            FieldType::Time => "Time",
            FieldType::Option => "Option",
            FieldType::StarRating => "StarRating",
            FieldType::Url => "Url",
            FieldType::Uuid => "Uuid",
            FieldType::Picture => "Picture",
        }
    }

    /// Declared column type of the content table.
    pub fn storage_type(self) -> &'static str {
        match self {
            FieldType::Id | FieldType::Integer | FieldType::StarRating => "INTEGER",
            FieldType::Text
            | FieldType::Url
            | FieldType::Uuid
            | FieldType::Option
            | FieldType::Picture => "TEXT",
            FieldType::Decimal => "REAL",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
        }
    }

    /// Value written into existing rows when a column of this type is appended.
    ///
    /// Dates and times default to the local clock at the time of the call.
    /// `Id` has no default.
    pub fn default_value(self) -> Option<FieldValue> {
        let value = match self {
            FieldType::Id => return None,
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Integer => FieldValue::Integer(0),
            FieldType::Decimal => FieldValue::Decimal(0.0),
            FieldType::Date => FieldValue::Date(Local::now().date_naive()),
            FieldType::Time => FieldValue::Time(Local::now().time().with_nanosecond(0)?),
            FieldType::Option => FieldValue::Option(OptionType::Unknown),
            FieldType::StarRating => FieldValue::StarRating(StarRating::ZeroStars),
            FieldType::Url => FieldValue::Url(String::new()),
            FieldType::Uuid => FieldValue::Uuid(Uuid::new_v4()),
            FieldType::Picture => FieldValue::Picture(String::new()),
        };
        Some(value)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            FieldType::Id,
            FieldType::Text,
            FieldType::Integer,
            FieldType::Decimal,
            FieldType::Date,
            FieldType::Time,
            FieldType::Option,
            FieldType::StarRating,
            FieldType::Url,
            FieldType::Uuid,
            FieldType::Picture,
        ];
        let s = s.trim();
        if s.eq_ignore_ascii_case("number") {
            return Ok(FieldType::Decimal);
        }
        all.into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValueError::UnknownType(s.to_string()))
    }
}

// ── Option / Star Rating ────────────────────────────────────────────────────

/// Tri-state value of an `Option` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptionType {
    Yes,
    No,
    #[default]
    Unknown,
}

impl OptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Yes => "Yes",
            OptionType::No => "No",
            OptionType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [OptionType::Yes, OptionType::No, OptionType::Unknown]
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValueError::Invalid {
                field_type: FieldType::Option,
                input: s.to_string(),
            })
    }
}

/// Rating from zero to five stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum StarRating {
    #[default]
    ZeroStars,
    OneStar,
    TwoStars,
    ThreeStars,
    FourStars,
    FiveStars,
}

impl StarRating {
    pub fn value(self) -> u8 {
        match self {
            StarRating::ZeroStars => 0,
            StarRating::OneStar => 1,
            StarRating::TwoStars => 2,
            StarRating::ThreeStars => 3,
            StarRating::FourStars => 4,
            StarRating::FiveStars => 5,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(StarRating::ZeroStars),
            1 => Some(StarRating::OneStar),
            2 => Some(StarRating::TwoStars),
            3 => Some(StarRating::ThreeStars),
            4 => Some(StarRating::FourStars),
            5 => Some(StarRating::FiveStars),
            _ => None,
        }
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

// ── Field Values ────────────────────────────────────────────────────────────

/// A typed field value. Each variant corresponds to one `FieldType`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Id(i64),
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Option(OptionType),
    StarRating(StarRating),
    Url(String),
    Uuid(Uuid),
    Picture(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Id(_) => FieldType::Id,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Decimal(_) => FieldType::Decimal,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Time(_) => FieldType::Time,
            FieldValue::Option(_) => FieldType::Option,
            FieldValue::StarRating(_) => FieldType::StarRating,
            FieldValue::Url(_) => FieldType::Url,
            FieldValue::Uuid(_) => FieldType::Uuid,
            FieldValue::Picture(_) => FieldType::Picture,
        }
    }

    /// Parse user input into a value of the given type.
    pub fn parse(field_type: FieldType, input: &str) -> Result<Self, ValueError> {
        let invalid = || ValueError::Invalid {
            field_type,
            input: input.to_string(),
        };
        let trimmed = input.trim();
        match field_type {
            FieldType::Id => Err(ValueError::NotEditable(FieldType::Id)),
            FieldType::Text => Ok(FieldValue::Text(input.to_string())),
            FieldType::Url => Ok(FieldValue::Url(trimmed.to_string())),
            FieldType::Picture => Ok(FieldValue::Picture(trimmed.to_string())),
            FieldType::Integer => trimmed
                .parse()
                .map(FieldValue::Integer)
                .map_err(|_| invalid()),
            FieldType::Decimal => trimmed
                .parse()
                .map(FieldValue::Decimal)
                .map_err(|_| invalid()),
            FieldType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| invalid()),
            FieldType::Time => parse_time(trimmed).map(FieldValue::Time).ok_or_else(invalid),
            FieldType::Option => trimmed.parse().map(FieldValue::Option),
            FieldType::StarRating => trimmed
                .parse::<i64>()
                .ok()
                .and_then(StarRating::from_value)
                .map(FieldValue::StarRating)
                .ok_or_else(invalid),
            FieldType::Uuid => Uuid::parse_str(trimmed)
                .map(FieldValue::Uuid)
                .map_err(|_| invalid()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Url(s) | FieldValue::Picture(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Id(n) | FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// Accepts `HH:MM:SS` and `HH:MM`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Id(n) | FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Text(s) | FieldValue::Url(s) | FieldValue::Picture(s) => f.write_str(s),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            FieldValue::Option(o) => write!(f, "{o}"),
            FieldValue::StarRating(r) => write!(f, "{r}"),
            FieldValue::Uuid(u) => write!(f, "{u}"),
        }
    }
}

// ── Field Descriptors ───────────────────────────────────────────────────────

/// Schema entry of an album: a field's name, type and quicksearch flag.
///
/// The full triple identifies a field in structural operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaItemField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub quick_searchable: bool,
}

impl MetaItemField {
    pub fn new(name: impl Into<String>, field_type: FieldType, quick_searchable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            quick_searchable,
        }
    }

    /// Case-insensitive name comparison, as used for field-name uniqueness.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl fmt::Display for MetaItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.name, self.field_type)?;
        if self.quick_searchable {
            f.write_str(", quicksearch")?;
        }
        f.write_str(")")
    }
}

/// A named value inside an `AlbumItem`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemField {
    pub name: String,
    pub field_type: FieldType,
    pub value: FieldValue,
}

impl ItemField {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            field_type: value.field_type(),
            value,
        }
    }

    /// A field is valid when it has a name, its value matches its declared
    /// type, and it is not the store-assigned id.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.field_type != FieldType::Id
            && self.value.field_type() == self.field_type
    }
}

// ── Items ───────────────────────────────────────────────────────────────────

/// Link between an item and one stored picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumItemPicture {
    pub id: Option<i64>,
    pub original_filename: String,
    pub thumbnail_filename: String,
    pub album_name: String,
    pub album_item_id: Option<i64>,
}

impl AlbumItemPicture {
    pub fn new(
        original_filename: impl Into<String>,
        thumbnail_filename: impl Into<String>,
        album_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            original_filename: original_filename.into(),
            thumbnail_filename: thumbnail_filename.into(),
            album_name: album_name.into(),
            album_item_id: None,
        }
    }

    /// True when both pictures reference the same files on disk.
    pub fn same_files(&self, other: &AlbumItemPicture) -> bool {
        self.original_filename == other.original_filename
            && self.thumbnail_filename == other.thumbnail_filename
    }
}

/// One row of album content.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumItem {
    pub album_name: String,
    /// Assigned by the store when the item is first added.
    pub id: Option<i64>,
    pub fields: Vec<ItemField>,
    pub content_version: Option<Uuid>,
    pub pictures: Vec<AlbumItemPicture>,
}

impl AlbumItem {
    pub fn new(album_name: impl Into<String>) -> Self {
        Self {
            album_name: album_name.into(),
            id: None,
            fields: Vec::new(),
            content_version: None,
            pictures: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set_field_value(name, value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&ItemField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value)
    }

    /// Replace the value of an existing field, or append a new one.
    pub fn set_field_value(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.field_type = value.field_type();
                field.value = value;
            }
            None => self.fields.push(ItemField::new(name, value)),
        }
    }

    /// Append a field. Returns false, leaving the item unchanged, if a field
    /// of that name (ignoring case) already exists.
    pub fn add_field(&mut self, field: ItemField) -> bool {
        if self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(&field.name)) {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn remove_field(&mut self, name: &str) -> Option<ItemField> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    pub fn rename_field(&mut self, old_name: &str, new_name: &str) -> bool {
        match self.fields.iter_mut().find(|f| f.name == old_name) {
            Some(field) => {
                field.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Move a field directly after `preceding`, or to the front when
    /// `preceding` is `None`. Returns false if either field is missing.
    pub fn reorder_field(&mut self, name: &str, preceding: Option<&str>) -> bool {
        let Some(pos) = self.fields.iter().position(|f| f.name == name) else {
            return false;
        };
        if preceding.is_some_and(|p| !self.fields.iter().any(|f| f.name == p)) {
            return false;
        }
        let field = self.fields.remove(pos);
        let target = match preceding {
            Some(p) => self
                .fields
                .iter()
                .position(|f| f.name == p)
                .map_or(self.fields.len(), |i| i + 1),
            None => 0,
        };
        self.fields.insert(target, field);
        true
    }

    /// All fields valid and no field name used twice.
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(ItemField::is_valid)
            && self.fields.iter().enumerate().all(|(i, f)| {
                !self.fields[..i]
                    .iter()
                    .any(|other| other.name.eq_ignore_ascii_case(&f.name))
            })
    }
}
