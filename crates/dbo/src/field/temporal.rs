//! `timestamp` and `julian_day` fields.

use chrono::{Datelike, DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dbo_core::{ColumnType, FieldValidationError, Result, Value};

use super::{FieldBehavior, FieldSpec, required_diagnostic};
use crate::method::Operation;
use crate::record::Record;

/// Julian Day Number of 0000-12-31 (the day before CE day 1).
const JDN_CE_OFFSET: i64 = 1_721_425;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Storage encoding of a temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalUnit {
    /// Unix seconds.
    Timestamp,
    /// Julian Day Number.
    JulianDay,
}

impl TemporalUnit {
    /// Encode a point in time.
    pub fn encode(self, at: NaiveDateTime) -> i64 {
        match self {
            TemporalUnit::Timestamp => at.and_utc().timestamp(),
            TemporalUnit::JulianDay => i64::from(at.date().num_days_from_ce()) + JDN_CE_OFFSET,
        }
    }

    /// Decode a stored number.
    pub fn decode(self, stored: i64) -> Option<NaiveDateTime> {
        match self {
            TemporalUnit::Timestamp => DateTime::from_timestamp(stored, 0).map(|d| d.naive_utc()),
            TemporalUnit::JulianDay => {
                let ce_days = i32::try_from(stored.checked_sub(JDN_CE_OFFSET)?).ok()?;
                NaiveDate::from_num_days_from_ce_opt(ce_days).map(|d| d.and_time(NaiveTime::MIN))
            }
        }
    }

    fn default_format(self) -> &'static str {
        match self {
            TemporalUnit::Timestamp => "%Y-%m-%d %H:%M:%S",
            TemporalUnit::JulianDay => "%Y-%m-%d",
        }
    }
}

/// Parse human-entered date/time text (UTC).
///
/// Accepts `now`, `today`, RFC 3339, ISO-like `YYYY-MM-DD[ HH:MM[:SS]]`,
/// US `MM/DD/YYYY` and spelled-out month forms.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(Utc::now().naive_utc()),
        "today" => return Some(Utc::now().date_naive().and_time(NaiveTime::MIN)),
        _ => {}
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// A point in time stored as an integer.
#[derive(Debug, Clone, Copy)]
pub struct TemporalField {
    unit: TemporalUnit,
}

impl TemporalField {
    /// Create a temporal field with the given encoding.
    pub const fn new(unit: TemporalUnit) -> Self {
        Self { unit }
    }

    /// The storage encoding.
    pub const fn unit(&self) -> TemporalUnit {
        self.unit
    }

    /// Normalize raw input into the stored form. Unparseable text is kept.
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Int(_) => value,
            Value::Float(f) => Value::Int(f as i64),
            Value::Bool(_) => value,
            Value::Text(text) if text.trim().is_empty() => Value::Null,
            Value::Text(text) => match text.trim().parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => parse_datetime(&text)
                    .map_or(Value::Text(text), |dt| Value::Int(self.unit.encode(dt))),
            },
        }
    }

    /// Set the field to the current time.
    pub fn touch(&self, spec: &FieldSpec, record: &mut Record) {
        let now = self.unit.encode(Utc::now().naive_utc());
        record.set_raw(spec.storage_key(), Value::Int(now));
    }

    /// Parsed value, if one is stored.
    pub fn object(&self, spec: &FieldSpec, record: &Record) -> Option<NaiveDateTime> {
        record
            .raw(&spec.storage_key())
            .and_then(|v| match v {
                Value::Int(n) => Some(*n),
                Value::Float(f) => Some(*f as i64),
                _ => None,
            })
            .and_then(|n| self.unit.decode(n))
    }

    /// Display form using `format`, else the field's default, else ISO-like.
    pub fn readable(&self, spec: &FieldSpec, record: &Record, format: Option<&str>) -> String {
        let format = format
            .or_else(|| spec.format())
            .unwrap_or_else(|| self.unit.default_format());
        self.object(spec, record)
            .map(|dt| dt.format(format).to_string())
            .unwrap_or_default()
    }
}

impl FieldBehavior for TemporalField {
    fn type_name(&self) -> &'static str {
        match self.unit {
            TemporalUnit::Timestamp => "timestamp",
            TemporalUnit::JulianDay => "julian_day",
        }
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(match self.unit {
            TemporalUnit::Timestamp => ColumnType::Timestamp,
            TemporalUnit::JulianDay => ColumnType::Int,
        })
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (format!("{name}_invalid"), Operation::Invalid(name.to_string())),
            (format!("touch_{name}"), Operation::Touch(name.to_string())),
            (format!("{name}_readable"), Operation::Readable(name.to_string())),
            (format!("{name}_obj"), Operation::Object(name.to_string())),
        ]
    }

    fn set(&self, spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        let stored = self.normalize(value);
        if let Value::Text(text) = &stored {
            tracing::warn!(
                class = record.class_name(),
                field = spec.name(),
                value = %text,
                "unrecognized date/time input"
            );
        }
        record.set_raw(spec.storage_key(), stored);
        Ok(())
    }

    fn invalid(&self, spec: &FieldSpec, record: &Record) -> Result<Option<FieldValidationError>> {
        if let Some(diag) = required_diagnostic(spec, record) {
            return Ok(Some(diag));
        }
        Ok(match record.raw(&spec.storage_key()) {
            Some(Value::Text(text)) if !text.is_empty() => Some(FieldValidationError::new(
                spec.name(),
                format!("{} is not a recognizable date/time (got '{text}')", spec.name()),
            )),
            _ => None,
        })
    }
}
