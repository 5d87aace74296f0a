//! `unique_code` fields: short random codes unique within their table.

use chrono::{NaiveDate, Utc};
use dbo_core::{ColumnType, Criteria, Error, Result, Value};
use rand::Rng;

use super::{FieldBehavior, FieldSpec};
use crate::config::DboConfig;
use crate::hooks::{Hook, HookEvent};
use crate::method::Operation;
use crate::record::Record;

/// Consonants only, so codes never spell words and never look numeric.
pub const DEFAULT_CODE_CHARS: &str = "BCDFGHJKLMNPQRSTVWXYZ";

const DATED_PREFIX_WIDTH: usize = 3;

/// Engine-assigned code. Read-only to callers.
#[derive(Debug, Clone)]
pub struct UniqueCodeField {
    length: usize,
    chars: Vec<char>,
    dated: Option<NaiveDate>,
    separator: String,
}

impl Default for UniqueCodeField {
    fn default() -> Self {
        Self {
            length: 8,
            chars: DEFAULT_CODE_CHARS.chars().collect(),
            dated: None,
            separator: "-".to_string(),
        }
    }
}

impl UniqueCodeField {
    /// Number of random characters drawn.
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Alphabet to draw from.
    pub fn chars(mut self, chars: &str) -> Self {
        self.chars = chars.chars().collect();
        self
    }

    /// Prefix codes with the days elapsed since `epoch`, written in the
    /// code alphabet.
    pub fn dated(mut self, epoch: NaiveDate) -> Self {
        self.dated = Some(epoch);
        self
    }

    /// Delimiter between the date prefix and the random part.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Draw one candidate dated today.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.generate_on(Utc::now().date_naive(), rng)
    }

    /// Draw one candidate as of `today`.
    pub fn generate_on<R: Rng + ?Sized>(&self, today: NaiveDate, rng: &mut R) -> String {
        let body = loop {
            let draw: String = (0..self.length)
                .map(|_| self.chars[rng.gen_range(0..self.chars.len())])
                .collect();
            if !draw.chars().all(|c| c.is_ascii_digit()) {
                break draw;
            }
        };
        match self.dated {
            Some(epoch) => {
                let days = (today - epoch).num_days().max(0).unsigned_abs();
                format!("{}{}{body}", self.encode_days(days), self.separator)
            }
            None => body,
        }
    }

    fn encode_days(&self, mut days: u64) -> String {
        let base = self.chars.len() as u64;
        let mut digits = Vec::new();
        loop {
            digits.push(self.chars[(days % base) as usize]);
            days /= base;
            if days == 0 {
                break;
            }
        }
        while digits.len() < DATED_PREFIX_WIDTH {
            digits.push(self.chars[0]);
        }
        digits.iter().rev().collect()
    }

    /// Draw codes until one is unused in the owning table, then store it.
    pub fn assign(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        let class = record.class().clone();
        let table = class.table()?;
        let key = spec.storage_key();
        let attempts = class.config().unique_code_max_attempts;
        let mut rng = rand::thread_rng();

        for attempt in 1..=attempts {
            let candidate = self.generate(&mut rng);
            let taken = table.count_rows(&Criteria::eq(key.as_str(), candidate.as_str()))?;
            if taken == 0 {
                tracing::debug!(
                    class = class.name(),
                    field = spec.name(),
                    code = %candidate,
                    attempt,
                    "assigned unique code"
                );
                let value = Value::Text(candidate);
                record.set_raw(key, value.clone());
                return Ok(value);
            }
            tracing::debug!(
                class = class.name(),
                field = spec.name(),
                code = %candidate,
                attempt,
                "unique code collision"
            );
        }
        Err(Error::CodeSpaceExhausted {
            class: class.name().to_string(),
            field: spec.name().to_string(),
            attempts,
        })
    }
}

impl FieldBehavior for UniqueCodeField {
    fn type_name(&self) -> &'static str {
        "unique_code"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Text)
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (
                format!("assign_{name}"),
                Operation::AssignCode(name.to_string()),
            ),
        ]
    }

    fn implied_hooks(&self, spec: &FieldSpec, _config: &DboConfig) -> Vec<(HookEvent, Hook)> {
        let key = spec.storage_key();
        let assign = format!("assign_{}", spec.name());
        let hook = Hook::new(assign.clone(), move |record: &mut Record| {
            let current = record.raw_value(&key);
            if current.is_empty() {
                record.invoke(&assign, &[])?;
                return Ok(true);
            }
            let table = record.class().table()?;
            if table.count_rows(&Criteria::eq(key.as_str(), current.clone()))? > 0 {
                tracing::warn!(
                    class = record.class_name(),
                    field = %key,
                    code = %current,
                    "unique code already taken; assigning a new one"
                );
                record.invoke(&assign, &[])?;
            }
            Ok(true)
        });
        vec![(HookEvent::PreInsert, hook)]
    }

    fn check(&self, spec: &FieldSpec, _has_method: &dyn Fn(&str) -> bool) -> Result<()> {
        if self.length == 0 || !self.chars.iter().any(|c| !c.is_ascii_digit()) {
            return Err(Error::config(format!(
                "unique_code field `{}` needs a positive length and at least one non-digit character",
                spec.name()
            )));
        }
        Ok(())
    }

    fn set(&self, spec: &FieldSpec, record: &mut Record, _value: Value) -> Result<()> {
        Err(Error::ReadOnly {
            class: record.class_name().to_string(),
            field: spec.name().to_string(),
        })
    }
}
