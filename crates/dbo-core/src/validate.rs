//! Runtime validation and parsing helpers used by field behaviors.
//!
//! Numeric and currency input arrives as free text from forms and imports, so
//! the checks here are pattern based. Compiled patterns are cached for the
//! lifetime of the program.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

use crate::value::Value;

/// Thread-safe cache of compiled patterns.
struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

const NUMERIC: &str = r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?\s*$";
const INTEGER: &str = r"^\s*[-+]?\d+\s*$";
const CURRENCY: &str = r"^\s*(-)?\s*\$\s*(-)?\s*([\d,]*)(\.(\d{0,2}))?\s*$";

/// Check if a string matches a regex pattern.
///
/// Returns `false` (and logs a warning) if the pattern does not compile.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

/// True if `text` is a plain decimal or scientific number.
pub fn is_numeric(text: &str) -> bool {
    matches_pattern(text, NUMERIC)
}

/// Parse numeric text into `Int` when integral, `Float` otherwise.
///
/// Thousands separators are tolerated. Returns `None` for anything else.
pub fn parse_number(text: &str) -> Option<Value> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '_').collect();
    if matches_pattern(&cleaned, INTEGER) {
        if let Ok(i) = cleaned.trim().parse::<i64>() {
            return Some(Value::Int(i));
        }
    }
    if is_numeric(&cleaned) {
        return cleaned.trim().parse::<f64>().ok().map(Value::Float);
    }
    None
}

/// True if `text` starts with a dollar sign (after an optional minus).
pub fn has_currency_symbol(text: &str) -> bool {
    let t = text.trim_start();
    t.starts_with('$') || t.strip_prefix('-').is_some_and(|r| r.trim_start().starts_with('$'))
}

/// Parse `$1,234.56`-style text into integer pennies.
pub fn parse_currency(text: &str) -> Option<i64> {
    let regex = regex_cache().get_or_compile(CURRENCY).ok()?;
    let caps = regex.captures(text)?;
    let negative = caps.get(1).is_some() || caps.get(2).is_some();
    let dollars_text: String = caps
        .get(3)
        .map_or("", |m| m.as_str())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let cents_text = caps.get(5).map_or("", |m| m.as_str());
    if dollars_text.is_empty() && cents_text.is_empty() {
        return None;
    }
    let dollars: i64 = if dollars_text.is_empty() {
        0
    } else {
        dollars_text.parse().ok()?
    };
    let cents: i64 = match cents_text.len() {
        0 => 0,
        1 => cents_text.parse::<i64>().ok()? * 10,
        _ => cents_text.parse().ok()?,
    };
    let total = dollars.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

/// Insert thousands separators into the integer part of a number.
///
/// `1234567.5` → `1,234,567.5`.
pub fn group_digits(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(r) => ("-", r),
        None => ("", number),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format integer pennies as `$1,234.56`.
pub fn format_currency(pennies: i64) -> String {
    let sign = if pennies < 0 { "-" } else { "" };
    let abs = pennies.unsigned_abs();
    format!(
        "{sign}${}.{:02}",
        group_digits(&(abs / 100).to_string()),
        abs % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("2001"));
        assert!(is_numeric(" -3.25 "));
        assert!(is_numeric(".5"));
        assert!(is_numeric("1e3"));
        assert!(!is_numeric("abc"));
        assert!(!is_numeric("12abc"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("2001"), Some(Value::Int(2001)));
        assert_eq!(parse_number("1,234"), Some(Value::Int(1234)));
        assert_eq!(parse_number("2.5"), Some(Value::Float(2.5)));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$12.50"), Some(1250));
        assert_eq!(parse_currency("$1,234.5"), Some(123_450));
        assert_eq!(parse_currency("$7"), Some(700));
        assert_eq!(parse_currency("-$0.99"), Some(-99));
        assert_eq!(parse_currency("$"), None);
        assert_eq!(parse_currency("$abc"), None);
        assert!(has_currency_symbol(" $3"));
        assert!(has_currency_symbol("-$3"));
        assert!(!has_currency_symbol("300"));
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1234567"), "1,234,567");
        assert_eq!(group_digits("-1234.75"), "-1,234.75");
        assert_eq!(group_digits("999"), "999");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(123_456), "$1,234.56");
        assert_eq!(format_currency(5), "$0.05");
        assert_eq!(format_currency(-250), "-$2.50");
    }

    #[test]
    fn test_invalid_pattern_returns_false() {
        assert!(!matches_pattern("anything", r"[unclosed"));
    }
}
