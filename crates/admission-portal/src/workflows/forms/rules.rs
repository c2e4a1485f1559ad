use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::admission::validation::is_valid_email;

/// Extra constraint attached to a form field, written as `name` or `name:argument`
/// (`email`, `numeric`, `min:35`, `max:2048`, `in:Hindi,English`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldRule {
    Email,
    Numeric,
    Integer,
    Date,
    Min(f64),
    Max(f64),
    In(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("unknown validation rule `{0}`")]
    Unknown(String),
    #[error("validation rule `{0}` needs a numeric argument")]
    BadArgument(String),
}

impl FromStr for FieldRule {
    type Err = RuleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (name, argument) = match raw.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (raw, None),
        };
        let bound = |argument: &str| {
            argument
                .parse::<f64>()
                .map_err(|_| RuleError::BadArgument(raw.to_string()))
        };

        match (name, argument) {
            ("email", None) => Ok(FieldRule::Email),
            ("numeric", None) => Ok(FieldRule::Numeric),
            ("integer", None) => Ok(FieldRule::Integer),
            ("date", None) => Ok(FieldRule::Date),
            ("min", Some(argument)) => bound(argument).map(FieldRule::Min),
            ("max", Some(argument)) => bound(argument).map(FieldRule::Max),
            ("in", Some(argument)) if !argument.is_empty() => Ok(FieldRule::In(
                argument.split(',').map(|item| item.trim().to_string()).collect(),
            )),
            _ => Err(RuleError::Unknown(raw.to_string())),
        }
    }
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Email => f.write_str("email"),
            FieldRule::Numeric => f.write_str("numeric"),
            FieldRule::Integer => f.write_str("integer"),
            FieldRule::Date => f.write_str("date"),
            FieldRule::Min(bound) => write!(f, "min:{bound}"),
            FieldRule::Max(bound) => write!(f, "max:{bound}"),
            FieldRule::In(items) => write!(f, "in:{}", items.join(",")),
        }
    }
}

impl TryFrom<String> for FieldRule {
    type Error = RuleError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<FieldRule> for String {
    fn from(rule: FieldRule) -> Self {
        rule.to_string()
    }
}

/// What `min` and `max` compare a value by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Measure {
    Number(f64),
    Characters(usize),
    Kilobytes(f64),
    Items(usize),
}

impl FieldRule {
    /// Message for `attribute` when `value` breaks this rule.
    pub(crate) fn violation(&self, attribute: &str, value: &Value, measure: Measure) -> Option<String> {
        let text = as_text(value);
        match self {
            FieldRule::Email => text
                .filter(|text| is_valid_email(text))
                .is_none()
                .then(|| format!("The {attribute} must be a valid email address.")),
            FieldRule::Numeric => as_number(value)
                .is_none()
                .then(|| format!("The {attribute} must be a number.")),
            FieldRule::Integer => as_number(value)
                .filter(|number| number.fract() == 0.0)
                .is_none()
                .then(|| format!("The {attribute} must be an integer.")),
            FieldRule::Date => text
                .filter(|text| is_date(text))
                .is_none()
                .then(|| format!("The {attribute} is not a valid date.")),
            FieldRule::Min(bound) => {
                (size(measure) < *bound).then(|| match measure {
                    Measure::Number(_) => format!("The {attribute} must be at least {bound}."),
                    Measure::Characters(_) => {
                        format!("The {attribute} must be at least {bound} characters.")
                    }
                    Measure::Kilobytes(_) => {
                        format!("The {attribute} must be at least {bound} kilobytes.")
                    }
                    Measure::Items(_) => format!("The {attribute} must have at least {bound} items."),
                })
            }
            FieldRule::Max(bound) => {
                (size(measure) > *bound).then(|| match measure {
                    Measure::Number(_) => {
                        format!("The {attribute} may not be greater than {bound}.")
                    }
                    Measure::Characters(_) => {
                        format!("The {attribute} may not be greater than {bound} characters.")
                    }
                    Measure::Kilobytes(_) => {
                        format!("The {attribute} may not be greater than {bound} kilobytes.")
                    }
                    Measure::Items(_) => {
                        format!("The {attribute} may not have more than {bound} items.")
                    }
                })
            }
            FieldRule::In(items) => text
                .filter(|text| items.iter().any(|item| item == text))
                .is_none()
                .then(|| format!("The selected {attribute} is invalid.")),
        }
    }
}

fn size(measure: Measure) -> f64 {
    match measure {
        Measure::Number(number) | Measure::Kilobytes(number) => number,
        Measure::Characters(count) | Measure::Items(count) => count as f64,
    }
}

/// Strings are trimmed; numbers are rendered as written.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub(crate) fn is_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()
}
