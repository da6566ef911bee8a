//! Declarative request validation.
//!
//! A [`RuleTable`] lists, per field, the rules the field must satisfy.
//! [`validate`] walks the whole table in one pass and collects every
//! failure into a field -> messages map. Empty values (absent, `null`, `""`)
//! only ever trip `Required`; the remaining rules run on present values.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::db::RepoError;

mod payload;

pub use payload::{ImageKind, Payload, UploadedFile};

/// Field name -> human readable failures, in rule order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Nullable,
    String,
    Email,
    /// Minimum length in characters (strings) or KiB (files).
    Min(usize),
    /// Maximum length in characters (strings) or KiB (files).
    Max(usize),
    /// `<field>_confirmation` must carry the same value.
    Confirmed,
    /// The value is the primary key of a row in the table.
    ExistsId(&'static str),
    /// No row of `table` has `column` equal to the value.
    Unique { table: &'static str, column: &'static str },
    Image,
    Mimes(&'static [&'static str]),
}

pub type RuleTable = &'static [(&'static str, &'static [Rule])];

/// Database checks needed by `ExistsId` and `Unique`.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn id_exists(&self, table: &str, id: i64) -> Result<bool, RepoError>;
    async fn value_taken(&self, table: &str, column: &str, value: &str) -> Result<bool, RepoError>;
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

fn attribute(field: &str) -> String {
    field.replace('_', " ")
}

/// Failure reported for a value that a `Unique` rule finds taken.
pub fn taken_message(field: &str) -> String {
    format!("The {} has already been taken.", attribute(field))
}

/// Runs `rules` against `payload`. An empty map means the payload passed.
pub async fn validate<L>(payload: &Payload, rules: RuleTable, lookup: &L) -> Result<FieldErrors, RepoError>
where
    L: RecordLookup + ?Sized,
{
    let mut errors = FieldErrors::new();

    for (field, field_rules) in rules {
        let attr = attribute(field);
        let value = payload.value(field);
        let file = payload.file(field);
        let mut messages = Vec::new();

        if file.is_none() && is_empty(value) {
            if field_rules.contains(&Rule::Required) {
                messages.push(format!("The {attr} field is required."));
                errors.insert(field.to_string(), messages);
            }
            continue;
        }

        for rule in field_rules.iter() {
            match *rule {
                Rule::Required | Rule::Nullable => {}
                Rule::String => {
                    if !matches!(value, Some(Value::String(_))) {
                        messages.push(format!("The {attr} field must be a string."));
                    }
                }
                Rule::Email => {
                    let ok = value
                        .and_then(Value::as_str)
                        .map(|s| is_valid_email(s.trim()))
                        .unwrap_or(false);
                    if !ok {
                        messages.push(format!("The {attr} field must be a valid email address."));
                    }
                }
                Rule::Min(min) => {
                    if let Some(f) = file {
                        if f.size_kib() < min as f64 {
                            messages.push(format!("The {attr} field must be at least {min} kilobytes."));
                        }
                    } else if let Some(s) = value.and_then(Value::as_str) {
                        if s.chars().count() < min {
                            messages.push(format!("The {attr} field must be at least {min} characters."));
                        }
                    }
                }
                Rule::Max(max) => {
                    if let Some(f) = file {
                        if f.size_kib() > max as f64 {
                            messages.push(format!(
                                "The {attr} field must not be greater than {max} kilobytes."
                            ));
                        }
                    } else if let Some(s) = value.and_then(Value::as_str) {
                        if s.chars().count() > max {
                            messages.push(format!(
                                "The {attr} field must not be greater than {max} characters."
                            ));
                        }
                    }
                }
                Rule::Confirmed => {
                    let confirmation = payload.value(&format!("{field}_confirmation"));
                    if confirmation != value {
                        messages.push(format!("The {attr} field confirmation does not match."));
                    }
                }
                Rule::ExistsId(table) => {
                    let exists = match payload.id(field) {
                        Some(id) => lookup.id_exists(table, id).await?,
                        None => false,
                    };
                    if !exists {
                        messages.push(format!("The selected {attr} is invalid."));
                    }
                }
                Rule::Unique { table, column } => {
                    if let Some(s) = value.and_then(Value::as_str) {
                        if lookup.value_taken(table, column, s.trim()).await? {
                            messages.push(taken_message(field));
                        }
                    }
                }
                Rule::Image => {
                    if file.and_then(UploadedFile::kind).is_none() {
                        messages.push(format!("The {attr} field must be an image."));
                    }
                }
                Rule::Mimes(allowed) => {
                    let ok = file
                        .and_then(UploadedFile::kind)
                        .map(|kind| allowed.iter().any(|ext| kind.matches(ext)))
                        .unwrap_or(false);
                    if !ok {
                        messages.push(format!(
                            "The {attr} field must be a file of type: {}.",
                            allowed.join(", ")
                        ));
                    }
                }
            }
        }

        if !messages.is_empty() {
            errors.insert(field.to_string(), messages);
        }
    }

    Ok(errors)
}
