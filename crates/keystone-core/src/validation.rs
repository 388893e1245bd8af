//! Translation of `validator` failures into catalog codes.
//!
//! Each failed rule becomes a [`FieldFailure`] carrying a closed
//! [`ValidationTag`]; the tag picks the `VAL:*` code and its arguments, and
//! the field label itself is localized through the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::auth::roles;
use crate::i18n::{self, Locale};

/// Underlying kind of the offending value. Magnitude rules pick their
/// message by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    String,
    Sequence,
}

/// Structural validation rules the translator knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationTag {
    Required,
    Email,
    Phone,
    Alpha,
    Alphanum,
    Contains(String),
    OneOf(String),
    Min(String),
    Max(String),
    Gte(String),
    Lte(String),
    Len(String),
    Unknown(String),
}

impl ValidationTag {
    pub fn name(&self) -> &str {
        match self {
            ValidationTag::Required => "required",
            ValidationTag::Email => "email",
            ValidationTag::Phone => "phone",
            ValidationTag::Alpha => "alpha",
            ValidationTag::Alphanum => "alphanum",
            ValidationTag::Contains(_) => "contains",
            ValidationTag::OneOf(_) => "oneof",
            ValidationTag::Min(_) => "min",
            ValidationTag::Max(_) => "max",
            ValidationTag::Gte(_) => "gte",
            ValidationTag::Lte(_) => "lte",
            ValidationTag::Len(_) => "len",
            ValidationTag::Unknown(tag) => tag,
        }
    }

    /// Rule parameter (`3` in `min=3`), if the rule carries one.
    pub fn param(&self) -> Option<&str> {
        match self {
            ValidationTag::Contains(p)
            | ValidationTag::OneOf(p)
            | ValidationTag::Min(p)
            | ValidationTag::Max(p)
            | ValidationTag::Gte(p)
            | ValidationTag::Lte(p)
            | ValidationTag::Len(p) => Some(p),
            _ => None,
        }
    }

    pub fn message_code(&self, kind: FieldKind) -> &'static str {
        match (self, kind) {
            (ValidationTag::Required, _) => "VAL:REQUIRED",
            (ValidationTag::Email, _) => "VAL:EMAIL",
            (ValidationTag::Phone, _) => "VAL:PHONE",
            (ValidationTag::Alpha, _) => "VAL:ALPHA",
            (ValidationTag::Alphanum, _) => "VAL:ALPHANUM",
            (ValidationTag::Contains(_), _) => "VAL:CONTAINS",
            (ValidationTag::OneOf(_), _) => "VAL:ONEOF",

            (ValidationTag::Min(_) | ValidationTag::Gte(_), FieldKind::String) => "VAL:MIN_STRING",
            (ValidationTag::Min(_) | ValidationTag::Gte(_), FieldKind::Sequence) => "VAL:MIN_SLICE",
            (ValidationTag::Min(_), FieldKind::Number) => "VAL:MIN_NUMBER",
            (ValidationTag::Gte(_), FieldKind::Number) => "VAL:GTE_NUMBER",

            (ValidationTag::Max(_) | ValidationTag::Lte(_), FieldKind::String) => "VAL:MAX_STRING",
            (ValidationTag::Max(_) | ValidationTag::Lte(_), FieldKind::Sequence) => "VAL:MAX_SLICE",
            (ValidationTag::Max(_), FieldKind::Number) => "VAL:MAX_NUMBER",
            (ValidationTag::Lte(_), FieldKind::Number) => "VAL:LTE_NUMBER",

            (ValidationTag::Len(_), FieldKind::String) => "VAL:LEN_STRING",
            (ValidationTag::Len(_), FieldKind::Sequence) => "VAL:LEN_SLICE",
            (ValidationTag::Len(_), FieldKind::Number) => "VAL:LEN_NUMBER",

            (ValidationTag::Unknown(_), _) => "VAL:UNKNOWN",
        }
    }
}

/// Map one failed rule to a catalog code and its positional arguments.
///
/// Arguments are `(label)` for parameterless rules and `(label, param)`
/// otherwise. Unknown rules keep the field error and carry the rule name.
pub fn translate_field_failure(
    field_label: &str,
    tag: &ValidationTag,
    kind: FieldKind,
) -> (&'static str, Vec<String>) {
    let code = tag.message_code(kind);
    let args = match tag {
        ValidationTag::Unknown(name) => vec![field_label.to_string(), name.clone()],
        _ => match tag.param() {
            Some(param) => vec![field_label.to_string(), param.to_string()],
            None => vec![field_label.to_string()],
        },
    };
    (code, args)
}

/// A single failed rule on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Field path, dotted for nested structs (`address.city`, `items[0].name`)
    pub field: String,
    pub tag: ValidationTag,
    pub kind: FieldKind,
    /// What the caller sent, rendered as text
    pub input: String,
}

/// Rendered `{input, field, message}` entry of a 422 body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FieldErrorBody {
    pub input: String,
    pub field: String,
    pub message: String,
}

impl FieldFailure {
    /// Flatten every failure in `errors`, sorted by field path.
    pub fn collect(errors: &ValidationErrors) -> Vec<FieldFailure> {
        let mut out = Vec::new();
        flatten(errors, None, &mut out);
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }

    pub fn from_error(field: impl Into<String>, error: &ValidationError) -> FieldFailure {
        let value = error.params.get("value");
        let kind = value.map(kind_of).unwrap_or(FieldKind::String);
        let input = value.map(value_text).unwrap_or_default();

        FieldFailure {
            field: field.into(),
            tag: classify(error),
            kind,
            input,
        }
    }

    pub fn render(&self, locale: Locale) -> FieldErrorBody {
        let leaf = self
            .field
            .rsplit('.')
            .next()
            .unwrap_or(&self.field)
            .split('[')
            .next()
            .unwrap_or(&self.field);
        let label = i18n::field_label(leaf, locale);
        let (code, args) = translate_field_failure(&label, &self.tag, self.kind);

        FieldErrorBody {
            input: self.input.clone(),
            field: self.field.clone(),
            message: i18n::translate(code, locale, &args),
        }
    }
}

fn flatten(errors: &ValidationErrors, prefix: Option<&str>, out: &mut Vec<FieldFailure>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| FieldFailure::from_error(path.clone(), e)));
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, Some(&format!("{path}[{index}]")), out);
                }
            }
        }
    }
}

fn classify(error: &ValidationError) -> ValidationTag {
    let param = |name: &str| error.params.get(name).map(value_text);

    match error.code.as_ref() {
        "required" => ValidationTag::Required,
        "email" => ValidationTag::Email,
        "phone" => ValidationTag::Phone,
        "alpha" => ValidationTag::Alpha,
        "alphanum" => ValidationTag::Alphanum,
        "contains" => ValidationTag::Contains(
            param("needle")
                .or_else(|| param("pattern"))
                .or_else(|| param("param"))
                .unwrap_or_default(),
        ),
        "oneof" => ValidationTag::OneOf(param("param").unwrap_or_default()),
        "min" => ValidationTag::Min(param("param").unwrap_or_default()),
        "max" => ValidationTag::Max(param("param").unwrap_or_default()),
        "gte" => ValidationTag::Gte(param("param").unwrap_or_default()),
        "lte" => ValidationTag::Lte(param("param").unwrap_or_default()),
        "len" => ValidationTag::Len(param("param").unwrap_or_default()),
        "length" => classify_bounds(error, magnitude_of_length),
        "range" => classify_bounds(error, |v| v.as_f64()),
        other => ValidationTag::Unknown(other.to_string()),
    }
}

/// `length` and `range` report one code for both bounds; recover which bound
/// was crossed from the offending value.
fn classify_bounds(error: &ValidationError, magnitude: fn(&Value) -> Option<f64>) -> ValidationTag {
    let params = &error.params;

    if let Some(equal) = params.get("equal") {
        return ValidationTag::Len(value_text(equal));
    }

    let min = params.get("min");
    let max = params.get("max");
    let actual = params.get("value").and_then(magnitude);

    match (min, max, actual) {
        (Some(min), _, Some(actual)) if min.as_f64().is_some_and(|m| actual < m) => {
            ValidationTag::Min(value_text(min))
        }
        (_, Some(max), Some(_)) => ValidationTag::Max(value_text(max)),
        (Some(min), None, _) => ValidationTag::Min(value_text(min)),
        (None, Some(max), None) => ValidationTag::Max(value_text(max)),
        (Some(min), Some(_), None) => ValidationTag::Min(value_text(min)),
        (None, None, _) => ValidationTag::Unknown(error.code.to_string()),
    }
}

fn magnitude_of_length(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        _ => None,
    }
}

fn kind_of(value: &Value) -> FieldKind {
    match value {
        Value::Number(_) => FieldKind::Number,
        Value::Array(_) | Value::Object(_) => FieldKind::Sequence,
        _ => FieldKind::String,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn failed(code: &'static str, value: &str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.add_param("value".into(), &value);
    err
}

/// Turkish GSM number: `+905` followed by nine digits.
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let valid = value.len() == 13
        && value.starts_with("+905")
        && value[4..].bytes().all(|b| b.is_ascii_digit());

    if valid { Ok(()) } else { Err(failed("phone", value)) }
}

pub fn validate_alpha(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.chars().all(char::is_alphabetic) {
        Ok(())
    } else {
        Err(failed("alpha", value))
    }
}

pub fn validate_alphanum(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.chars().all(char::is_alphanumeric) {
        Ok(())
    } else {
        Err(failed("alphanum", value))
    }
}

/// Role must be one of the known roles, matched exactly.
pub fn validate_role(value: &str) -> Result<(), ValidationError> {
    if roles::ALL.contains(&value) {
        Ok(())
    } else {
        let mut err = failed("oneof", value);
        err.add_param("param".into(), &roles::ALL.join(" "));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn length_error(min: Option<u64>, max: Option<u64>, value: &str) -> ValidationError {
        let mut err = ValidationError::new("length");
        if let Some(min) = min {
            err.add_param(Cow::from("min"), &min);
        }
        if let Some(max) = max {
            err.add_param(Cow::from("max"), &max);
        }
        err.add_param(Cow::from("value"), &value);
        err
    }

    #[test]
    fn test_magnitude_codes_follow_kind() {
        let min = ValidationTag::Min("3".into());
        assert_eq!(min.message_code(FieldKind::String), "VAL:MIN_STRING");
        assert_eq!(min.message_code(FieldKind::Sequence), "VAL:MIN_SLICE");
        assert_eq!(min.message_code(FieldKind::Number), "VAL:MIN_NUMBER");

        let gte = ValidationTag::Gte("3".into());
        assert_eq!(gte.message_code(FieldKind::String), "VAL:MIN_STRING");
        assert_eq!(gte.message_code(FieldKind::Number), "VAL:GTE_NUMBER");

        let lte = ValidationTag::Lte("9".into());
        assert_eq!(lte.message_code(FieldKind::Sequence), "VAL:MAX_SLICE");
        assert_eq!(lte.message_code(FieldKind::Number), "VAL:LTE_NUMBER");

        let len = ValidationTag::Len("4".into());
        assert_eq!(len.message_code(FieldKind::Number), "VAL:LEN_NUMBER");
    }

    #[test]
    fn test_args_for_parameterless_and_parameterized_tags() {
        let (code, args) = translate_field_failure("Email", &ValidationTag::Required, FieldKind::String);
        assert_eq!(code, "VAL:REQUIRED");
        assert_eq!(args, vec!["Email"]);

        let (code, args) =
            translate_field_failure("Name", &ValidationTag::Min("3".into()), FieldKind::String);
        assert_eq!(code, "VAL:MIN_STRING");
        assert_eq!(args, vec!["Name", "3"]);
    }

    #[test]
    fn test_unknown_tag_keeps_the_field_error() {
        let (code, args) = translate_field_failure(
            "Name",
            &ValidationTag::Unknown("credit_card".into()),
            FieldKind::String,
        );
        assert_eq!(code, "VAL:UNKNOWN");
        assert_eq!(args, vec!["Name", "credit_card"]);
    }

    #[test]
    fn test_length_below_min_is_min() {
        let failure = FieldFailure::from_error("name", &length_error(Some(3), Some(20), "Al"));
        assert_eq!(failure.tag, ValidationTag::Min("3".into()));
        assert_eq!(failure.kind, FieldKind::String);
        assert_eq!(failure.input, "Al");
    }

    #[test]
    fn test_length_above_max_is_max() {
        let long = "a".repeat(25);
        let failure = FieldFailure::from_error("name", &length_error(Some(3), Some(20), &long));
        assert_eq!(failure.tag, ValidationTag::Max("20".into()));
    }

    #[test]
    fn test_length_equal_is_len() {
        let mut err = ValidationError::new("length");
        err.add_param(Cow::from("equal"), &13);
        err.add_param(Cow::from("value"), &"+90");
        let failure = FieldFailure::from_error("phone", &err);
        assert_eq!(failure.tag, ValidationTag::Len("13".into()));
    }

    #[test]
    fn test_range_on_number() {
        let mut err = ValidationError::new("range");
        err.add_param(Cow::from("min"), &18);
        err.add_param(Cow::from("max"), &99);
        err.add_param(Cow::from("value"), &7);
        let failure = FieldFailure::from_error("age", &err);
        assert_eq!(failure.tag, ValidationTag::Min("18".into()));
        assert_eq!(failure.kind, FieldKind::Number);
        assert_eq!(failure.input, "7");
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        let failure = FieldFailure::from_error("card", &ValidationError::new("credit_card"));
        assert_eq!(failure.tag, ValidationTag::Unknown("credit_card".into()));
    }

    #[test]
    fn test_collect_sorts_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("phone", ValidationError::new("phone"));
        errors.add("email", ValidationError::new("required"));
        let failures = FieldFailure::collect(&errors);
        let fields: Vec<_> = failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "phone"]);
    }

    #[test]
    fn test_render_localizes_label_and_message() {
        let failure = FieldFailure {
            field: "email".into(),
            tag: ValidationTag::Required,
            kind: FieldKind::String,
            input: String::new(),
        };
        assert_eq!(failure.render(Locale::EnUs).message, "Email is required");
        assert_eq!(failure.render(Locale::TrTr).message, "E-posta alanı zorunludur");
    }

    #[test]
    fn test_render_unlabeled_field_uses_raw_name() {
        let failure = FieldFailure {
            field: "nickname".into(),
            tag: ValidationTag::Required,
            kind: FieldKind::String,
            input: String::new(),
        };
        assert_eq!(failure.render(Locale::EnUs).message, "nickname is required");
    }

    #[test]
    fn test_phone_validator() {
        assert!(validate_phone("+905551234567").is_ok());
        assert!(validate_phone("+905551234").is_err());
        assert!(validate_phone("+445551234567").is_err());
        assert!(validate_phone("+90555123456x").is_err());
    }

    #[test]
    fn test_alpha_validators() {
        assert!(validate_alpha("Ayşe").is_ok());
        assert!(validate_alpha("Ayse1").is_err());
        assert!(validate_alphanum("Ayse1").is_ok());
        assert!(validate_alphanum("Ayse 1").is_err());
    }

    #[test]
    fn test_role_validator_reports_choices() {
        assert!(validate_role("admin").is_ok());
        let err = validate_role("Admin").unwrap_err();
        let failure = FieldFailure::from_error("role", &err);
        assert_eq!(failure.tag, ValidationTag::OneOf("user admin subadmin".into()));
    }
}
