use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveTypeId {
    Holiday,
    Wfh,
    Sick,
    Maternity,
}

impl LeaveTypeId {
    pub const ALL: [LeaveTypeId; 4] = [
        LeaveTypeId::Holiday,
        LeaveTypeId::Wfh,
        LeaveTypeId::Sick,
        LeaveTypeId::Maternity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeaveTypeId::Holiday => "holiday",
            LeaveTypeId::Wfh => "wfh",
            LeaveTypeId::Sick => "sick",
            LeaveTypeId::Maternity => "maternity",
        }
    }
}

impl fmt::Display for LeaveTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveTypeId {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveTypeId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| DialogError::UnknownLeaveType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Text,
    Number,
    Flag,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Date => "date",
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Date(NaiveDate),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn conforms_to(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Empty, _)
                | (FieldValue::Text(_), FieldKind::Text)
                | (FieldValue::Date(_), FieldKind::Date)
                | (FieldValue::Number(_), FieldKind::Number)
                | (FieldValue::Flag(_), FieldKind::Flag)
        )
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    /// Value as shown in an input element.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            FieldValue::Number(value) => value.to_string(),
            FieldValue::Flag(value) => value.to_string(),
        }
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// Working copy of one leave request for the active leave type.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveDraft {
    pub leave_type: LeaveTypeId,
    pub fields: FieldMap,
    pub source_record_id: Option<String>,
    pub generation: u64,
}

impl LeaveDraft {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn key(&self) -> DraftKey {
        DraftKey {
            leave_type: self.leave_type,
            generation: self.generation,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.source_record_id.is_some()
    }
}

/// Identity of the type-specific region of the dialog. A new key means the
/// region is rebuilt from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub leave_type: LeaveTypeId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// Field-keyed validation failures for one draft.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<FieldError>>);

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.0.entry(error.field.clone()).or_default().push(error);
    }

    pub fn clear_field(&mut self, field: &str) -> bool {
        self.0.remove(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn for_field(&self, field: &str) -> &[FieldError] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<FieldError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        let mut errors = ValidationErrors::default();
        for error in iter {
            errors.push(error);
        }
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DialogError {
    #[error("unknown leave type: {0}")]
    UnknownLeaveType(String),
    #[error("field `{field}` is not defined for leave type {leave_type}")]
    UnknownField {
        leave_type: LeaveTypeId,
        field: String,
    },
    #[error("field `{field}` expects a {expected} value")]
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("{message}")]
    InvalidInput { field: String, message: String },
    #[error("no leave draft is active")]
    NoActiveDraft,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireFormatError {
    #[error("leave payload must be a JSON object")]
    NotAnObject,
    #[error("field `{field}` has an invalid {expected} value: {found}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        found: String,
    },
    #[error("field `{field}` cannot be encoded")]
    Unencodable { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_type_ids_round_trip_through_strings() {
        for id in LeaveTypeId::ALL {
            assert_eq!(id.as_str().parse::<LeaveTypeId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), id.as_str());
        }
    }

    #[test]
    fn unknown_leave_type_string_is_rejected() {
        assert_eq!(
            "sabbatical".parse::<LeaveTypeId>(),
            Err(DialogError::UnknownLeaveType("sabbatical".into()))
        );
    }

    #[test]
    fn field_value_conformance_follows_kind() {
        assert!(FieldValue::Empty.conforms_to(FieldKind::Date));
        assert!(FieldValue::Flag(true).conforms_to(FieldKind::Flag));
        assert!(!FieldValue::Text("x".into()).conforms_to(FieldKind::Number));
        assert!(FieldValue::Text("  ".into()).is_blank());
        assert!(!FieldValue::Flag(false).is_blank());
    }

    #[test]
    fn validation_errors_group_by_field() {
        let errors: ValidationErrors = vec![
            FieldError::new("start_date", "required", "a"),
            FieldError::new("start_date", "order", "b"),
            FieldError::new("weeks", "range", "c"),
        ]
        .into_iter()
        .collect();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_field("start_date").len(), 2);
        assert!(errors.for_field("reason").is_empty());
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["start_date", "weeks"]);
    }
}
