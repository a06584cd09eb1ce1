use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::rc::Rc;

use super::types::{
    DialogError, FieldError, FieldKind, FieldMap, FieldValue, LeaveDraft, LeaveTypeId,
    ValidationErrors, WireFormatError,
};
use super::variants;

const DATE_FORMAT: &str = "%Y-%m-%d";
const EMPTY: &FieldValue = &FieldValue::Empty;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: FieldValue,
}

impl FieldDefinition {
    pub fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            default: FieldValue::Empty,
        }
    }

    pub fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, label, kind)
        }
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = default;
        self
    }

    pub fn check(&self, value: &FieldValue) -> Result<(), DialogError> {
        if value.conforms_to(self.kind) {
            Ok(())
        } else {
            Err(DialogError::FieldTypeMismatch {
                field: self.name.to_string(),
                expected: self.kind.as_str(),
            })
        }
    }

    /// Parses raw input element text into a value of this field's kind.
    pub fn parse_input(&self, raw: &str) -> Result<FieldValue, DialogError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() && self.kind != FieldKind::Flag {
            return Ok(FieldValue::Empty);
        }
        let invalid = |message: String| DialogError::InvalidInput {
            field: self.name.to_string(),
            message,
        };
        match self.kind {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| {
                    invalid(format!(
                        "{}を YYYY-MM-DD 形式で入力してください。",
                        self.label
                    ))
                }),
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| invalid(format!("{}は数値で入力してください。", self.label))),
            FieldKind::Flag => Ok(FieldValue::Flag(matches!(trimmed, "true" | "on" | "1"))),
        }
    }

    fn encode(&self, value: &FieldValue) -> Result<Value, WireFormatError> {
        Ok(match value {
            FieldValue::Empty => Value::Null,
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            FieldValue::Number(number) => Number::from_f64(*number)
                .map(Value::Number)
                .ok_or_else(|| WireFormatError::Unencodable {
                    field: self.name.to_string(),
                })?,
            FieldValue::Flag(flag) => Value::Bool(*flag),
        })
    }

    fn decode(&self, value: &Value) -> Result<FieldValue, WireFormatError> {
        let invalid = || WireFormatError::InvalidValue {
            field: self.name.to_string(),
            expected: self.kind.as_str(),
            found: value.to_string(),
        };
        match (self.kind, value) {
            (_, Value::Null) => Ok(FieldValue::Empty),
            (FieldKind::Text, Value::String(text)) => Ok(FieldValue::Text(text.clone())),
            (FieldKind::Date, Value::String(text)) => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| invalid()),
            (FieldKind::Number, Value::Number(number)) => {
                number.as_f64().map(FieldValue::Number).ok_or_else(invalid)
            }
            (FieldKind::Flag, Value::Bool(flag)) => Ok(FieldValue::Flag(*flag)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDescriptor {
    pub label: &'static str,
    pub description: &'static str,
}

/// Type-specific rules run after the schema-level required checks.
pub type VariantRules = fn(&LeaveDraft) -> Vec<FieldError>;

#[derive(Clone)]
pub struct LeaveVariantDescriptor {
    pub display: DisplayDescriptor,
    pub field_schema: Vec<FieldDefinition>,
    pub rules: VariantRules,
}

impl std::fmt::Debug for LeaveVariantDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaveVariantDescriptor")
            .field("display", &self.display)
            .field("field_schema", &self.field_names())
            .finish_non_exhaustive()
    }
}

impl LeaveVariantDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_schema.iter().find(|def| def.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.field_schema.iter().map(|def| def.name).collect()
    }

    pub fn default_fields(&self) -> FieldMap {
        self.field_schema
            .iter()
            .map(|def| (def.name.to_string(), def.default.clone()))
            .collect()
    }

    pub fn validate(&self, draft: &LeaveDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for def in &self.field_schema {
            let value = draft.field(def.name).unwrap_or(EMPTY);
            if !value.conforms_to(def.kind) {
                errors.push(FieldError::new(
                    def.name,
                    "type_mismatch",
                    format!("{}の形式が正しくありません。", def.label),
                ));
            } else if def.required && value.is_blank() {
                errors.push(FieldError::new(
                    def.name,
                    "required",
                    format!("{}を入力してください。", def.label),
                ));
            }
        }
        for name in draft.fields.keys() {
            if self.field(name).is_none() {
                errors.push(FieldError::new(
                    name.clone(),
                    "unknown_field",
                    "この休暇種別では使用できない項目です。",
                ));
            }
        }
        for error in (self.rules)(draft) {
            errors.push(error);
        }
        errors
    }

    pub fn to_wire_format(&self, draft: &LeaveDraft) -> Result<Value, WireFormatError> {
        let mut payload = Map::new();
        payload.insert(
            "leave_type".into(),
            Value::String(draft.leave_type.as_str().to_string()),
        );
        for def in &self.field_schema {
            let value = draft.field(def.name).unwrap_or(&def.default);
            payload.insert(def.name.to_string(), def.encode(value)?);
        }
        Ok(Value::Object(payload))
    }

    /// Reads the schema's fields out of a payload. Keys outside the schema are
    /// ignored and missing keys take the schema default.
    pub fn from_wire_format(&self, payload: &Value) -> Result<FieldMap, WireFormatError> {
        let object = payload.as_object().ok_or(WireFormatError::NotAnObject)?;
        self.field_schema
            .iter()
            .map(|def| {
                let value = match object.get(def.name) {
                    Some(raw) => def.decode(raw)?,
                    None => def.default.clone(),
                };
                Ok((def.name.to_string(), value))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct LeaveVariantRegistry {
    variants: HashMap<LeaveTypeId, LeaveVariantDescriptor>,
}

impl LeaveVariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in leave variant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (type_id, descriptor) in variants::builtin() {
            registry.register(type_id, descriptor);
        }
        registry
    }

    pub fn register(&mut self, type_id: LeaveTypeId, descriptor: LeaveVariantDescriptor) {
        if self.variants.insert(type_id, descriptor).is_some() {
            log::warn!("leave variant {} registered twice, keeping the latest", type_id);
        }
    }

    pub fn resolve(&self, type_id: LeaveTypeId) -> Result<&LeaveVariantDescriptor, DialogError> {
        self.variants
            .get(&type_id)
            .ok_or_else(|| DialogError::UnknownLeaveType(type_id.as_str().to_string()))
    }

    /// Resolves a raw wire identifier, as stored on a fetched record.
    pub fn resolve_raw(
        &self,
        raw: &str,
    ) -> Result<(LeaveTypeId, &LeaveVariantDescriptor), DialogError> {
        let type_id = raw.parse::<LeaveTypeId>()?;
        self.resolve(type_id).map(|descriptor| (type_id, descriptor))
    }

    /// Registered types in selector order.
    pub fn types(&self) -> Vec<LeaveTypeId> {
        LeaveTypeId::ALL
            .into_iter()
            .filter(|id| self.variants.contains_key(id))
            .collect()
    }
}

thread_local! {
    static SHARED_REGISTRY: Rc<LeaveVariantRegistry> = Rc::new(LeaveVariantRegistry::standard());
}

/// The process-wide standard registry, built on first use.
pub fn shared_registry() -> Rc<LeaveVariantRegistry> {
    SHARED_REGISTRY.with(Rc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn draft(leave_type: LeaveTypeId, fields: FieldMap) -> LeaveDraft {
        LeaveDraft {
            leave_type,
            fields,
            source_record_id: None,
            generation: 1,
        }
    }

    #[test]
    fn standard_registry_resolves_every_builtin_type() {
        let registry = LeaveVariantRegistry::standard();
        assert_eq!(registry.types(), LeaveTypeId::ALL.to_vec());
        for id in LeaveTypeId::ALL {
            assert!(!registry.resolve(id).unwrap().field_schema.is_empty());
        }
    }

    #[test]
    fn resolve_fails_for_unregistered_type() {
        let registry = LeaveVariantRegistry::new();
        assert_eq!(
            registry.resolve(LeaveTypeId::Maternity).unwrap_err(),
            DialogError::UnknownLeaveType("maternity".into())
        );
        assert!(matches!(
            LeaveVariantRegistry::standard().resolve_raw("sabbatical"),
            Err(DialogError::UnknownLeaveType(raw)) if raw == "sabbatical"
        ));
    }

    #[test]
    fn parse_input_follows_field_kind() {
        let start = FieldDefinition::required("start_date", "開始日", FieldKind::Date);
        assert_eq!(start.parse_input("2025-01-10").unwrap(), date(2025, 1, 10));
        assert_eq!(start.parse_input("  ").unwrap(), FieldValue::Empty);
        assert!(matches!(
            start.parse_input("10/01/2025"),
            Err(DialogError::InvalidInput { field, .. }) if field == "start_date"
        ));

        let weeks = FieldDefinition::required("weeks", "取得週数", FieldKind::Number);
        assert_eq!(weeks.parse_input("16").unwrap(), FieldValue::Number(16.0));
        assert!(weeks.parse_input("NaN").is_err());

        let flag = FieldDefinition::optional("half_day", "半日", FieldKind::Flag);
        assert_eq!(flag.parse_input("on").unwrap(), FieldValue::Flag(true));
        assert_eq!(flag.parse_input("").unwrap(), FieldValue::Flag(false));
    }

    #[test]
    fn validate_reports_missing_required_fields_by_name() {
        let registry = LeaveVariantRegistry::standard();
        let descriptor = registry.resolve(LeaveTypeId::Holiday).unwrap();
        let errors = descriptor.validate(&draft(LeaveTypeId::Holiday, descriptor.default_fields()));
        assert!(errors.contains("start_date"));
        assert!(errors.contains("end_date"));
        assert!(!errors.contains("reason"));
        assert_eq!(errors.for_field("start_date")[0].code, "required");
    }

    #[test]
    fn validate_flags_fields_outside_the_schema() {
        let registry = LeaveVariantRegistry::standard();
        let descriptor = registry.resolve(LeaveTypeId::Wfh).unwrap();
        let mut fields = descriptor.default_fields();
        fields.insert("date".into(), date(2025, 1, 6));
        fields.insert("start_date".into(), date(2025, 1, 6));
        let errors = descriptor.validate(&draft(LeaveTypeId::Wfh, fields));
        assert_eq!(errors.for_field("start_date")[0].code, "unknown_field");
    }

    #[test]
    fn wire_format_round_trips_every_registered_type() {
        let registry = LeaveVariantRegistry::standard();
        let samples = [
            (
                LeaveTypeId::Holiday,
                vec![
                    ("start_date", date(2025, 1, 1)),
                    ("end_date", date(2025, 1, 3)),
                    ("half_day", FieldValue::Flag(false)),
                    ("reason", FieldValue::Text("帰省".into())),
                ],
            ),
            (
                LeaveTypeId::Wfh,
                vec![
                    ("date", date(2025, 1, 6)),
                    ("work_location", FieldValue::Text("自宅".into())),
                    ("reason", FieldValue::Empty),
                ],
            ),
            (
                LeaveTypeId::Sick,
                vec![
                    ("start_date", date(2025, 2, 10)),
                    ("end_date", date(2025, 2, 12)),
                    ("medical_certificate", FieldValue::Flag(true)),
                    ("reason", FieldValue::Text("発熱".into())),
                ],
            ),
            (
                LeaveTypeId::Maternity,
                vec![
                    ("expected_due_date", date(2025, 6, 1)),
                    ("start_date", date(2025, 4, 20)),
                    ("weeks", FieldValue::Number(14.5)),
                    ("reason", FieldValue::Empty),
                ],
            ),
        ];
        for (leave_type, fields) in samples {
            let descriptor = registry.resolve(leave_type).unwrap();
            let fields: FieldMap = fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            let original = draft(leave_type, fields);
            assert!(descriptor.validate(&original).is_empty(), "{leave_type} sample invalid");

            let payload = descriptor.to_wire_format(&original).unwrap();
            assert_eq!(payload["leave_type"], json!(leave_type.as_str()));
            assert_eq!(descriptor.from_wire_format(&payload).unwrap(), original.fields);
        }
    }

    #[test]
    fn from_wire_format_ignores_foreign_keys_and_defaults_missing_ones() {
        let registry = LeaveVariantRegistry::standard();
        let descriptor = registry.resolve(LeaveTypeId::Maternity).unwrap();
        let fields = descriptor
            .from_wire_format(&json!({
                "id": "leave-1",
                "status": "pending",
                "start_date": "2025-04-20",
                "end_date": "2025-05-01"
            }))
            .unwrap();
        assert_eq!(fields.get("weeks"), Some(&FieldValue::Number(14.0)));
        assert_eq!(fields.get("expected_due_date"), Some(&FieldValue::Empty));
        assert!(!fields.contains_key("end_date"));
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn from_wire_format_rejects_mistyped_values() {
        let registry = LeaveVariantRegistry::standard();
        let descriptor = registry.resolve(LeaveTypeId::Holiday).unwrap();
        let err = descriptor
            .from_wire_format(&json!({ "start_date": 20250101 }))
            .unwrap_err();
        assert!(matches!(err, WireFormatError::InvalidValue { field, .. } if field == "start_date"));
        assert_eq!(
            descriptor.from_wire_format(&json!([])).unwrap_err(),
            WireFormatError::NotAnObject
        );
    }

    #[test]
    fn to_wire_format_refuses_non_finite_numbers() {
        let registry = LeaveVariantRegistry::standard();
        let descriptor = registry.resolve(LeaveTypeId::Maternity).unwrap();
        let mut fields = descriptor.default_fields();
        fields.insert("weeks".into(), FieldValue::Number(f64::INFINITY));
        assert!(matches!(
            descriptor.to_wire_format(&draft(LeaveTypeId::Maternity, fields)),
            Err(WireFormatError::Unencodable { field }) if field == "weeks"
        ));
    }
}
