//! Built-in leave variants: schema, display strings and type-specific rules.

use super::registry::{DisplayDescriptor, FieldDefinition, LeaveVariantDescriptor};
use super::types::{FieldError, FieldKind, FieldValue, LeaveDraft, LeaveTypeId};

const MAX_MATERNITY_WEEKS: f64 = 52.0;
const DEFAULT_MATERNITY_WEEKS: f64 = 14.0;

pub fn builtin() -> Vec<(LeaveTypeId, LeaveVariantDescriptor)> {
    vec![
        (LeaveTypeId::Holiday, holiday()),
        (LeaveTypeId::Wfh, work_from_home()),
        (LeaveTypeId::Sick, sick()),
        (LeaveTypeId::Maternity, maternity()),
    ]
}

fn reason() -> FieldDefinition {
    FieldDefinition::optional("reason", "理由（任意）", FieldKind::Text)
}

fn holiday() -> LeaveVariantDescriptor {
    LeaveVariantDescriptor {
        display: DisplayDescriptor {
            label: "休暇",
            description: "休暇の期間を入力して申請します。",
        },
        field_schema: vec![
            FieldDefinition::required("start_date", "開始日", FieldKind::Date),
            FieldDefinition::required("end_date", "終了日", FieldKind::Date),
            FieldDefinition::optional("half_day", "半日休暇", FieldKind::Flag)
                .with_default(FieldValue::Flag(false)),
            reason(),
        ],
        rules: holiday_rules,
    }
}

fn work_from_home() -> LeaveVariantDescriptor {
    LeaveVariantDescriptor {
        display: DisplayDescriptor {
            label: "在宅勤務",
            description: "在宅勤務を行う日と勤務場所を入力します。",
        },
        field_schema: vec![
            FieldDefinition::required("date", "勤務日", FieldKind::Date),
            FieldDefinition::required("work_location", "勤務場所", FieldKind::Text)
                .with_default(FieldValue::Text("自宅".into())),
            reason(),
        ],
        rules: no_rules,
    }
}

fn sick() -> LeaveVariantDescriptor {
    LeaveVariantDescriptor {
        display: DisplayDescriptor {
            label: "病気休暇",
            description: "療養する期間を入力します。",
        },
        field_schema: vec![
            FieldDefinition::required("start_date", "開始日", FieldKind::Date),
            FieldDefinition::required("end_date", "終了日", FieldKind::Date),
            FieldDefinition::optional("medical_certificate", "診断書あり", FieldKind::Flag)
                .with_default(FieldValue::Flag(false)),
            reason(),
        ],
        rules: date_range_rules,
    }
}

fn maternity() -> LeaveVariantDescriptor {
    LeaveVariantDescriptor {
        display: DisplayDescriptor {
            label: "産前産後休暇",
            description: "出産予定日と休暇の開始日、取得週数を入力します。",
        },
        field_schema: vec![
            FieldDefinition::required("expected_due_date", "出産予定日", FieldKind::Date),
            FieldDefinition::required("start_date", "開始日", FieldKind::Date),
            FieldDefinition::required("weeks", "取得週数", FieldKind::Number)
                .with_default(FieldValue::Number(DEFAULT_MATERNITY_WEEKS)),
            reason(),
        ],
        rules: maternity_rules,
    }
}

fn no_rules(_draft: &LeaveDraft) -> Vec<FieldError> {
    Vec::new()
}

fn date_range_rules(draft: &LeaveDraft) -> Vec<FieldError> {
    let start = draft.field("start_date").and_then(FieldValue::as_date);
    let end = draft.field("end_date").and_then(FieldValue::as_date);
    match (start, end) {
        (Some(start), Some(end)) if end < start => vec![FieldError::new(
            "end_date",
            "end_before_start",
            "終了日は開始日以降の日付を指定してください。",
        )],
        _ => Vec::new(),
    }
}

fn holiday_rules(draft: &LeaveDraft) -> Vec<FieldError> {
    let mut errors = date_range_rules(draft);
    let half_day = draft
        .field("half_day")
        .and_then(FieldValue::as_flag)
        .unwrap_or(false);
    let start = draft.field("start_date").and_then(FieldValue::as_date);
    let end = draft.field("end_date").and_then(FieldValue::as_date);
    if half_day {
        if let (Some(start), Some(end)) = (start, end) {
            if start != end {
                errors.push(FieldError::new(
                    "half_day",
                    "half_day_range",
                    "半日休暇は1日のみ指定できます。",
                ));
            }
        }
    }
    errors
}

fn maternity_rules(draft: &LeaveDraft) -> Vec<FieldError> {
    match draft.field("weeks").and_then(FieldValue::as_number) {
        Some(weeks) if !(1.0..=MAX_MATERNITY_WEEKS).contains(&weeks) => vec![FieldError::new(
            "weeks",
            "weeks_out_of_range",
            "取得週数は1〜52の範囲で指定してください。",
        )],
        _ => Vec::new(),
    }
}
