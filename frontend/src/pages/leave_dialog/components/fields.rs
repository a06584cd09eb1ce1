use leptos::*;

use crate::pages::leave_dialog::registry::{FieldDefinition, LeaveVariantDescriptor};
use crate::pages::leave_dialog::types::{FieldKind, FieldValue};
use crate::pages::leave_dialog::view_model::LeaveDialogViewModel;

const INPUT_CLASS: &str = "mt-1 block w-full border rounded px-2 py-1";

/// Inputs for one leave variant. Built once per draft key.
#[component]
pub fn VariantFields(vm: LeaveDialogViewModel, descriptor: LeaveVariantDescriptor) -> impl IntoView {
    descriptor
        .field_schema
        .into_iter()
        .map(|def| view! { <FieldInput vm=vm def=def /> })
        .collect_view()
}

#[component]
fn FieldInput(vm: LeaveDialogViewModel, def: FieldDefinition) -> impl IntoView {
    let name = def.name;
    let value = move || {
        vm.draft.with(|draft| {
            draft
                .as_ref()
                .and_then(|draft| draft.field(name))
                .map(FieldValue::display)
                .unwrap_or_default()
        })
    };
    let errors = move || {
        vm.field_errors.with(|errors| {
            errors
                .for_field(name)
                .iter()
                .map(|error| error.message.clone())
                .collect::<Vec<_>>()
        })
    };
    let input = match def.kind {
        FieldKind::Date => view! {
            <input
                type="date"
                name=name
                class=INPUT_CLASS
                prop:value=value
                on:change=move |ev| vm.update_field(name, &event_target_value(&ev))
            />
        }
        .into_view(),
        FieldKind::Number => view! {
            <input
                type="number"
                name=name
                class=INPUT_CLASS
                prop:value=value
                on:input=move |ev| vm.update_field(name, &event_target_value(&ev))
            />
        }
        .into_view(),
        FieldKind::Text => view! {
            <input
                type="text"
                name=name
                class=INPUT_CLASS
                prop:value=value
                on:input=move |ev| vm.update_field_debounced(name.to_string(), event_target_value(&ev))
            />
        }
        .into_view(),
        FieldKind::Flag => {
            let checked = move || {
                vm.draft.with(|draft| {
                    draft
                        .as_ref()
                        .and_then(|draft| draft.field(name))
                        .and_then(FieldValue::as_flag)
                        .unwrap_or(false)
                })
            };
            view! {
                <input
                    type="checkbox"
                    name=name
                    class="mt-1 h-4 w-4"
                    prop:checked=checked
                    on:change=move |ev| {
                        let raw = if event_target_checked(&ev) { "true" } else { "false" };
                        vm.update_field(name, raw);
                    }
                />
            }
            .into_view()
        }
    };

    view! {
        <div data-field=name>
            <label class="block text-sm font-medium text-fg">
                {def.label}
                <Show when=move || def.required>
                    <span class="text-status-error-text">" *"</span>
                </Show>
            </label>
            {input}
            <For
                each=errors
                key=|message| message.clone()
                children=move |message| view! { <p class="text-xs text-status-error-text mt-1">{message}</p> }
            />
        </div>
    }
}
