use leptos::ev::KeyboardEvent;
use leptos::*;

use crate::components::layout::{ErrorMessage, LoadingSpinner, SuccessMessage};
use crate::pages::leave_dialog::transition::DialogState;
use crate::pages::leave_dialog::types::{DraftKey, LeaveTypeId};
use crate::pages::leave_dialog::view_model::LeaveDialogViewModel;

use super::fields::VariantFields;

/// Which body the dialog shows. Switching leave types stays in `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Loading,
    Active,
    Failed,
}

impl Phase {
    fn of(state: &DialogState) -> Self {
        match state {
            DialogState::Closed => Phase::Closed,
            DialogState::Loading { .. } => Phase::Loading,
            DialogState::Active(_) => Phase::Active,
            DialogState::Error(_) => Phase::Failed,
        }
    }
}

fn dialog_phase(vm: LeaveDialogViewModel) -> Memo<Phase> {
    create_memo(move |_| vm.state.with(Phase::of))
}

/// Identity of the field region. Type and fields come from the same draft.
fn region_key(vm: LeaveDialogViewModel) -> Memo<Option<DraftKey>> {
    create_memo(move |_| vm.draft.with(|draft| draft.as_ref().map(|draft| draft.key())))
}

#[component]
pub fn LeaveDialogShell(vm: LeaveDialogViewModel) -> impl IntoView {
    let phase = dialog_phase(vm);
    let is_open = move || phase.get() != Phase::Closed;
    let is_edit = move || {
        vm.draft
            .with(|draft| draft.as_ref().map(|draft| draft.is_edit()).unwrap_or(false))
            || phase.get() == Phase::Loading
    };
    let title = move || {
        if is_edit() {
            "休暇申請を編集"
        } else {
            "休暇申請を作成"
        }
    };

    view! {
        <Show when=is_open>
            <div class="fixed inset-0 z-[70] flex items-center justify-center p-4">
                <button
                    type="button"
                    aria-label="閉じる"
                    class="absolute inset-0 bg-overlay-backdrop"
                    on:click=move |_| vm.close()
                ></button>
                <div
                    class="relative z-[71] w-full max-w-lg rounded-lg bg-surface-elevated shadow-xl border border-border p-6 space-y-4"
                    role="dialog"
                    aria-modal="true"
                    tabindex="-1"
                    on:keydown=move |ev: KeyboardEvent| {
                        if ev.key() == "Escape" {
                            ev.prevent_default();
                            vm.close();
                        }
                    }
                >
                    <div class="flex items-start justify-between gap-3">
                        <h2 class="text-lg font-semibold text-fg">{title}</h2>
                        <button
                            type="button"
                            aria-label="閉じる"
                            class="text-fg-muted hover:text-fg"
                            on:click=move |_| vm.close()
                        >
                            {"✕"}
                        </button>
                    </div>
                    <Show when=move || vm.message.with(|msg| msg.error.is_some())>
                        <ErrorMessage message=vm.message.get().error.unwrap_or_default() />
                    </Show>
                    <Show when=move || vm.message.with(|msg| msg.success.is_some())>
                        <SuccessMessage message=vm.message.get().success.unwrap_or_default() />
                    </Show>
                    {move || match phase.get() {
                        Phase::Loading => view! {
                            <div data-dialog-state="loading">
                                <LoadingSpinner/>
                                <p class="text-sm text-fg-muted text-center">"申請内容を読み込んでいます..."</p>
                            </div>
                        }
                        .into_view(),
                        Phase::Failed => {
                            let reason = vm.state.with_untracked(|state| match state {
                                DialogState::Error(err) => err.to_string(),
                                _ => String::new(),
                            });
                            view! {
                                <div data-dialog-state="error" class="space-y-3">
                                    <ErrorMessage message=format!("休暇申請を表示できません: {}", reason) />
                                    <div class="flex justify-end">
                                        <button
                                            type="button"
                                            class="inline-flex items-center justify-center rounded-md px-4 py-2 text-sm font-semibold bg-surface-muted text-fg"
                                            on:click=move |_| vm.close()
                                        >
                                            "閉じる"
                                        </button>
                                    </div>
                                </div>
                            }
                            .into_view()
                        }
                        Phase::Active => view! { <ActiveBody vm=vm /> }.into_view(),
                        Phase::Closed => ().into_view(),
                    }}
                </div>
            </div>
        </Show>
    }
}

#[component]
fn ActiveBody(vm: LeaveDialogViewModel) -> impl IntoView {
    let key = region_key(vm);
    let active = move || key.get().map(|key| key.leave_type);
    let options = vm.leave_types();
    let submitting = vm.submitting;

    view! {
        <div data-dialog-state="active" class="space-y-4">
            <div>
                <label class="block text-sm font-medium text-fg">{"種類"}</label>
                <select
                    class="mt-1 block w-full border rounded px-2 py-1"
                    name="leave_type"
                    on:change=move |ev| {
                        match event_target_value(&ev).parse::<LeaveTypeId>() {
                            Ok(type_id) => vm.select_type(type_id),
                            Err(err) => log::warn!("{}", err),
                        }
                    }
                >
                    {options
                        .into_iter()
                        .map(move |(id, label)| {
                            view! {
                                <option value=id.as_str() selected=move || active() == Some(id)>{label}</option>
                            }
                        })
                        .collect_view()}
                </select>
            </div>
            {move || key.get().map(|key| view! { <KeyedVariantRegion vm=vm key=key /> })}
            <div class="flex justify-end gap-2">
                <button
                    type="button"
                    class="inline-flex items-center justify-center rounded-md px-4 py-2 text-sm font-semibold bg-surface-muted text-fg hover:bg-surface-elevated"
                    on:click=move |_| vm.close()
                >
                    "キャンセル"
                </button>
                <button
                    type="button"
                    class="inline-flex items-center justify-center rounded-md px-4 py-2 text-sm font-semibold bg-action-primary-bg text-action-primary-text hover:bg-action-primary-bg-hover disabled:opacity-50"
                    disabled=move || submitting.get()
                    on:click=move |_| vm.submit()
                >
                    {move || if submitting.get() { "送信中..." } else { "申請を送信" }}
                </button>
            </div>
        </div>
    }
}

/// Rebuilt from scratch whenever the draft key changes, so no input of a
/// previous type or generation survives.
#[component]
fn KeyedVariantRegion(vm: LeaveDialogViewModel, key: DraftKey) -> impl IntoView {
    let descriptor = vm.descriptor(key.leave_type);
    view! {
        <section
            data-leave-type=key.leave_type.as_str()
            data-generation=key.generation.to_string()
            class="space-y-3"
        >
            {descriptor.map(|descriptor| {
                let description = descriptor.display.description;
                view! {
                    <p class="text-sm text-fg-muted">{description}</p>
                    <VariantFields vm=vm descriptor=descriptor />
                }
            })}
        </section>
    }
}
