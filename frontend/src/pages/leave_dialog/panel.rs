use leptos::*;
use leptos_router::{use_query_map, ParamsMap};

use crate::components::layout::{Layout, SuccessMessage};

use super::components::shell::LeaveDialogShell;
use super::view_model::use_leave_dialog_view_model;

/// Record id requested through `?edit=<id>`, if any.
pub fn edit_target(query: &ParamsMap) -> Option<String> {
    query
        .get("edit")
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[component]
pub fn LeaveRequestsPage() -> impl IntoView {
    let vm = use_leave_dialog_view_model();
    let query = use_query_map();

    create_effect(move |previous: Option<Option<String>>| {
        let target = query.with(edit_target);
        if target != previous.flatten() {
            if let Some(id) = target.clone() {
                untrack(|| vm.open_edit(id));
            }
        }
        target
    });

    let last_submitted = vm.last_submitted;
    let dialog_open = move || vm.state.with(|state| state.is_open());

    view! {
        <Layout>
            <div class="space-y-6">
                <div class="flex items-center justify-between">
                    <div>
                        <h2 class="text-2xl font-bold text-fg">{"休暇申請"}</h2>
                        <p class="text-sm text-fg-muted">
                            {"休暇・在宅勤務・病気休暇・産前産後休暇を申請します。"}
                        </p>
                    </div>
                    <button
                        type="button"
                        class="px-4 py-2 rounded bg-action-primary-bg text-action-primary-text disabled:opacity-50"
                        disabled=dialog_open
                        on:click=move |_| vm.open_default()
                    >
                        {"新規申請"}
                    </button>
                </div>
                <Show when=move || last_submitted.with(Option::is_some) && !dialog_open()>
                    <SuccessMessage message=last_submitted
                        .get()
                        .map(|record| format!("申請 {} を受け付けました（{}）。", record.id, record.status))
                        .unwrap_or_default() />
                </Show>
            </div>
            <LeaveDialogShell vm=vm />
        </Layout>
    }
}
