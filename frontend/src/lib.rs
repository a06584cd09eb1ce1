use leptos::*;
use leptos_router::*;

pub mod api;
mod components;
pub mod config;
pub mod pages;
#[cfg(test)]
mod test_support;

use pages::LeaveRequestsPage;

/// Browser entry point: logging, runtime config, then the router.
#[cfg(target_arch = "wasm32")]
pub fn mount() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("logger already initialized: {}", err).into());
    }
    log::info!("Starting LeaveDesk frontend");

    // Runtime config loads in the background; API calls wait for it.
    wasm_bindgen_futures::spawn_local(async move {
        config::init().await;
        log::info!("Runtime config initialized");
    });

    mount_to_body(App);
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <Routes>
                <Route path="/" view=LeaveRequestsPage/>
                <Route path="/requests" view=LeaveRequestsPage/>
            </Routes>
        </Router>
    }
}
