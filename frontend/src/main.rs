fn main() {
    #[cfg(target_arch = "wasm32")]
    leavedesk_frontend::mount();
}
