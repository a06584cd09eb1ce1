#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod ssr;

#[cfg(test)]
mod fake_api;

#[cfg(test)]
pub use fake_api::{FakeLeaveApi, SubmitCall};
