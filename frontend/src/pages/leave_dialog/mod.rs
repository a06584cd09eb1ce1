//! The leave-request dialog: a variant registry describing each leave type,
//! a per-session draft store, and the controller that keeps the visible
//! type-specific fields consistent with the draft being edited.

pub mod components;
pub mod draft;
pub mod panel;
pub mod registry;
pub mod repository;
pub mod session;
pub mod submission;
pub mod transition;
pub mod types;
pub mod variants;
pub mod view_model;

pub use panel::LeaveRequestsPage;
