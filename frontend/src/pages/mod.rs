pub mod leave_dialog;

pub use leave_dialog::LeaveRequestsPage;
