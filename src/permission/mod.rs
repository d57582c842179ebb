mod coordinator;

pub use coordinator::{ApprovalCoordinator, DEFAULT_APPROVAL_WINDOW};
