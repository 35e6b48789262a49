//! Best-effort result submission.
//!
//! A finished game is offered to the configured endpoint at most once. The
//! decision (`Sent` or `Skip`) is persisted per game so later visits to the
//! result view never resend.

mod config;
mod coordinator;
mod leave;
mod payload;
mod sender;

pub use config::{SubmissionConfig, timeout_from_env};
pub use coordinator::{
    DECISION_KEY_PREFIX, SubmissionCoordinator, SubmissionDecision, SubmissionOutcome,
    decision_key,
};
pub use leave::ResultLeaveHandler;
pub use payload::{AchievementEntry, PAYLOAD_SCHEMA_VERSION, ResultPayloadV1, build_payload_v1};
pub use sender::{HttpResultSender, ResultSender};
