//! Job reservation domain.
//!
//! A reservation holds stock against a job: committing raises an item's
//! committed quantity, completing consumes what was used and releases the rest.
//! This crate holds the state machine and the arithmetic; `forgedesk-infra`
//! applies it to stored rows under item locks.

pub mod commit;
pub mod completion;
pub mod reservation;
pub mod status;
pub mod transition;

pub use commit::{CommitLine, CommitOutcome, CommitSnapshot, effective_lines};
pub use completion::{CompletionLine, CompletionPlan, CompletionSummary, plan_completion};
pub use reservation::{
    JobMetadata, JobReservation, ReservationDetail, ReservationItem, ReservationItemView,
    ReservationSummary, ValidJobMetadata,
};
pub use status::ReservationStatus;
pub use transition::{Shortage, StatusChange, TransitionOutcome, check_transition};
