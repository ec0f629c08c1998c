//! Status state machines and set arithmetic shared by the services
//!
//! Everything here is pure: no I/O, no clock.

mod application;
mod characteristics;
mod task;

pub use application::{ensure_staff_transition, is_closed, staff_targets, STAFF_SETTABLE};
pub use characteristics::CharacteristicDiff;
pub use task::TaskTransition;
