//! API handlers module

pub mod animals;
pub mod applications;
pub mod assessments;
pub mod characteristics;
pub mod dashboard;
pub mod health;
pub mod likes;
pub mod notes;
pub mod outcomes;
pub mod pets;
pub mod tasks;

mod input;

pub use input::ActionInput;
