// src/task/mod.rs

pub mod coordinator;
pub mod handler;
pub mod progress;
pub mod scheduler;

pub use coordinator::{Services, TaskCoordinator, TaskOutcome, TaskSlot};
pub use handler::Handler;
pub use scheduler::TaskScheduler;
