mod job;
mod state;
mod store;

pub use job::Job;
pub use state::JobStatus;
pub use store::{JobStore, JsonJobStore};
