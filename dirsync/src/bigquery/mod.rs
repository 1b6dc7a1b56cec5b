mod client;
mod job;
mod merge;

pub use client::{BigQueryClient, TableRef};
pub use job::{JobError, JobReference, JobState, JobStatus};
pub use merge::merge_statement;
