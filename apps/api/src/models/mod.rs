pub mod job;

pub use job::{JobLead, JobSource, JobStatus};
