pub mod auto_check;
pub mod job;
pub mod part;

pub use auto_check::AutoCheckState;
pub use job::{EolClassification, EolStatus, FetchMethod, Job, JobStatus, UrlEntry, UrlStatus};
pub use part::PartRecord;
