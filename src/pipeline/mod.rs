//! The notification processing pipeline: turns today's calendar
//! events into rate-limited SMS dispatches and a run summary.

pub mod candidate;
pub mod directory;
pub mod dispatch;
pub mod orchestrator;
pub mod quota;
pub mod summary;

pub use candidate::{CandidateBuilder, Classified, NotificationCandidate};
pub use directory::{PhoneDirectory, to_phone_number};
pub use dispatch::Dispatcher;
pub use orchestrator::{RunReport, Services, run};
pub use quota::QuotaGate;
pub use summary::RunSummary;
