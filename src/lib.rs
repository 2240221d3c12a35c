pub mod cli;
pub mod core;
pub mod google;
pub mod pipeline;
pub mod sms;
pub mod store;
