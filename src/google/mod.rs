pub mod calendar;
pub mod gmail;
pub mod oauth;
pub mod sheets;
