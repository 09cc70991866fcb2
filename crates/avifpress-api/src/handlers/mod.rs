pub mod analyze;
pub mod convert;
pub mod download;
pub mod health;
