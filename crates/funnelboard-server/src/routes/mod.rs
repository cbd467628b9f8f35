pub mod dashboard;
pub mod health;
pub mod process;
pub mod query;
