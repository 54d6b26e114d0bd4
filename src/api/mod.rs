pub mod analytics;
pub mod employee;
pub mod leave;
pub mod overtime;
pub mod report;
pub mod shift;
pub mod time_record;
