pub mod leave;
pub mod overtime;
pub mod role;
pub mod shift;
pub mod time_record;
pub mod user;
