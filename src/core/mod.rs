//! The attendance/overtime reconciliation and analytics core: pure functions
//! over already-fetched rows. Handlers do the SQL; everything in here takes
//! plain data plus an injected clock/zone so tests can pin both.

pub mod calendar;
pub mod overlap;
pub mod overtime;
pub mod presence;
pub mod range;
pub mod shift_plan;
