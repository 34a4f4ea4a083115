pub mod action;
pub mod clock;
pub mod constants;
pub mod factory;
pub mod reducer;
pub mod rules;
pub mod scheduler;
pub mod session;
pub mod state;
