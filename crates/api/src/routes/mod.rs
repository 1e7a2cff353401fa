//! API Routes

pub mod alerts;
pub mod route;
pub mod sensors;
