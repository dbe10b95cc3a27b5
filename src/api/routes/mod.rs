//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod members;
pub mod session;
pub mod stats;
pub mod workplaces;
