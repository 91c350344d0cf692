//! Request handlers

pub mod calculation;
pub mod health;
