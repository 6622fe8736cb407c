//! Request handlers

pub mod health;
pub mod events;
pub mod catalog;
pub mod batch;
