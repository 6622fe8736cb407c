//! Request and response bodies

pub mod catalog;
pub mod batch;
pub mod events;
