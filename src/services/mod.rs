//! Core services for collection listing and tree walking

pub mod cursor;
pub mod walk;
