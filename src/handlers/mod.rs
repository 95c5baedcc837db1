// src/handlers/mod.rs

pub mod exam;
pub mod report;
pub mod session;
