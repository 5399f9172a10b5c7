//! course-forge: turns a course request into a research brief, a validated
//! design spec and a storyboard, tracked as a durable course run.

pub mod config;
pub mod errors;
pub mod generation;
pub mod logging;
pub mod server;
