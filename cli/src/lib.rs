//! suiteflow-cli library, exposed for unit tests.

pub mod app;
pub mod catalog;
pub mod commands;
pub mod signals;
