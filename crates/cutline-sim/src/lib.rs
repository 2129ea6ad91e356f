#![deny(warnings)]

pub mod analytics;
pub mod evaluator;
pub mod logging;
pub mod runner;
pub mod settings;
