#![deny(warnings)]
pub mod engine;
pub mod model;
