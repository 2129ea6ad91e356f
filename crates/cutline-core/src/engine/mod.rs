pub mod postround;
pub mod round;
pub mod scoring;
pub mod standings;
pub mod validate;
