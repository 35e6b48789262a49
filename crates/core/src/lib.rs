#![forbid(unsafe_code)]

pub mod consent;
pub mod error;
pub mod model;
pub mod scoring;
pub mod time;
pub mod transit;
pub mod view;

pub use error::Error;
pub use time::Clock;
