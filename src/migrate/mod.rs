pub mod audit;
pub mod config;
pub mod driver;
pub mod progress;
pub mod tools;
pub mod warn;
