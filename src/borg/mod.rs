pub mod archive;
pub mod repo;
pub mod timestamp;
