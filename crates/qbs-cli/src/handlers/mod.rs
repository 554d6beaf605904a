pub mod config;
pub mod operation;
pub mod workspace;
