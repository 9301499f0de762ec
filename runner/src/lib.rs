pub mod cli;
pub mod combinations;
pub mod config;
pub mod executor;

#[cfg(test)]
mod config_test;
