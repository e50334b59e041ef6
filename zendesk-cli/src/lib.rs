// ABOUTME: Library exports for the zd CLI modules for testing and external use
// ABOUTME: Makes internal modules available to integration tests

pub mod cli;
pub mod cli_output;
pub mod commands;
pub mod completions;
pub mod config;
pub mod interactive;
pub mod output;
