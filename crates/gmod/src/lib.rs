pub mod builder;
pub mod commands;
