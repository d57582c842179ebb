pub mod config;
pub mod error;
pub mod event;
pub mod permission;
pub mod tool;

#[cfg(test)]
mod tests;
