pub mod catalog;
pub mod cli;
pub mod core;
pub mod gateway;
pub mod permission;
pub mod storage;
pub mod tools;
