pub mod config;
pub mod decode;
pub mod hid;
pub mod manager;
pub mod rules;
