pub mod commands;
pub mod download;
pub mod http;
pub mod minecraft;
pub mod resolve;
pub mod runtime;
pub mod source;
pub mod store;
