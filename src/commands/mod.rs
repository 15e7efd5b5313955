pub mod config;
pub mod essential;
pub mod init;
pub mod install;
pub mod list;
pub mod migrate;
pub mod uninstall;
pub mod update;

pub use config::Config;
