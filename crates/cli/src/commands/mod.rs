pub mod config_cmd;
pub mod init;
pub mod invoke;
pub mod tools;
