pub mod config_cmd;
pub mod generate;
pub mod notify;
pub mod preset;
pub mod settings;
pub mod workspace;
