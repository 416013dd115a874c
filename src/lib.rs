pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod intake;
pub mod session;
pub mod sheet;
pub mod storage;
pub mod vision;
