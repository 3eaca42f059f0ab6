pub mod bootstrap;
pub mod clients;
pub mod config;
pub mod http;
pub mod storage;
