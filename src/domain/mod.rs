pub mod catalog;
pub mod error;
pub mod issue;
pub mod publisher_config;
pub mod report;
pub mod status_map;
