pub mod config;
pub mod logging;

pub mod catalog;
pub mod checksum;
pub mod fetcher;
pub mod http;
pub mod lock;
pub mod retry;
pub mod update;
