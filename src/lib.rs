// imgate: edge image gateway library

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod image_optimizer;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod proxy;
pub mod rate_limit;
pub mod storage;
