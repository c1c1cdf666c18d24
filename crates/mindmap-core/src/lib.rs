pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod images;
pub mod keys;
pub mod ledger;
pub mod model;
pub mod query;
pub mod render;
pub mod sessions;
pub mod storage;
