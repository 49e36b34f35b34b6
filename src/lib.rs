pub mod analytics;
pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod model;
pub mod output;
pub mod query;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
