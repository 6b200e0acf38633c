pub mod cache;
pub mod db;
pub mod engine;
pub mod kv;
pub mod models;
pub mod schema;

mod error;

pub use error::{Error, Result};
