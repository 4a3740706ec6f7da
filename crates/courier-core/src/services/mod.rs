//! Async service facades over the local store

mod database;

pub use database::DatabaseService;
