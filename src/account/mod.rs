pub mod auth;
pub mod database;
pub mod entities;
mod router;
pub mod service;

pub use router::router;
