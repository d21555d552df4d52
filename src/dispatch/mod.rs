pub mod entities;
pub mod error;
mod router;
pub mod service;

pub use router::router;
