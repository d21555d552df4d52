pub mod header;
pub mod middleware;
pub mod service;
