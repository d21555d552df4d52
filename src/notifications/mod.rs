pub mod entities;
pub mod gateway;
