//! sigflow: aggregate refresh and warehouse export for a signature database

pub mod aggregates;
pub mod config;
pub mod export;
pub mod registrar;
pub mod sqlite_pragma;
pub mod store;
