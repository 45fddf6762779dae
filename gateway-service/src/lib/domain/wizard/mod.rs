pub mod errors;
pub mod locks;
pub mod models;
pub mod parsers;
pub mod ports;
pub mod service;
