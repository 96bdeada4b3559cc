pub mod api;
pub mod app;
pub mod central;
pub mod columns;
pub mod config;
pub mod domain;
pub mod error;
pub mod groups;
pub mod locator;
pub mod output;
pub mod registrar;
pub mod store;
pub mod transfer;
