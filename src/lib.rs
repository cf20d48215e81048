pub mod backend;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod store;
