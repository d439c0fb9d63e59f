pub mod alerts;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod coords;
pub mod database;
pub mod errors;
pub mod events;
pub mod mount;
pub mod orchestrator;
pub mod registry;
pub mod safety;
pub mod sensors;
pub mod services;
pub mod tools;
pub mod voice_client;
pub mod web;

pub use config::Config;
pub use database::Database;
pub use errors::NightwatchError;
pub use orchestrator::Orchestrator;
pub use registry::ServiceRegistry;
