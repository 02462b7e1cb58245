mod catalog;
mod classifier;
mod controller;
mod history;
mod labels;
mod normalize;
mod routes;
mod server;
mod telemetry;

pub mod app;
pub mod config;

pub use app::start_app;
