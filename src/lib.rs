pub mod bots;
pub mod config;
pub mod db;
pub mod http_server;
pub mod ledger;
pub mod models;
pub mod schema;
pub mod utils;
