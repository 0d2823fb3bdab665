mod connection;
mod helpers;
mod repositories;
mod schema;

pub mod models;

pub use connection::Database;
pub use models::{NewReading, Reading};
