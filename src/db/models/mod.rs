pub mod reading;

pub use reading::{NewReading, Reading};
