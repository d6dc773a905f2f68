mod driver;

pub use driver::{DatabaseDriver, DriverResult, DriverSession};
