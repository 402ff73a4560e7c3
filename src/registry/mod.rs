// Registry module - airline membership and the funding gate

mod airline;

pub use airline::{AirlineAccount, AirlineRegistry};
