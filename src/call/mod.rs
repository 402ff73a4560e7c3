// Call module - signed requests against the ledger's entry points

mod builder;
mod codec;
mod model;
mod validator;

pub use builder::*;
pub use codec::*;
pub use model::*;
pub use validator::*;
