// Insurance module - policy purchases and the delay-crediting sweep

mod book;
mod policy;

pub use book::{PolicyBook, PolicyCredit};
pub use policy::InsurancePolicy;
