// Identity module - Ed25519 keypairs and ledger account addresses

mod address;
mod keypair;
mod signer;

pub use address::*;
pub use keypair::*;
pub use signer::*;
