// Gateway module - entry-point dispatch and payout delivery
// The dispatcher routes signed calls into the ledger; the disburser pushes
// queued transfers to an external payout system

mod disburser;
mod dispatcher;

pub use disburser::*;
pub use dispatcher::*;
