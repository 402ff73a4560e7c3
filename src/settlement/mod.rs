// Settlement module - withdrawable credit owed to passengers

mod credit;

pub use credit::{CreditDirection, CreditLedger, CreditRecord};
