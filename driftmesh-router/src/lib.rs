//! Epidemic router and delivery ledger.

mod epidemic;
mod ledger;

pub use epidemic::{EpidemicRouter, Router};
pub use ledger::DeliveryLedger;
