mod ledger;
mod profiles;

pub use ledger::InteractionLedger;
pub use profiles::ProfileStore;
