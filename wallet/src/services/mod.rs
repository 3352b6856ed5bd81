pub mod accounts;
pub mod assets;
pub mod events;
pub mod ledger;
pub mod reporting;
pub mod secure;
pub mod snapshots;
