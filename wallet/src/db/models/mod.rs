pub mod assets;
pub mod banks;
pub mod brokerage;
pub mod capital_gains;
pub mod deposits;
pub mod events;
pub mod holdings;
pub mod instruments;
pub mod snapshots;
pub mod transactions;
pub mod users;
pub mod wallets;
