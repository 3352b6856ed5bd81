use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::CurrencyCode"]
pub enum Currency {
    #[db_rename = "PLN"]
    #[serde(rename = "PLN")]
    Pln,
    #[db_rename = "USD"]
    #[serde(rename = "USD")]
    Usd,
    #[db_rename = "EUR"]
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Pln => "PLN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::InstrumentType"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    #[db_rename = "EQUITY"]
    Equity,
    #[db_rename = "FUND"]
    Fund,
    #[db_rename = "BOND"]
    Bond,
    #[db_rename = "CURRENCY_PAIR"]
    CurrencyPair,
    #[db_rename = "CRYPTO_ASSET"]
    CryptoAsset,
    #[db_rename = "INDEX"]
    Index,
    #[db_rename = "REIT"]
    Reit,
    #[db_rename = "COMMODITY"]
    Commodity,
    #[db_rename = "MACRO"]
    Macro,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::InstrumentStatus"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentStatus {
    #[db_rename = "ACTIVE"]
    Active,
    #[db_rename = "INACTIVE"]
    Inactive,
}
