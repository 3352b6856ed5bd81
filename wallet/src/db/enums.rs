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

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PLN" => Some(Currency::Pln),
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::AccountType"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    #[db_rename = "CURRENT"]
    Current,
    #[db_rename = "SAVINGS"]
    Savings,
    #[db_rename = "BROKERAGE"]
    Brokerage,
    #[db_rename = "CREDIT"]
    Credit,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::BrokerageEventKind"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerageEventKind {
    #[db_rename = "BUY"]
    Buy,
    #[db_rename = "SELL"]
    Sell,
    #[db_rename = "SPLIT"]
    Split,
    #[db_rename = "DIV"]
    Div,
}

impl BrokerageEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerageEventKind::Buy => "BUY",
            BrokerageEventKind::Sell => "SELL",
            BrokerageEventKind::Split => "SPLIT",
            BrokerageEventKind::Div => "DIV",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BUY" => Some(BrokerageEventKind::Buy),
            "SELL" => Some(BrokerageEventKind::Sell),
            "SPLIT" => Some(BrokerageEventKind::Split),
            "DIV" => Some(BrokerageEventKind::Div),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::CapitalGainKind"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapitalGainKind {
    #[db_rename = "DEPOSIT_INTEREST"]
    DepositInterest,
    #[db_rename = "BROKER_REALIZED_PNL"]
    BrokerRealizedPnl,
    #[db_rename = "BROKER_DIVIDEND"]
    BrokerDividend,
    #[db_rename = "METAL_REALIZED_PNL"]
    MetalRealizedPnl,
    #[db_rename = "REAL_ESTATE_REALIZED_PNL"]
    RealEstateRealizedPnl,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::TransactionStatus"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[db_rename = "INCOME"]
    Income,
    #[db_rename = "EXPENSE"]
    Expense,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::MetalKind"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetalKind {
    #[db_rename = "GOLD"]
    Gold,
    #[db_rename = "SILVER"]
    Silver,
    #[db_rename = "PLATINUM"]
    Platinum,
    #[db_rename = "PALLADIUM"]
    Palladium,
}

impl MetalKind {
    /// Futures symbol used to value the metal from live quotes.
    pub fn futures_symbol(&self) -> &'static str {
        match self {
            MetalKind::Gold => "GC=F",
            MetalKind::Silver => "SI=F",
            MetalKind::Platinum => "PL=F",
            MetalKind::Palladium => "PA=F",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetalKind::Gold => "GOLD",
            MetalKind::Silver => "SILVER",
            MetalKind::Platinum => "PLATINUM",
            MetalKind::Palladium => "PALLADIUM",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, diesel_derive_enum::DbEnum,
)]
#[ExistingTypePath = "crate::schema::sql_types::PropertyType"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    #[db_rename = "APARTMENT"]
    Apartment,
    #[db_rename = "HOUSE"]
    House,
    #[db_rename = "LAND"]
    Land,
    #[db_rename = "COMMERCIAL"]
    Commercial,
}
