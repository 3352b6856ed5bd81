use crate::{
    db::enums::{Currency, MetalKind, PropertyType},
    schema::{metal_holdings, real_estate_prices, real_estates},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = metal_holdings)]
pub struct MetalHolding {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub metal: MetalKind,
    pub grams: BigDecimal,
    pub cost_basis: BigDecimal,
    pub cost_currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = real_estates)]
pub struct RealEstate {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub name: String,
    pub property_type: PropertyType,
    pub country: String,
    pub city: Option<String>,
    pub area_m2: BigDecimal,
    pub purchase_price: BigDecimal,
    pub purchase_currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// Published price-per-m² observations used to value real estate.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = real_estate_prices)]
pub struct RealEstatePrice {
    pub id: Uuid,
    pub property_type: PropertyType,
    pub country: Option<String>,
    pub city: Option<String>,
    pub currency: Currency,
    pub price_m2: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl MetalHolding {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<Option<MetalHolding>> {
        metal_holdings::table
            .find(id)
            .select(MetalHolding::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_wallets(
        conn: &mut AsyncPgConnection,
        wallet_ids: &[Uuid],
    ) -> QueryResult<Vec<MetalHolding>> {
        metal_holdings::table
            .filter(metal_holdings::wallet_id.eq_any(wallet_ids))
            .select(MetalHolding::as_select())
            .load(conn)
            .await
    }

    pub async fn update_position(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        grams: &BigDecimal,
        cost_basis: &BigDecimal,
    ) -> QueryResult<()> {
        diesel::update(metal_holdings::table.find(id))
            .set((
                metal_holdings::grams.eq(grams),
                metal_holdings::cost_basis.eq(cost_basis),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<()> {
        diesel::delete(metal_holdings::table.find(id))
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl RealEstate {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<Option<RealEstate>> {
        real_estates::table
            .find(id)
            .select(RealEstate::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_wallets(
        conn: &mut AsyncPgConnection,
        wallet_ids: &[Uuid],
    ) -> QueryResult<Vec<RealEstate>> {
        real_estates::table
            .filter(real_estates::wallet_id.eq_any(wallet_ids))
            .select(RealEstate::as_select())
            .load(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<()> {
        diesel::delete(real_estates::table.find(id))
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl RealEstatePrice {
    async fn latest_match(
        conn: &mut AsyncPgConnection,
        property_type: PropertyType,
        currency: Currency,
        country: Option<&str>,
        city: Option<&str>,
    ) -> QueryResult<Option<RealEstatePrice>> {
        let mut query = real_estate_prices::table
            .filter(real_estate_prices::property_type.eq(property_type))
            .filter(real_estate_prices::currency.eq(currency))
            .into_boxed();
        query = match country {
            Some(country) => query.filter(real_estate_prices::country.eq(country)),
            None => query.filter(real_estate_prices::country.is_null()),
        };
        query = match city {
            Some(city) => query.filter(real_estate_prices::city.eq(city)),
            None => query.filter(real_estate_prices::city.is_null()),
        };
        query
            .order_by(real_estate_prices::created_at.desc())
            .limit(1)
            .select(RealEstatePrice::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Latest price-per-m² with fallback: exact (country, city) match, then
    /// country-wide, then the global benchmark row.
    pub async fn latest_with_fallback(
        conn: &mut AsyncPgConnection,
        property_type: PropertyType,
        currency: Currency,
        country: &str,
        city: Option<&str>,
    ) -> QueryResult<Option<RealEstatePrice>> {
        if let Some(city) = city {
            if let Some(hit) =
                Self::latest_match(conn, property_type, currency, Some(country), Some(city)).await?
            {
                return Ok(Some(hit));
            }
        }
        if let Some(hit) =
            Self::latest_match(conn, property_type, currency, Some(country), None).await?
        {
            return Ok(Some(hit));
        }
        Self::latest_match(conn, property_type, currency, None, None).await
    }
}
