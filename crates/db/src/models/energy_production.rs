use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// One day of measured output for a site.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct EnergyProduction {
    pub id: Uuid,
    pub site_id: Uuid,
    pub date: NaiveDate,
    pub energy_kwh: f64,
    pub peak_power_kw: Option<f64>,
    pub irradiance: Option<f64>, // kWh/m²
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEnergyProduction {
    pub date: NaiveDate,
    pub energy_kwh: f64,
    pub peak_power_kw: Option<f64>,
    pub irradiance: Option<f64>,
}

const PRODUCTION_COLUMNS: &str =
    "id, site_id, date, energy_kwh, peak_power_kw, irradiance, created_at";

impl EnergyProduction {
    pub fn from_create(
        data: CreateEnergyProduction,
        id: Uuid,
        site_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            site_id,
            date: data.date,
            energy_kwh: data.energy_kwh,
            peak_power_kw: data.peak_power_kw,
            irradiance: data.irradiance,
            created_at: now,
        }
    }

    pub async fn create(pool: &SqlitePool, row: &EnergyProduction) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO energy_production ({PRODUCTION_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {PRODUCTION_COLUMNS}"#
        );
        sqlx::query_as::<_, EnergyProduction>(&sql)
            .bind(row.id)
            .bind(row.site_id)
            .bind(row.date)
            .bind(row.energy_kwh)
            .bind(row.peak_power_kw)
            .bind(row.irradiance)
            .bind(row.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PRODUCTION_COLUMNS} FROM energy_production WHERE id = $1");
        sqlx::query_as::<_, EnergyProduction>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {PRODUCTION_COLUMNS} FROM energy_production ORDER BY rowid ASC");
        sqlx::query_as::<_, EnergyProduction>(&sql)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_site_id(
        pool: &SqlitePool,
        site_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PRODUCTION_COLUMNS} FROM energy_production WHERE site_id = $1 ORDER BY date ASC"
        );
        sqlx::query_as::<_, EnergyProduction>(&sql)
            .bind(site_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &SqlitePool, row: &EnergyProduction) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"UPDATE energy_production
               SET site_id = $2, date = $3, energy_kwh = $4, peak_power_kw = $5, irradiance = $6
               WHERE id = $1
               RETURNING {PRODUCTION_COLUMNS}"#
        );
        sqlx::query_as::<_, EnergyProduction>(&sql)
            .bind(row.id)
            .bind(row.site_id)
            .bind(row.date)
            .bind(row.energy_kwh)
            .bind(row.peak_power_kw)
            .bind(row.irradiance)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM energy_production WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_site_id(pool: &SqlitePool, site_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM energy_production WHERE site_id = $1")
            .bind(site_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
