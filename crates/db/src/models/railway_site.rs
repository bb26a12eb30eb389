use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Site lifecycle.
///
/// planning → survey → design → construction → operational ⇄ maintenance.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    TS,
    EnumString,
    EnumIter,
    Display,
    Default,
)]
#[sqlx(type_name = "site_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SiteStatus {
    #[default]
    Planning,
    Survey,
    Design,
    Construction,
    Operational,
    Maintenance,
}

impl SiteStatus {
    pub fn can_transition_to(self, next: SiteStatus) -> bool {
        use SiteStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Planning, Survey)
                | (Survey, Design)
                | (Design, Construction)
                | (Construction, Operational)
                | (Operational, Maintenance)
                | (Maintenance, Operational)
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct RailwaySite {
    pub id: Uuid,
    pub name: String,
    pub station_code: String,
    pub cluster: String,
    pub zone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub feasible_capacity: f64, // kW
    pub feasible_area: f64,     // m²
    pub status: SiteStatus,
    pub energy_generated: f64, // kWh, placeholder estimate at creation
    pub efficiency: f64,       // percent
    pub carbon_offset_kg: f64,
    pub monthly_energy_target: f64, // kWh
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRailwaySite {
    pub name: String,
    pub station_code: String,
    pub cluster: String,
    pub zone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub feasible_capacity: f64,
    pub feasible_area: f64,
    pub status: Option<SiteStatus>,
    pub monthly_energy_target: Option<f64>,
    pub energy_generated: Option<f64>,
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateRailwaySite {
    pub name: Option<String>,
    pub station_code: Option<String>,
    pub cluster: Option<String>,
    pub zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub feasible_capacity: Option<f64>,
    pub feasible_area: Option<f64>,
    pub status: Option<SiteStatus>,
    pub monthly_energy_target: Option<f64>,
}

const SITE_COLUMNS: &str = "id, name, station_code, cluster, zone, latitude, longitude, address, feasible_capacity, feasible_area, status, energy_generated, efficiency, carbon_offset_kg, monthly_energy_target, created_at, updated_at";

impl RailwaySite {
    pub async fn create(pool: &SqlitePool, site: &RailwaySite) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO railway_sites ({SITE_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
               RETURNING {SITE_COLUMNS}"#
        );
        sqlx::query_as::<_, RailwaySite>(&sql)
            .bind(site.id)
            .bind(&site.name)
            .bind(&site.station_code)
            .bind(&site.cluster)
            .bind(&site.zone)
            .bind(site.latitude)
            .bind(site.longitude)
            .bind(&site.address)
            .bind(site.feasible_capacity)
            .bind(site.feasible_area)
            .bind(site.status)
            .bind(site.energy_generated)
            .bind(site.efficiency)
            .bind(site.carbon_offset_kg)
            .bind(site.monthly_energy_target)
            .bind(site.created_at)
            .bind(site.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM railway_sites WHERE id = $1");
        sqlx::query_as::<_, RailwaySite>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All sites in insertion order.
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM railway_sites ORDER BY rowid ASC");
        sqlx::query_as::<_, RailwaySite>(&sql).fetch_all(pool).await
    }

    pub async fn update(pool: &SqlitePool, site: &RailwaySite) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"UPDATE railway_sites
               SET name = $2, station_code = $3, cluster = $4, zone = $5, latitude = $6,
                   longitude = $7, address = $8, feasible_capacity = $9, feasible_area = $10,
                   status = $11, energy_generated = $12, efficiency = $13, carbon_offset_kg = $14,
                   monthly_energy_target = $15, updated_at = $16
               WHERE id = $1
               RETURNING {SITE_COLUMNS}"#
        );
        sqlx::query_as::<_, RailwaySite>(&sql)
            .bind(site.id)
            .bind(&site.name)
            .bind(&site.station_code)
            .bind(&site.cluster)
            .bind(&site.zone)
            .bind(site.latitude)
            .bind(site.longitude)
            .bind(&site.address)
            .bind(site.feasible_capacity)
            .bind(site.feasible_area)
            .bind(site.status)
            .bind(site.energy_generated)
            .bind(site.efficiency)
            .bind(site.carbon_offset_kg)
            .bind(site.monthly_energy_target)
            .bind(site.updated_at)
            .fetch_optional(pool)
            .await
    }

    /// Removes only the site row. Projects and production rows that reference
    /// it are left alone.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM railway_sites WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::DBService;

    pub(crate) fn sample_site(name: &str, cluster: &str, capacity: f64) -> RailwaySite {
        let now = Utc::now();
        RailwaySite {
            id: Uuid::new_v4(),
            name: name.to_string(),
            station_code: name.chars().take(4).collect::<String>().to_uppercase(),
            cluster: cluster.to_string(),
            zone: None,
            latitude: 28.64,
            longitude: 77.22,
            address: None,
            feasible_capacity: capacity,
            feasible_area: capacity * 10.0,
            status: SiteStatus::Planning,
            energy_generated: 0.0,
            efficiency: 0.0,
            carbon_offset_kg: 0.0,
            monthly_energy_target: capacity * 4.0 * 30.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn site_lifecycle_transitions() {
        use SiteStatus::*;
        assert!(Planning.can_transition_to(Survey));
        assert!(Operational.can_transition_to(Maintenance));
        assert!(Maintenance.can_transition_to(Operational));
        assert!(Design.can_transition_to(Design));
        assert!(!Operational.can_transition_to(Planning));
        assert!(!Planning.can_transition_to(Operational));
        assert!(!Construction.can_transition_to(Maintenance));
    }

    #[tokio::test]
    async fn crud_round() {
        let db = DBService::new_in_memory().await.unwrap();
        let mut site = sample_site("New Delhi", "Northern", 150.0);
        RailwaySite::create(&db.pool, &site).await.unwrap();
        RailwaySite::create(&db.pool, &sample_site("Agra Cantt", "North Central", 90.0))
            .await
            .unwrap();

        site.status = SiteStatus::Survey;
        let updated = RailwaySite::update(&db.pool, &site).await.unwrap().unwrap();
        assert_eq!(updated.status, SiteStatus::Survey);

        let found = RailwaySite::find_by_id(&db.pool, site.id).await.unwrap().unwrap();
        assert_eq!(found.cluster, "Northern");
        assert_eq!(found.monthly_energy_target, 18_000.0);

        assert_eq!(RailwaySite::delete(&db.pool, site.id).await.unwrap(), 1);
        assert_eq!(RailwaySite::delete(&db.pool, site.id).await.unwrap(), 0);
        assert_eq!(RailwaySite::find_all(&db.pool).await.unwrap().len(), 1);
    }
}
