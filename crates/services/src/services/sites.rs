use chrono::Utc;
use db::{
    models::{
        energy_production::{CreateEnergyProduction, EnergyProduction},
        railway_site::{CreateRailwaySite, RailwaySite, UpdateRailwaySite},
    },
    store::{StoreError, Stores},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    pagination::{Pagination, paginate},
    site_stats::{DashboardStats, SitesWithStats, cluster_statistics, dashboard_stats},
    solar_metrics::{
        PaybackInputs, SiteEstimates, monthly_energy_target, payback_period_years,
        stored_carbon_offset_kg,
    },
    validation::{
        ValidationError, illegal_transition, require_in_range, require_non_empty,
        require_non_negative,
    },
};

#[derive(Debug, Error)]
pub enum SiteServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("site {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct SiteListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Case-insensitive match on name, station code or cluster.
    pub search: Option<String>,
    pub cluster: Option<String>,
}

impl SiteListQuery {
    fn matches(&self, site: &RailwaySite) -> bool {
        let cluster_ok = self
            .cluster
            .as_deref()
            .is_none_or(|c| site.cluster.eq_ignore_ascii_case(c));
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&site.name, &site.station_code, &site.cluster]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        };
        cluster_ok && search_ok
    }
}

/// Financial inputs for a payback estimate. Capacity comes from the site.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct PaybackQuery {
    pub capex: f64,
    pub tariff_per_kwh: f64,
    #[serde(default)]
    pub tariff_escalation: f64,
    #[serde(default)]
    pub annual_degradation: f64,
    #[serde(default)]
    pub annual_om_cost: f64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PaybackEstimate {
    pub site_id: Uuid,
    pub inputs: PaybackInputs,
    /// `None` when the investment is not recovered within the system life.
    pub years: Option<f64>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SitePage {
    pub sites: Vec<RailwaySite>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct SiteService {
    stores: Stores,
}

impl SiteService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    #[instrument(skip_all, fields(station_code = %data.station_code))]
    pub async fn create(&self, data: CreateRailwaySite) -> Result<RailwaySite, SiteServiceError> {
        let now = Utc::now();
        let estimates = match data.efficiency {
            Some(efficiency) => {
                require_in_range("efficiency", efficiency, 0.0, 100.0)?;
                SiteEstimates::with_efficiency(data.feasible_capacity, efficiency)
            }
            None => SiteEstimates::placeholder(data.feasible_capacity, &mut rand::thread_rng()),
        };
        let energy_generated = data.energy_generated.unwrap_or(estimates.energy_generated);

        let site = RailwaySite {
            id: Uuid::new_v4(),
            name: data.name,
            station_code: data.station_code,
            cluster: data.cluster,
            zone: data.zone,
            latitude: data.latitude,
            longitude: data.longitude,
            address: data.address,
            feasible_capacity: data.feasible_capacity,
            feasible_area: data.feasible_area,
            status: data.status.unwrap_or_default(),
            energy_generated,
            efficiency: estimates.efficiency,
            carbon_offset_kg: stored_carbon_offset_kg(energy_generated),
            monthly_energy_target: data
                .monthly_energy_target
                .unwrap_or_else(|| monthly_energy_target(data.feasible_capacity)),
            created_at: now,
            updated_at: now,
        };
        validate_site(&site)?;

        let created = self.stores.sites.create(&site).await?;
        info!(
            site_id = %created.id,
            cluster = %created.cluster,
            feasible_capacity = created.feasible_capacity,
            "Created railway site"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<RailwaySite, SiteServiceError> {
        self.stores
            .sites
            .get(id)
            .await?
            .ok_or(SiteServiceError::NotFound(id))
    }

    /// Newest first, filtered, one page.
    pub async fn list(&self, query: &SiteListQuery) -> Result<SitePage, SiteServiceError> {
        let mut sites: Vec<RailwaySite> = self
            .stores
            .sites
            .list()
            .await?
            .into_iter()
            .filter(|s| query.matches(s))
            .collect();
        sites.reverse();

        let (sites, pagination) = paginate(sites, query.page, query.limit);
        Ok(SitePage { sites, pagination })
    }

    #[instrument(skip(self, data))]
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateRailwaySite,
    ) -> Result<RailwaySite, SiteServiceError> {
        let mut site = self.get(id).await?;
        apply_update(&mut site, data)?;
        validate_site(&site)?;
        site.updated_at = Utc::now();
        Ok(self.stores.sites.update(&site).await?)
    }

    /// Removes the site only. Projects and production rows pointing at it are
    /// left in place.
    pub async fn delete(&self, id: Uuid) -> Result<(), SiteServiceError> {
        if !self.stores.sites.delete(id).await? {
            return Err(SiteServiceError::NotFound(id));
        }
        info!(site_id = %id, "Deleted railway site");
        Ok(())
    }

    #[instrument(skip(self, query))]
    pub async fn payback(
        &self,
        id: Uuid,
        query: PaybackQuery,
    ) -> Result<PaybackEstimate, SiteServiceError> {
        require_non_negative("capex", query.capex)?;
        require_non_negative("tariff_per_kwh", query.tariff_per_kwh)?;
        require_in_range("tariff_escalation", query.tariff_escalation, -1.0, 1.0)?;
        require_in_range("annual_degradation", query.annual_degradation, 0.0, 1.0)?;
        require_non_negative("annual_om_cost", query.annual_om_cost)?;

        let site = self.get(id).await?;
        let inputs = PaybackInputs {
            capex: query.capex,
            capacity_kw: site.feasible_capacity,
            tariff_per_kwh: query.tariff_per_kwh,
            tariff_escalation: query.tariff_escalation,
            annual_degradation: query.annual_degradation,
            annual_om_cost: query.annual_om_cost,
        };
        let years = payback_period_years(&inputs);
        Ok(PaybackEstimate {
            site_id: id,
            inputs,
            years,
        })
    }

    pub async fn sites_with_stats(&self) -> Result<SitesWithStats, SiteServiceError> {
        let sites = self.stores.sites.list().await?;
        let statistics = cluster_statistics(&sites);
        Ok(SitesWithStats { sites, statistics })
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, SiteServiceError> {
        let sites = self.stores.sites.list().await?;
        let production = self.stores.production.list().await?;
        let projects = self.stores.projects.list().await?;
        Ok(dashboard_stats(&sites, &production, projects.len()))
    }

    #[instrument(skip(self, data))]
    pub async fn record_production(
        &self,
        site_id: Uuid,
        data: CreateEnergyProduction,
    ) -> Result<EnergyProduction, SiteServiceError> {
        self.get(site_id).await?;
        require_non_negative("energy_kwh", data.energy_kwh)?;
        if let Some(peak) = data.peak_power_kw {
            require_non_negative("peak_power_kw", peak)?;
        }
        if let Some(irradiance) = data.irradiance {
            require_non_negative("irradiance", irradiance)?;
        }

        let row = EnergyProduction::from_create(data, Uuid::new_v4(), site_id, Utc::now());
        let created = self.stores.production.create(&row).await?;
        info!(%site_id, date = %created.date, energy_kwh = created.energy_kwh, "Recorded production");
        Ok(created)
    }

    /// Rows are returned even when the site itself is gone.
    pub async fn list_production(
        &self,
        site_id: Uuid,
    ) -> Result<Vec<EnergyProduction>, SiteServiceError> {
        Ok(self.stores.production.list_by_site(site_id).await?)
    }

    pub async fn delete_production(&self, site_id: Uuid) -> Result<u64, SiteServiceError> {
        let removed = self.stores.production.delete_by_site(site_id).await?;
        if removed > 0 {
            warn!(%site_id, removed, "Deleted production rows");
        }
        Ok(removed)
    }
}

fn validate_site(site: &RailwaySite) -> Result<(), ValidationError> {
    require_non_empty("name", &site.name)?;
    require_non_empty("station_code", &site.station_code)?;
    require_non_empty("cluster", &site.cluster)?;
    require_in_range("latitude", site.latitude, -90.0, 90.0)?;
    require_in_range("longitude", site.longitude, -180.0, 180.0)?;
    require_non_negative("feasible_capacity", site.feasible_capacity)?;
    require_non_negative("feasible_area", site.feasible_area)?;
    require_non_negative("monthly_energy_target", site.monthly_energy_target)?;
    Ok(())
}

/// Merge the present fields of `data` into `site`. A capacity change without
/// an explicit target re-derives the monthly target.
pub fn apply_update(site: &mut RailwaySite, data: UpdateRailwaySite) -> Result<(), ValidationError> {
    if let Some(next) = data.status {
        if !site.status.can_transition_to(next) {
            return Err(illegal_transition("status", site.status, next));
        }
        site.status = next;
    }
    if let Some(name) = data.name {
        site.name = name;
    }
    if let Some(station_code) = data.station_code {
        site.station_code = station_code;
    }
    if let Some(cluster) = data.cluster {
        site.cluster = cluster;
    }
    if let Some(zone) = data.zone {
        site.zone = Some(zone);
    }
    if let Some(latitude) = data.latitude {
        site.latitude = latitude;
    }
    if let Some(longitude) = data.longitude {
        site.longitude = longitude;
    }
    if let Some(address) = data.address {
        site.address = Some(address);
    }
    if let Some(area) = data.feasible_area {
        site.feasible_area = area;
    }
    match (data.feasible_capacity, data.monthly_energy_target) {
        (_, Some(target)) => {
            if let Some(capacity) = data.feasible_capacity {
                site.feasible_capacity = capacity;
            }
            site.monthly_energy_target = target;
        }
        (Some(capacity), None) => {
            site.feasible_capacity = capacity;
            site.monthly_energy_target = monthly_energy_target(capacity);
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::{
        DBService,
        models::{
            epc_project::{CreateEpcProject, EpcProject},
            railway_site::SiteStatus,
        },
        sqlite_store::SqliteStore,
    };

    use super::*;

    async fn service() -> (SiteService, Stores) {
        let db = DBService::new_in_memory().await.unwrap();
        let stores = SqliteStore::stores(&db);
        (SiteService::new(stores.clone()), stores)
    }

    fn create_input(name: &str, code: &str, cluster: &str, capacity: f64) -> CreateRailwaySite {
        CreateRailwaySite {
            name: name.into(),
            station_code: code.into(),
            cluster: cluster.into(),
            zone: None,
            latitude: 23.25,
            longitude: 77.41,
            address: None,
            feasible_capacity: capacity,
            feasible_area: capacity * 8.0,
            status: None,
            monthly_energy_target: None,
            energy_generated: None,
            efficiency: None,
        }
    }

    #[tokio::test]
    async fn create_derives_target_and_estimates() {
        let (service, _) = service().await;
        let site = service
            .create(create_input("Bhopal Junction", "BPL", "Central", 150.0))
            .await
            .unwrap();
        assert_eq!(site.monthly_energy_target, 18_000.0);
        assert_eq!(site.status, SiteStatus::Planning);
        assert!((75.0..=95.0).contains(&site.efficiency));
        assert!(site.energy_generated > 0.0);
        assert!((site.carbon_offset_kg - site.energy_generated * 0.82).abs() <= 0.05);
    }

    #[tokio::test]
    async fn explicit_energy_stores_rounded_carbon_offset() {
        let (service, stores) = service().await;
        let mut input = create_input("Bina", "BINA", "Central", 40.0);
        input.energy_generated = Some(123.45);
        let site = service.create(input).await.unwrap();
        assert_eq!(site.carbon_offset_kg, 101.2);

        let stored = stores.sites.get(site.id).await.unwrap().unwrap();
        assert_eq!(stored.carbon_offset_kg, 101.2);
    }

    #[tokio::test]
    async fn payback_uses_site_capacity() {
        let (service, _) = service().await;
        let site = service
            .create(create_input("Kota", "KOTA", "West Central", 100.0))
            .await
            .unwrap();

        // 100 kW * 4 h * 365 d * 5/kWh = 730,000 a year
        let estimate = service
            .payback(
                site.id,
                PaybackQuery {
                    capex: 3_650_000.0,
                    tariff_per_kwh: 5.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(estimate.inputs.capacity_kw, 100.0);
        assert_eq!(estimate.years, Some(5.0));

        let never = service
            .payback(
                site.id,
                PaybackQuery {
                    capex: 1e12,
                    tariff_per_kwh: 5.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(never.years, None);

        let err = service
            .payback(
                site.id,
                PaybackQuery {
                    capex: -1.0,
                    tariff_per_kwh: 5.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SiteServiceError::Validation(ref v) if v.field == "capex"));

        let missing = service.payback(Uuid::new_v4(), PaybackQuery::default()).await;
        assert!(matches!(missing, Err(SiteServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_validates_coordinates() {
        let (service, _) = service().await;
        let mut input = create_input("Nowhere", "NWH", "Central", 10.0);
        input.latitude = 123.0;
        let err = service.create(input).await.unwrap_err();
        assert!(matches!(err, SiteServiceError::Validation(ref v) if v.field == "latitude"));
    }

    #[tokio::test]
    async fn list_searches_name_code_and_cluster() {
        let (service, _) = service().await;
        service.create(create_input("Howrah", "HWH", "Eastern", 100.0)).await.unwrap();
        service.create(create_input("Sealdah", "SDAH", "Eastern", 80.0)).await.unwrap();
        service.create(create_input("Mumbai Central", "MMCT", "Western", 120.0)).await.unwrap();

        let by_code = service
            .list(&SiteListQuery {
                search: Some("sdah".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_code.sites.len(), 1);
        assert_eq!(by_code.sites[0].name, "Sealdah");

        let by_cluster_text = service
            .list(&SiteListQuery {
                search: Some("EASTERN".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = by_cluster_text.sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Sealdah", "Howrah"]);

        let western = service
            .list(&SiteListQuery {
                cluster: Some("Western".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(western.pagination.total, 1);
    }

    #[tokio::test]
    async fn update_follows_lifecycle_and_rederives_target() {
        let (service, _) = service().await;
        let site = service
            .create(create_input("Itarsi", "ET", "Central", 100.0))
            .await
            .unwrap();

        let err = service
            .update(
                site.id,
                UpdateRailwaySite {
                    status: Some(SiteStatus::Operational),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SiteServiceError::Validation(_)));

        let updated = service
            .update(
                site.id,
                UpdateRailwaySite {
                    status: Some(SiteStatus::Survey),
                    feasible_capacity: Some(150.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, SiteStatus::Survey);
        assert_eq!(updated.monthly_energy_target, 18_000.0);

        let explicit = service
            .update(
                site.id,
                UpdateRailwaySite {
                    feasible_capacity: Some(200.0),
                    monthly_energy_target: Some(20_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(explicit.feasible_capacity, 200.0);
        assert_eq!(explicit.monthly_energy_target, 20_000.0);
    }

    #[tokio::test]
    async fn delete_leaves_projects_and_production() {
        let (service, stores) = service().await;
        let site = service
            .create(create_input("Katni", "KTE", "Central", 60.0))
            .await
            .unwrap();
        let project = EpcProject::from_create(
            CreateEpcProject {
                project_name: "Katni shelters".into(),
                description: None,
                site_id: site.id,
                project_type: None,
                priority: None,
                phases: None,
                resources: None,
                quality_control: None,
                risks: None,
                overall_status: None,
            },
            Uuid::new_v4(),
            Utc::now(),
        );
        stores.projects.create(&project).await.unwrap();
        service
            .record_production(
                site.id,
                CreateEnergyProduction {
                    date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                    energy_kwh: 210.0,
                    peak_power_kw: Some(52.0),
                    irradiance: None,
                },
            )
            .await
            .unwrap();

        service.delete(site.id).await.unwrap();
        assert!(stores.projects.get(project.id).await.unwrap().is_some());
        assert_eq!(service.list_production(site.id).await.unwrap().len(), 1);

        assert_eq!(service.delete_production(site.id).await.unwrap(), 1);
        assert!(matches!(service.delete(site.id).await, Err(SiteServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_unreferenced_site_succeeds() {
        let (service, _) = service().await;
        let site = service
            .create(create_input("Bina", "BINA", "Central", 40.0))
            .await
            .unwrap();
        service.delete(site.id).await.unwrap();
        assert!(matches!(service.get(site.id).await, Err(SiteServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn production_requires_existing_site() {
        let (service, _) = service().await;
        let err = service
            .record_production(
                Uuid::new_v4(),
                CreateEnergyProduction {
                    date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                    energy_kwh: 10.0,
                    peak_power_kw: None,
                    irradiance: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SiteServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_group_by_cluster() {
        let (service, _) = service().await;
        service.create(create_input("Howrah", "HWH", "Eastern", 100.0)).await.unwrap();
        service.create(create_input("Sealdah", "SDAH", "Eastern", 80.0)).await.unwrap();
        service.create(create_input("Mumbai Central", "MMCT", "Western", 120.0)).await.unwrap();

        let stats = service.sites_with_stats().await.unwrap();
        assert_eq!(stats.sites.len(), 3);
        assert_eq!(stats.statistics.clusters[0].cluster, "Eastern");
        assert_eq!(stats.statistics.clusters[0].total_capacity, 180.0);

        let dashboard = service.dashboard_stats().await.unwrap();
        assert_eq!(dashboard.total_sites, 3);
        assert_eq!(dashboard.total_projects, 0);
        assert_eq!(dashboard.sites_by_status["planning"], 3);
    }
}
