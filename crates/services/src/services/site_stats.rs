use std::collections::{BTreeMap, HashMap};

use db::models::{
    energy_production::EnergyProduction,
    railway_site::{RailwaySite, SiteStatus},
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use ts_rs::TS;

use super::solar_metrics::carbon_offset_kg;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ClusterStats {
    pub cluster: String,
    pub site_count: u32,
    pub total_capacity: f64,
    pub total_area: f64,
    pub avg_capacity: f64,
    pub max_capacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct SiteTotals {
    pub site_count: u32,
    pub total_capacity: f64,
    pub total_area: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct SiteStatistics {
    pub clusters: Vec<ClusterStats>,
    pub totals: SiteTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SitesWithStats {
    pub sites: Vec<RailwaySite>,
    pub statistics: SiteStatistics,
}

/// Cluster roll-up, largest total capacity first. Equal capacities are
/// ordered by cluster name.
pub fn cluster_statistics(sites: &[RailwaySite]) -> SiteStatistics {
    let mut grouped: HashMap<&str, Vec<&RailwaySite>> = HashMap::new();
    for site in sites {
        grouped.entry(site.cluster.as_str()).or_default().push(site);
    }

    let mut clusters: Vec<ClusterStats> = grouped
        .into_iter()
        .map(|(cluster, members)| {
            let total_capacity: f64 = members.iter().map(|s| s.feasible_capacity).sum();
            ClusterStats {
                cluster: cluster.to_string(),
                site_count: members.len() as u32,
                total_capacity,
                total_area: members.iter().map(|s| s.feasible_area).sum(),
                avg_capacity: total_capacity / members.len() as f64,
                max_capacity: members
                    .iter()
                    .map(|s| s.feasible_capacity)
                    .fold(0.0, f64::max),
            }
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.total_capacity
            .total_cmp(&a.total_capacity)
            .then_with(|| a.cluster.cmp(&b.cluster))
    });

    SiteStatistics {
        totals: SiteTotals {
            site_count: sites.len() as u32,
            total_capacity: clusters.iter().map(|c| c.total_capacity).sum(),
            total_area: clusters.iter().map(|c| c.total_area).sum(),
        },
        clusters,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DashboardStats {
    pub total_sites: u32,
    pub operational_sites: u32,
    pub total_capacity: f64,
    /// Site estimates plus every recorded production row.
    pub total_energy_generated: f64,
    pub recorded_energy_kwh: f64,
    pub total_carbon_offset_kg: f64,
    pub sites_by_status: BTreeMap<String, u32>,
    pub total_projects: u32,
}

pub fn dashboard_stats(
    sites: &[RailwaySite],
    production: &[EnergyProduction],
    total_projects: usize,
) -> DashboardStats {
    let mut sites_by_status: BTreeMap<String, u32> =
        SiteStatus::iter().map(|s| (s.to_string(), 0)).collect();
    for site in sites {
        *sites_by_status.entry(site.status.to_string()).or_default() += 1;
    }

    let estimated: f64 = sites.iter().map(|s| s.energy_generated).sum();
    let recorded: f64 = production.iter().map(|p| p.energy_kwh).sum();

    DashboardStats {
        total_sites: sites.len() as u32,
        operational_sites: sites
            .iter()
            .filter(|s| s.status == SiteStatus::Operational)
            .count() as u32,
        total_capacity: sites.iter().map(|s| s.feasible_capacity).sum(),
        total_energy_generated: estimated + recorded,
        recorded_energy_kwh: recorded,
        total_carbon_offset_kg: sites.iter().map(|s| s.carbon_offset_kg).sum::<f64>()
            + carbon_offset_kg(recorded),
        sites_by_status,
        total_projects: total_projects as u32,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    fn site(cluster: &str, capacity: f64, area: f64, status: SiteStatus) -> RailwaySite {
        let now = Utc::now();
        RailwaySite {
            id: Uuid::new_v4(),
            name: format!("{cluster} station"),
            station_code: "STN".into(),
            cluster: cluster.into(),
            zone: None,
            latitude: 22.0,
            longitude: 88.0,
            address: None,
            feasible_capacity: capacity,
            feasible_area: area,
            status,
            energy_generated: 100.0,
            efficiency: 80.0,
            carbon_offset_kg: 82.0,
            monthly_energy_target: capacity * 120.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn clusters_sorted_by_capacity() {
        let sites = vec![
            site("Western", 100.0, 800.0, SiteStatus::Planning),
            site("Eastern", 150.0, 1_000.0, SiteStatus::Planning),
            site("Western", 120.0, 900.0, SiteStatus::Planning),
            site("Southern", 50.0, 300.0, SiteStatus::Planning),
        ];
        let stats = cluster_statistics(&sites);
        let order: Vec<&str> = stats.clusters.iter().map(|c| c.cluster.as_str()).collect();
        assert_eq!(order, ["Western", "Eastern", "Southern"]);

        let western = &stats.clusters[0];
        assert_eq!(western.site_count, 2);
        assert_eq!(western.total_capacity, 220.0);
        assert_eq!(western.total_area, 1_700.0);
        assert_eq!(western.avg_capacity, 110.0);
        assert_eq!(western.max_capacity, 120.0);

        assert_eq!(stats.totals.site_count, 4);
        assert_eq!(stats.totals.total_capacity, 420.0);
    }

    #[test]
    fn no_sites_no_clusters() {
        let stats = cluster_statistics(&[]);
        assert!(stats.clusters.is_empty());
        assert_eq!(stats.totals, SiteTotals::default());
    }

    #[test]
    fn dashboard_adds_recorded_production() {
        let sites = vec![
            site("Eastern", 150.0, 1_000.0, SiteStatus::Operational),
            site("Eastern", 50.0, 300.0, SiteStatus::Design),
        ];
        let production = vec![EnergyProduction {
            id: Uuid::new_v4(),
            site_id: sites[0].id,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            energy_kwh: 500.0,
            peak_power_kw: None,
            irradiance: None,
            created_at: Utc::now(),
        }];

        let stats = dashboard_stats(&sites, &production, 3);
        assert_eq!(stats.total_sites, 2);
        assert_eq!(stats.operational_sites, 1);
        assert_eq!(stats.total_capacity, 200.0);
        assert_eq!(stats.total_energy_generated, 700.0);
        assert!((stats.total_carbon_offset_kg - 574.0).abs() < 1e-6);
        assert_eq!(stats.sites_by_status["design"], 1);
        assert_eq!(stats.sites_by_status["maintenance"], 0);
        assert_eq!(stats.total_projects, 3);
    }
}
