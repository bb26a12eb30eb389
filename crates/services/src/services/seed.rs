//! Sample data for local development and demos.

use chrono::{DateTime, NaiveDate, Utc};
use db::{
    models::{
        epc_project::{
            Budget, CreateEpcProject, EpcProject, Milestone, OverallStatus, PhaseStatus, Phases,
            Priority, ProjectType, Resources, Risk, RiskLevel, RiskStatus, Timeline,
        },
        railway_site::{RailwaySite, SiteStatus},
    },
    store::{Entity, EntityStore, StoreError, Stores},
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    health_score::calculate_health_score,
    solar_metrics::{SiteEstimates, monthly_energy_target},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub sites_created: usize,
    pub sites_skipped: usize,
    pub projects_created: usize,
    pub projects_skipped: usize,
}

struct SampleSite {
    n: u128,
    name: &'static str,
    code: &'static str,
    cluster: &'static str,
    zone: &'static str,
    lat: f64,
    lon: f64,
    capacity: f64,
    area: f64,
    status: SiteStatus,
    efficiency: f64,
}

const SAMPLE_SITES: &[SampleSite] = &[
    SampleSite {
        n: 1,
        name: "New Delhi",
        code: "NDLS",
        cluster: "Northern",
        zone: "NR",
        lat: 28.6430,
        lon: 77.2194,
        capacity: 250.0,
        area: 2_100.0,
        status: SiteStatus::Operational,
        efficiency: 88.5,
    },
    SampleSite {
        n: 2,
        name: "Howrah Junction",
        code: "HWH",
        cluster: "Eastern",
        zone: "ER",
        lat: 22.5838,
        lon: 88.3426,
        capacity: 180.0,
        area: 1_500.0,
        status: SiteStatus::Construction,
        efficiency: 82.0,
    },
    SampleSite {
        n: 3,
        name: "Chennai Central",
        code: "MAS",
        cluster: "Southern",
        zone: "SR",
        lat: 13.0827,
        lon: 80.2757,
        capacity: 150.0,
        area: 1_250.0,
        status: SiteStatus::Design,
        efficiency: 79.0,
    },
    SampleSite {
        n: 4,
        name: "Mumbai Central",
        code: "MMCT",
        cluster: "Western",
        zone: "WR",
        lat: 18.9690,
        lon: 72.8205,
        capacity: 120.0,
        area: 980.0,
        status: SiteStatus::Survey,
        efficiency: 85.0,
    },
    SampleSite {
        n: 5,
        name: "Ghaziabad",
        code: "GZB",
        cluster: "Northern",
        zone: "NR",
        lat: 28.6500,
        lon: 77.4400,
        capacity: 90.0,
        area: 760.0,
        status: SiteStatus::Planning,
        efficiency: 80.0,
    },
];

fn seed_id(namespace: u128, n: u128) -> Uuid {
    Uuid::from_u128((namespace << 64) | n)
}

const SITE_NAMESPACE: u128 = 0x5eed_0000_0000_0001;
const PROJECT_NAMESPACE: u128 = 0x5eed_0000_0000_0002;

fn seed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default() // 2025-01-01
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn sample_sites() -> Vec<RailwaySite> {
    let now = seed_time();
    SAMPLE_SITES
        .iter()
        .map(|s| {
            let estimates = SiteEstimates::with_efficiency(s.capacity, s.efficiency);
            RailwaySite {
                id: seed_id(SITE_NAMESPACE, s.n),
                name: s.name.to_string(),
                station_code: s.code.to_string(),
                cluster: s.cluster.to_string(),
                zone: Some(s.zone.to_string()),
                latitude: s.lat,
                longitude: s.lon,
                address: None,
                feasible_capacity: s.capacity,
                feasible_area: s.area,
                status: s.status,
                energy_generated: estimates.energy_generated,
                efficiency: estimates.efficiency,
                carbon_offset_kg: estimates.carbon_offset_kg,
                monthly_energy_target: monthly_energy_target(s.capacity),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn sample_project(
    n: u128,
    name: &str,
    site: u128,
    priority: Priority,
    status: OverallStatus,
    progress: [(PhaseStatus, i32); 3],
    budget: (f64, f64),
    timeline: (Option<NaiveDate>, Option<NaiveDate>),
    risks: Vec<Risk>,
) -> EpcProject {
    let mut phases = Phases::default();
    let [engineering, procurement, construction] = progress;
    (phases.engineering.core.status, phases.engineering.core.progress) = engineering;
    (phases.procurement.core.status, phases.procurement.core.progress) = procurement;
    (phases.construction.core.status, phases.construction.core.progress) = construction;

    let mut project = EpcProject::from_create(
        CreateEpcProject {
            project_name: name.to_string(),
            description: None,
            site_id: seed_id(SITE_NAMESPACE, site),
            project_type: Some(ProjectType::SolarInstallation),
            priority: Some(priority),
            phases: Some(phases),
            resources: Some(Resources {
                budget: Budget {
                    total: budget.0,
                    allocated: budget.0,
                    spent: budget.1,
                    ..Budget::default()
                },
                timeline: Timeline {
                    planned_start: timeline.0,
                    planned_end: timeline.1,
                    actual_start: timeline.0,
                    actual_end: None,
                },
            }),
            quality_control: None,
            risks: Some(risks),
            overall_status: Some(status),
        },
        seed_id(PROJECT_NAMESPACE, n),
        seed_time(),
    );
    project.project_id = format!("EPC-{}-SEED{n}", seed_time().timestamp_millis());
    project
}

pub fn sample_projects(today: NaiveDate) -> Vec<EpcProject> {
    use PhaseStatus::*;

    let mut projects = vec![
        sample_project(
            1,
            "New Delhi platform canopy PV",
            1,
            Priority::High,
            OverallStatus::Completed,
            [(Completed, 100), (Completed, 100), (Completed, 100)],
            (42_000_000.0, 40_500_000.0),
            (date(2024, 1, 15), date(2024, 12, 31)),
            vec![],
        ),
        sample_project(
            2,
            "Howrah shed rooftop array",
            2,
            Priority::Critical,
            OverallStatus::Active,
            [(Completed, 100), (Completed, 100), (InProgress, 45)],
            (30_000_000.0, 21_000_000.0),
            (date(2024, 9, 1), date(2026, 3, 31)),
            vec![Risk {
                id: "R-HWH-1".to_string(),
                description: "Track possession windows limit crane access".to_string(),
                probability: RiskLevel::High,
                impact: RiskLevel::High,
                mitigation: Some("Night block scheduling with division".to_string()),
                status: RiskStatus::Open,
                owner: Some("Site engineer".to_string()),
            }],
        ),
        sample_project(
            3,
            "Chennai Central carport",
            3,
            Priority::Medium,
            OverallStatus::Active,
            [(InProgress, 70), (NotStarted, 0), (NotStarted, 0)],
            (25_000_000.0, 2_000_000.0),
            (date(2025, 2, 1), date(2026, 6, 30)),
            vec![],
        ),
        sample_project(
            4,
            "Mumbai Central station roof",
            4,
            Priority::Low,
            OverallStatus::Planning,
            [(NotStarted, 0), (NotStarted, 0), (NotStarted, 0)],
            (18_000_000.0, 0.0),
            (date(2026, 1, 1), date(2026, 12, 31)),
            vec![],
        ),
    ];

    projects[2].phases.engineering.core.milestones.push(Milestone {
        name: "Structural audit sign-off".to_string(),
        due_date: date(2025, 3, 15),
        completed: false,
    });

    for project in &mut projects {
        project.health_score = calculate_health_score(project, today);
    }
    projects
}

/// Insert every sample entity that is not already present.
async fn seed_collection<E: Entity>(
    store: &dyn EntityStore<E>,
    entities: Vec<E>,
) -> Result<(usize, usize), StoreError> {
    let (mut created, mut skipped) = (0, 0);
    for entity in entities {
        if store.get(entity.id()).await?.is_some() {
            skipped += 1;
            continue;
        }
        match store.create(&entity).await {
            Ok(_) => created += 1,
            Err(StoreError::AlreadyExists { .. }) => skipped += 1,
            Err(e) => return Err(e),
        }
        debug!(kind = E::KIND, id = %entity.id(), "seeded");
    }
    Ok((created, skipped))
}

/// Load the sample sites and projects. Running it again changes nothing.
pub async fn seed(stores: &Stores) -> Result<SeedReport, StoreError> {
    let (sites_created, sites_skipped) =
        seed_collection(stores.sites.as_ref(), sample_sites()).await?;
    let (projects_created, projects_skipped) = seed_collection(
        stores.projects.as_ref(),
        sample_projects(Utc::now().date_naive()),
    )
    .await?;

    let report = SeedReport {
        sites_created,
        sites_skipped,
        projects_created,
        projects_skipped,
    };
    info!(backend = stores.backend.as_str(), ?report, "Seed finished");
    Ok(report)
}
