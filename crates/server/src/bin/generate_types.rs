//! Write the TypeScript declarations used by the dashboard front end.
//!
//! Usage: `generate_types [OUT_FILE]` (defaults to `shared/types.ts`).

use std::{fs, path::PathBuf};

use ts_rs::TS;

fn main() -> anyhow::Result<()> {
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));

    let decls = [
        db::models::epc_project::ProjectType::decl(),
        db::models::epc_project::Priority::decl(),
        db::models::epc_project::PhaseStatus::decl(),
        db::models::epc_project::OverallStatus::decl(),
        db::models::epc_project::PhaseName::decl(),
        db::models::epc_project::RiskLevel::decl(),
        db::models::epc_project::RiskStatus::decl(),
        db::models::epc_project::ComplianceStatus::decl(),
        db::models::epc_project::Milestone::decl(),
        db::models::epc_project::PhaseCore::decl(),
        db::models::epc_project::EngineeringPhase::decl(),
        db::models::epc_project::PurchaseOrder::decl(),
        db::models::epc_project::ProcurementPhase::decl(),
        db::models::epc_project::ConstructionPhase::decl(),
        db::models::epc_project::Phases::decl(),
        db::models::epc_project::Budget::decl(),
        db::models::epc_project::Timeline::decl(),
        db::models::epc_project::Resources::decl(),
        db::models::epc_project::ComplianceItem::decl(),
        db::models::epc_project::QualityControl::decl(),
        db::models::epc_project::Risk::decl(),
        db::models::epc_project::EpcProject::decl(),
        db::models::epc_project::EpcProjectWithProgress::decl(),
        db::models::epc_project::CreateEpcProject::decl(),
        db::models::epc_project::UpdateEpcProject::decl(),
        db::models::epc_project::UpdatePhase::decl(),
        db::models::railway_site::SiteStatus::decl(),
        db::models::railway_site::RailwaySite::decl(),
        db::models::railway_site::CreateRailwaySite::decl(),
        db::models::railway_site::UpdateRailwaySite::decl(),
        db::models::energy_production::EnergyProduction::decl(),
        db::models::energy_production::CreateEnergyProduction::decl(),
        services::services::pagination::Pagination::decl(),
        services::services::projects::ProjectListQuery::decl(),
        services::services::projects::ProjectPage::decl(),
        services::services::sites::SiteListQuery::decl(),
        services::services::sites::SitePage::decl(),
        services::services::sites::PaybackQuery::decl(),
        services::services::sites::PaybackEstimate::decl(),
        services::services::dashboard::ProjectFilter::decl(),
        services::services::dashboard::PhaseStats::decl(),
        services::services::dashboard::PhaseBreakdown::decl(),
        services::services::dashboard::EpcDashboardStats::decl(),
        services::services::health_score::Deduction::decl(),
        services::services::health_score::HealthAssessment::decl(),
        services::services::site_stats::ClusterStats::decl(),
        services::services::site_stats::SiteTotals::decl(),
        services::services::site_stats::SiteStatistics::decl(),
        services::services::site_stats::SitesWithStats::decl(),
        services::services::site_stats::DashboardStats::decl(),
        services::services::solar_metrics::PaybackInputs::decl(),
        server::routes::sites::SiteListResponse::decl(),
        server::routes::sites::ProductionCleanup::decl(),
        server::routes::health::HealthStatus::decl(),
        utils::response::ApiResponse::<()>::decl(),
        utils::response::StatsResponse::<()>::decl(),
    ];

    let mut content = String::from("// This file was generated by `generate_types`. Do not edit.\n\n");
    for decl in decls {
        content.push_str("export ");
        content.push_str(&decl);
        content.push_str("\n\n");
    }

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(&out, content)?;
    println!("Wrote {}", out.display());
    Ok(())
}
