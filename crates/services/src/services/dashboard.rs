//! Roll-up of the project collection for the EPC dashboard.

use std::collections::BTreeMap;

use db::models::epc_project::{
    EpcProject, EpcProjectWithProgress, OverallStatus, PhaseName, PhaseStatus, Priority,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use ts_rs::TS;

use super::critical::select_critical;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ProjectFilter {
    pub status: Option<OverallStatus>,
    pub priority: Option<Priority>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &EpcProject) -> bool {
        self.status.is_none_or(|s| project.overall_status == s)
            && self.priority.is_none_or(|p| project.priority == p)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct PhaseStats {
    pub in_progress: u32,
    pub avg_progress: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct PhaseBreakdown {
    pub engineering: PhaseStats,
    pub procurement: PhaseStats,
    pub construction: PhaseStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EpcDashboardStats {
    pub total_projects: u32,
    pub active_projects: u32,
    pub completed_projects: u32,
    pub total_budget: f64,
    pub total_spent: f64,
    pub avg_health_score: i32,
    pub phase_stats: PhaseBreakdown,
    pub by_status: BTreeMap<String, u32>,
    pub by_priority: BTreeMap<String, u32>,
    pub critical_projects: Vec<EpcProjectWithProgress>,
}

pub fn aggregate(projects: &[EpcProject], filter: &ProjectFilter) -> EpcDashboardStats {
    let selected: Vec<&EpcProject> = projects.iter().filter(|p| filter.matches(p)).collect();
    let total = selected.len() as u32;

    let count_status = |status: OverallStatus| {
        selected.iter().filter(|p| p.overall_status == status).count() as u32
    };

    let mut by_status: BTreeMap<String, u32> = OverallStatus::iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut by_priority: BTreeMap<String, u32> =
        Priority::iter().map(|p| (p.to_string(), 0)).collect();
    for project in &selected {
        *by_status.entry(project.overall_status.to_string()).or_default() += 1;
        *by_priority.entry(project.priority.to_string()).or_default() += 1;
    }

    let avg_health_score = if selected.is_empty() {
        100
    } else {
        let sum: i64 = selected.iter().map(|p| i64::from(p.health_score)).sum();
        (sum as f64 / selected.len() as f64).round() as i32
    };

    EpcDashboardStats {
        total_projects: total,
        active_projects: count_status(OverallStatus::Active),
        completed_projects: count_status(OverallStatus::Completed),
        total_budget: selected.iter().map(|p| p.resources.budget.total).sum(),
        total_spent: selected.iter().map(|p| p.resources.budget.spent).sum(),
        avg_health_score,
        phase_stats: PhaseBreakdown {
            engineering: phase_stats(&selected, PhaseName::Engineering),
            procurement: phase_stats(&selected, PhaseName::Procurement),
            construction: phase_stats(&selected, PhaseName::Construction),
        },
        by_status,
        by_priority,
        critical_projects: select_critical(selected.iter().copied())
            .into_iter()
            .map(|p| p.clone().with_progress())
            .collect(),
    }
}

fn phase_stats(projects: &[&EpcProject], phase: PhaseName) -> PhaseStats {
    if projects.is_empty() {
        return PhaseStats::default();
    }
    let cores = projects.iter().map(|p| p.phases.core(phase));
    let in_progress = cores
        .clone()
        .filter(|c| c.status == PhaseStatus::InProgress)
        .count() as u32;
    let sum: i64 = cores.map(|c| i64::from(c.progress)).sum();
    PhaseStats {
        in_progress,
        avg_progress: (sum as f64 / projects.len() as f64).round() as i32,
    }
}
