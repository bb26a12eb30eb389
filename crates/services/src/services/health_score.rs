//! Deduction based 0–100 health metric for EPC projects.

use chrono::NaiveDate;
use db::models::epc_project::{EpcProject, OverallStatus, PhaseStatus, RiskLevel, RiskStatus};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const OVERDUE_PHASE_PENALTY: i32 = 10;
pub const HIGH_RISK_PENALTY: i32 = 5;
pub const CRITICAL_RISK_PENALTY: i32 = 10;
pub const PAST_DEADLINE_PENALTY: i32 = 20;
pub const MAX_SLIPPAGE_PENALTY: i32 = 20;
/// Progress may trail elapsed time by this many points before it costs anything.
pub const SLIPPAGE_TOLERANCE: i32 = 10;
pub const BUDGET_OVERRUN_PENALTY: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Deduction {
    pub reason: String,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct HealthAssessment {
    pub score: i32,
    pub deductions: Vec<Deduction>,
}

pub fn calculate_health_score(project: &EpcProject, today: NaiveDate) -> i32 {
    assess(project, today).score
}

pub fn assess(project: &EpcProject, today: NaiveDate) -> HealthAssessment {
    let mut deductions = Vec::new();

    for (name, core) in project.phases.iter() {
        if core.status != PhaseStatus::Completed && core.overdue_milestones(today) > 0 {
            deductions.push(Deduction {
                reason: format!("{name} phase has overdue milestones"),
                points: OVERDUE_PHASE_PENALTY,
            });
        }
    }

    for risk in project.risks.iter().filter(|r| r.status == RiskStatus::Open) {
        let points = match risk.severity() {
            RiskLevel::Critical => CRITICAL_RISK_PENALTY,
            RiskLevel::High => HIGH_RISK_PENALTY,
            _ => continue,
        };
        deductions.push(Deduction {
            reason: format!("open {} risk {}", risk.severity(), risk.id),
            points,
        });
    }

    if let Some(deduction) = schedule_deduction(project, today) {
        deductions.push(deduction);
    }

    let budget = &project.resources.budget;
    if budget.total > 0.0 && budget.spent > budget.total {
        deductions.push(Deduction {
            reason: "budget overrun".to_string(),
            points: BUDGET_OVERRUN_PENALTY,
        });
    }

    let total: i32 = deductions.iter().map(|d| d.points).sum();
    HealthAssessment {
        score: (100 - total).clamp(0, 100),
        deductions,
    }
}

fn schedule_deduction(project: &EpcProject, today: NaiveDate) -> Option<Deduction> {
    if project.overall_status == OverallStatus::Completed {
        return None;
    }
    let timeline = &project.resources.timeline;
    let end = timeline.planned_end?;

    if end < today {
        return Some(Deduction {
            reason: format!("planned end {end} has passed"),
            points: PAST_DEADLINE_PENALTY,
        });
    }

    let start = timeline.planned_start?;
    if start > today || end <= start {
        return None;
    }

    let window = (end - start).num_days() as f64;
    let elapsed = (today - start).num_days() as f64;
    let expected = (elapsed / window * 100.0).round() as i32;
    let gap = expected - project.overall_progress();
    if gap <= SLIPPAGE_TOLERANCE {
        return None;
    }

    Some(Deduction {
        reason: format!("progress trails schedule by {gap} points"),
        points: (gap / 2).min(MAX_SLIPPAGE_PENALTY),
    })
}
