use db::models::epc_project::{EpcProject, Priority};

pub const CRITICAL_HEALTH_THRESHOLD: i32 = 70;
pub const CRITICAL_LIMIT: usize = 10;

pub fn is_critical(project: &EpcProject) -> bool {
    project.health_score < CRITICAL_HEALTH_THRESHOLD || project.priority == Priority::Critical
}

/// Unhealthy or critical-priority projects, worst first. Equal scores keep
/// their collection order.
pub fn select_critical<'a, I>(projects: I) -> Vec<&'a EpcProject>
where
    I: IntoIterator<Item = &'a EpcProject>,
{
    let mut critical: Vec<&EpcProject> = projects.into_iter().filter(|p| is_critical(p)).collect();
    critical.sort_by_key(|p| p.health_score);
    critical.truncate(CRITICAL_LIMIT);
    critical
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::epc_project::CreateEpcProject;
    use uuid::Uuid;

    use super::*;

    fn with_score(name: &str, score: i32, priority: Priority) -> EpcProject {
        let mut project = EpcProject::from_create(
            CreateEpcProject {
                project_name: name.into(),
                description: None,
                site_id: Uuid::new_v4(),
                project_type: None,
                priority: Some(priority),
                phases: None,
                resources: None,
                quality_control: None,
                risks: None,
                overall_status: None,
            },
            Uuid::new_v4(),
            Utc::now(),
        );
        project.health_score = score;
        project
    }

    fn scores(selected: &[&EpcProject]) -> Vec<i32> {
        selected.iter().map(|p| p.health_score).collect()
    }

    #[test]
    fn picks_low_scores_in_ascending_order() {
        let projects = vec![
            with_score("a", 50, Priority::Medium),
            with_score("b", 80, Priority::Medium),
            with_score("c", 65, Priority::Medium),
        ];
        assert_eq!(scores(&select_critical(&projects)), [50, 65]);
    }

    #[test]
    fn critical_priority_is_included_regardless_of_score() {
        let projects = vec![
            with_score("healthy", 95, Priority::Critical),
            with_score("sick", 40, Priority::Low),
        ];
        assert_eq!(scores(&select_critical(&projects)), [40, 95]);
    }

    #[test]
    fn ties_keep_collection_order_and_cap_at_ten() {
        let projects: Vec<EpcProject> = (0..12)
            .map(|i| with_score(&format!("p{i}"), 60, Priority::High))
            .collect();
        let selected = select_critical(&projects);
        assert_eq!(selected.len(), CRITICAL_LIMIT);
        let names: Vec<&str> = selected.iter().map(|p| p.project_name.as_str()).collect();
        assert_eq!(names[0], "p0");
        assert_eq!(names[9], "p9");
    }
}
