use chrono::{NaiveDate, Utc};
use db::{
    models::epc_project::{
        CreateEpcProject, EpcProject, EpcProjectWithProgress, OverallStatus, PhaseName,
        PhaseStatus, Priority, UpdateEpcProject, UpdatePhase,
    },
    store::{StoreError, Stores},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    critical::select_critical,
    dashboard::{EpcDashboardStats, ProjectFilter, aggregate},
    health_score::{HealthAssessment, assess, calculate_health_score},
    pagination::{Pagination, paginate},
    validation::{
        ValidationError, illegal_transition, require_non_empty, require_non_negative,
        require_percentage,
    },
};

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("project {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ProjectListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OverallStatus>,
    pub priority: Option<Priority>,
}

impl ProjectListQuery {
    pub fn filter(&self) -> ProjectFilter {
        ProjectFilter {
            status: self.status,
            priority: self.priority,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ProjectPage {
    pub projects: Vec<EpcProjectWithProgress>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct EpcProjectService {
    stores: Stores,
}

impl EpcProjectService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[instrument(skip_all, fields(project_name = %data.project_name))]
    pub async fn create(
        &self,
        data: CreateEpcProject,
    ) -> Result<EpcProjectWithProgress, ProjectServiceError> {
        let mut project = EpcProject::from_create(data, Uuid::new_v4(), Utc::now());
        validate_project(&project)?;
        project.health_score = calculate_health_score(&project, Self::today());

        let created = self.stores.projects.create(&project).await?;
        info!(
            project_id = %created.project_id,
            site_id = %created.site_id,
            health_score = created.health_score,
            "Created EPC project"
        );
        Ok(created.with_progress())
    }

    async fn load(&self, id: Uuid) -> Result<EpcProject, ProjectServiceError> {
        self.stores
            .projects
            .get(id)
            .await?
            .ok_or(ProjectServiceError::NotFound(id))
    }

    pub async fn get(&self, id: Uuid) -> Result<EpcProjectWithProgress, ProjectServiceError> {
        Ok(self.load(id).await?.with_progress())
    }

    /// Today's score with the deductions behind it. Nothing is stored.
    pub async fn health(&self, id: Uuid) -> Result<HealthAssessment, ProjectServiceError> {
        let project = self.load(id).await?;
        Ok(assess(&project, Self::today()))
    }

    /// Newest first, filtered, one page.
    pub async fn list(&self, query: &ProjectListQuery) -> Result<ProjectPage, ProjectServiceError> {
        let filter = query.filter();
        let mut projects: Vec<EpcProject> = self
            .stores
            .projects
            .list()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        projects.reverse();

        let (page, pagination) = paginate(projects, query.page, query.limit);
        Ok(ProjectPage {
            projects: page.into_iter().map(EpcProject::with_progress).collect(),
            pagination,
        })
    }

    #[instrument(skip(self, data))]
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateEpcProject,
    ) -> Result<EpcProjectWithProgress, ProjectServiceError> {
        let mut project = self.load(id).await?;
        apply_update(&mut project, data)?;
        validate_project(&project)?;
        self.save_with_health(project).await
    }

    #[instrument(skip(self, data))]
    pub async fn update_phase(
        &self,
        id: Uuid,
        phase: PhaseName,
        data: UpdatePhase,
    ) -> Result<EpcProjectWithProgress, ProjectServiceError> {
        let mut project = self.load(id).await?;
        let previous_score = project.health_score;
        apply_phase_update(&mut project, phase, data)?;

        let saved = self.save_with_health(project).await?;
        info!(
            project_id = %saved.project_id,
            %phase,
            progress = saved.phases.core(phase).progress,
            previous_score,
            health_score = saved.health_score,
            "Phase updated"
        );
        Ok(saved)
    }

    async fn save_with_health(
        &self,
        mut project: EpcProject,
    ) -> Result<EpcProjectWithProgress, ProjectServiceError> {
        project.health_score = calculate_health_score(&project, Self::today());
        project.updated_at = Utc::now();
        Ok(self.stores.projects.update(&project).await?.with_progress())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ProjectServiceError> {
        if !self.stores.projects.delete(id).await? {
            return Err(ProjectServiceError::NotFound(id));
        }
        info!(%id, "Deleted EPC project");
        Ok(())
    }

    pub async fn dashboard_stats(
        &self,
        filter: &ProjectFilter,
    ) -> Result<EpcDashboardStats, ProjectServiceError> {
        let projects = self.stores.projects.list().await?;
        Ok(aggregate(&projects, filter))
    }

    pub async fn critical_projects(
        &self,
    ) -> Result<Vec<EpcProjectWithProgress>, ProjectServiceError> {
        let projects = self.stores.projects.list().await?;
        Ok(select_critical(&projects)
            .into_iter()
            .map(|p| p.clone().with_progress())
            .collect())
    }

    /// Re-score every project against today's date and persist the ones whose
    /// score moved. Returns how many changed.
    pub async fn recalculate_health_scores(&self) -> Result<usize, ProjectServiceError> {
        let today = Self::today();
        let mut changed = 0;
        for mut project in self.stores.projects.list().await? {
            let score = calculate_health_score(&project, today);
            if score != project.health_score {
                info!(
                    project_id = %project.project_id,
                    from = project.health_score,
                    to = score,
                    "Health score changed"
                );
                project.health_score = score;
                project.updated_at = Utc::now();
                self.stores.projects.update(&project).await?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn validate_project(project: &EpcProject) -> Result<(), ValidationError> {
    require_non_empty("project_name", &project.project_name)?;
    for (name, core) in project.phases.iter() {
        require_percentage(&format!("phases.{name}.progress"), core.progress)?;
    }
    let budget = &project.resources.budget;
    require_non_negative("resources.budget.total", budget.total)?;
    require_non_negative("resources.budget.allocated", budget.allocated)?;
    require_non_negative("resources.budget.spent", budget.spent)?;
    Ok(())
}

/// Merge the present fields of `data` into `project`, enforcing the status
/// lifecycle.
pub fn apply_update(project: &mut EpcProject, data: UpdateEpcProject) -> Result<(), ValidationError> {
    if let Some(next) = data.overall_status {
        if !project.overall_status.can_transition_to(next) {
            return Err(illegal_transition(
                "overall_status",
                project.overall_status,
                next,
            ));
        }
        project.overall_status = next;
    }
    if let Some(name) = data.project_name {
        project.project_name = name;
    }
    if let Some(description) = data.description {
        project.description = Some(description);
    }
    if let Some(site_id) = data.site_id {
        project.site_id = site_id;
    }
    if let Some(project_type) = data.project_type {
        project.project_type = project_type;
    }
    if let Some(priority) = data.priority {
        project.priority = priority;
    }
    if let Some(phases) = data.phases {
        project.phases = phases;
    }
    if let Some(resources) = data.resources {
        project.resources = resources;
    }
    if let Some(quality_control) = data.quality_control {
        project.quality_control = quality_control;
    }
    if let Some(risks) = data.risks {
        project.risks = risks;
    }
    Ok(())
}

/// Completing a phase without an explicit progress value sets it to 100.
pub fn apply_phase_update(
    project: &mut EpcProject,
    phase: PhaseName,
    data: UpdatePhase,
) -> Result<(), ValidationError> {
    if let Some(progress) = data.progress {
        require_percentage("progress", progress)?;
    }

    let core = project.phases.core_mut(phase);
    if let Some(status) = data.status {
        core.status = status;
        if status == PhaseStatus::Completed && data.progress.is_none() {
            core.progress = 100;
        }
    }
    if let Some(progress) = data.progress {
        core.progress = progress;
    }
    if let Some(milestones) = data.milestones {
        core.milestones = milestones;
    }

    if let Some(assignee) = data.assignee {
        let phases = &mut project.phases;
        match phase {
            PhaseName::Engineering => phases.engineering.assigned_team = Some(assignee),
            PhaseName::Procurement => phases.procurement.vendor = Some(assignee),
            PhaseName::Construction => phases.construction.contractor = Some(assignee),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use db::{
        DBService,
        models::epc_project::{Milestone, Phases},
        sqlite_store::SqliteStore,
    };

    use super::*;

    async fn service() -> EpcProjectService {
        let db = DBService::new_in_memory().await.unwrap();
        EpcProjectService::new(SqliteStore::stores(&db))
    }

    fn create_input(name: &str) -> CreateEpcProject {
        CreateEpcProject {
            project_name: name.into(),
            description: Some("Rooftop PV on platform shelters".into()),
            site_id: Uuid::new_v4(),
            project_type: None,
            priority: Some(Priority::High),
            phases: None,
            resources: None,
            quality_control: None,
            risks: None,
            overall_status: None,
        }
    }

    #[tokio::test]
    async fn create_scores_and_persists() {
        let service = service().await;
        let created = service.create(create_input("Bhopal")).await.unwrap();
        assert_eq!(created.health_score, 100);
        assert_eq!(created.overall_progress, 0);
        assert!(created.project_id.starts_with("EPC-"));

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched.project_name, "Bhopal");
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let service = service().await;
        let err = service.create(create_input("  ")).await.unwrap_err();
        assert!(matches!(err, ProjectServiceError::Validation(ref v) if v.field == "project_name"));
    }

    #[tokio::test]
    async fn phase_completion_recomputes_health() {
        let service = service().await;
        let mut input = create_input("Itarsi");
        let mut phases = Phases::default();
        phases.construction.core.status = PhaseStatus::InProgress;
        phases.construction.core.milestones.push(Milestone {
            name: "Inverter commissioning".into(),
            due_date: Some(Utc::now().date_naive() - Duration::days(3)),
            completed: false,
        });
        input.phases = Some(phases);
        let created = service.create(input).await.unwrap();
        assert_eq!(created.health_score, 90);

        let updated = service
            .update_phase(
                created.id,
                PhaseName::Construction,
                UpdatePhase {
                    status: Some(PhaseStatus::Completed),
                    progress: None,
                    assignee: Some("Rail Infra Contractors".into()),
                    milestones: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phases.construction.core.progress, 100);
        assert_eq!(updated.phases.construction.contractor.as_deref(), Some("Rail Infra Contractors"));
        assert_eq!(updated.overall_progress, 40);
        assert_eq!(updated.health_score, 100);

        let stored = service.get(created.id).await.unwrap();
        assert_eq!(stored.health_score, 100);
    }

    #[tokio::test]
    async fn health_lists_each_deduction() {
        let service = service().await;
        let mut input = create_input("Bina");
        let mut phases = Phases::default();
        phases.engineering.core.status = PhaseStatus::InProgress;
        phases.engineering.core.milestones.push(Milestone {
            name: "Structural drawings".into(),
            due_date: Some(Utc::now().date_naive() - Duration::days(1)),
            completed: false,
        });
        input.phases = Some(phases);
        let created = service.create(input).await.unwrap();

        let health = service.health(created.id).await.unwrap();
        assert_eq!(health.score, created.health_score);
        assert_eq!(health.score, 90);
        assert_eq!(health.deductions.len(), 1);
        assert_eq!(health.deductions[0].points, 10);
        assert!(health.deductions[0].reason.contains("engineering"));

        let missing = service.health(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ProjectServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn phase_progress_out_of_range_is_rejected() {
        let service = service().await;
        let created = service.create(create_input("Nagpur")).await.unwrap();
        let err = service
            .update_phase(
                created.id,
                PhaseName::Engineering,
                UpdatePhase {
                    progress: Some(120),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_enforces_status_lifecycle() {
        let service = service().await;
        let created = service.create(create_input("Jhansi")).await.unwrap();

        let err = service
            .update(
                created.id,
                UpdateEpcProject {
                    overall_status: Some(OverallStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectServiceError::Validation(_)));

        let updated = service
            .update(
                created.id,
                UpdateEpcProject {
                    overall_status: Some(OverallStatus::Active),
                    priority: Some(Priority::Critical),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.overall_status, OverallStatus::Active);
        assert_eq!(updated.priority, Priority::Critical);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let service = service().await;
        for name in ["first", "second", "third"] {
            service.create(create_input(name)).await.unwrap();
        }
        let mut low = create_input("low");
        low.priority = Some(Priority::Low);
        service.create(low).await.unwrap();

        let page = service
            .list(&ProjectListQuery {
                page: Some(1),
                limit: Some(2),
                status: None,
                priority: Some(Priority::High),
            })
            .await
            .unwrap();
        let names: Vec<&str> = page.projects.iter().map(|p| p.project_name.as_str()).collect();
        assert_eq!(names, ["third", "second"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.pages, 2);
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let service = service().await;
        let id = Uuid::new_v4();
        assert!(matches!(service.get(id).await, Err(ProjectServiceError::NotFound(x)) if x == id));
        assert!(matches!(service.delete(id).await, Err(ProjectServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn dashboard_and_critical_reflect_store() {
        let service = service().await;
        let empty = service.dashboard_stats(&ProjectFilter::default()).await.unwrap();
        assert_eq!(empty.avg_health_score, 100);

        let mut input = create_input("Critical priority");
        input.priority = Some(Priority::Critical);
        service.create(input).await.unwrap();
        service.create(create_input("Fine")).await.unwrap();

        let critical = service.critical_projects().await.unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].project_name, "Critical priority");

        let stats = service.dashboard_stats(&ProjectFilter::default()).await.unwrap();
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.critical_projects.len(), 1);
    }

    #[tokio::test]
    async fn recalculation_persists_only_changed_scores() {
        let service = service().await;
        let stale = service.create(create_input("Stale")).await.unwrap();
        service.create(create_input("Current")).await.unwrap();

        let mut project = stale.project.clone();
        project.health_score = 40;
        service.stores.projects.update(&project).await.unwrap();

        assert_eq!(service.recalculate_health_scores().await.unwrap(), 1);
        assert_eq!(service.get(stale.id).await.unwrap().health_score, 100);
        assert_eq!(service.recalculate_health_scores().await.unwrap(), 0);
    }

    #[test]
    fn assignee_goes_to_the_phase_owner() {
        let mut project = EpcProject::from_create(create_input("Owners"), Uuid::new_v4(), Utc::now());
        apply_phase_update(
            &mut project,
            PhaseName::Procurement,
            UpdatePhase {
                assignee: Some("Sunrise Modules".into()),
                progress: Some(30),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(project.phases.procurement.vendor.as_deref(), Some("Sunrise Modules"));
        assert_eq!(project.phases.procurement.core.progress, 30);
        assert_eq!(project.phases.engineering.assigned_team, None);
    }
}
