//! Per-animal task lifecycle

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, STAFF_ROLES};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::{AnimalTask, TaskStatus};
use crate::db::{ShelterStore, TaskFilter};
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, CreateTaskForm, TaskAssigneeForm, TaskStatusForm};
use crate::metrics::record_task_mutation;
use crate::workflow::TaskTransition;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl TaskService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    /// Load a task that belongs to `animal_id`
    async fn load(&self, animal_id: Uuid, task_id: Uuid) -> Result<AnimalTask> {
        match self.store.find_task(task_id).await? {
            Some(task) if task.animal_id == animal_id => Ok(task),
            _ => Err(AppError::not_found("task", task_id)),
        }
    }

    /// Assignees must be staff
    async fn check_assignee(&self, assignee_id: Option<Uuid>) -> Result<()> {
        let Some(id) = assignee_id else {
            return Ok(());
        };
        match self.store.find_person(id).await? {
            Some(person) if person.role.is_staff() => Ok(()),
            Some(_) => Err(AppError::field("assignee_id", "Tasks can only be assigned to staff")),
            None => Err(AppError::field("assignee_id", "Unknown assignee")),
        }
    }

    async fn changed(&self, animal_id: Uuid) {
        self.revalidator
            .revalidate(&[
                ViewTag::AnimalTasks(animal_id),
                ViewTag::TaskDashboard,
                ViewTag::Dashboard,
            ])
            .await;
    }

    async fn save(&self, mut task: AnimalTask, action: &'static str) -> Result<AnimalTask> {
        task.updated_at = now();
        let task = self.store.update_task(task).await?;
        record_task_mutation(action, &task.status.to_string());
        self.changed(task.animal_id).await;
        Ok(task)
    }

    #[instrument(skip(self, session, form), fields(animal_id = %animal_id))]
    pub async fn create_task(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        form: CreateTaskForm,
    ) -> Result<AnimalTask> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        require_animal(self.store.as_ref(), animal_id).await?;
        self.check_assignee(form.assignee_id).await?;

        let ts = now();
        let task = self
            .store
            .insert_task(AnimalTask {
                id: Uuid::new_v4(),
                animal_id,
                title: form.title.trim().to_string(),
                details: form.details,
                category: form.category,
                priority: form.priority,
                status: form.status,
                previous_status: None,
                assignee_id: form.assignee_id,
                due_date: form.due_date,
                created_by: session.person_id,
                created_at: ts,
                updated_at: ts,
            })
            .await?;

        record_task_mutation("create", &task.status.to_string());
        info!(task_id = %task.id, "Task created");
        self.changed(animal_id).await;

        Ok(task)
    }

    #[instrument(skip(self, session, form), fields(task_id = %task_id, to = %form.status))]
    pub async fn update_task_status(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        task_id: Uuid,
        form: TaskStatusForm,
    ) -> Result<AnimalTask> {
        require_roles(session, STAFF_ROLES)?;

        let mut task = self.load(animal_id, task_id).await?;
        TaskTransition::to(&task, form.status).apply(&mut task);

        self.save(task, "status").await
    }

    pub async fn update_task_assignee(
        &self,
        session: Option<&SessionContext>,
        task_id: Uuid,
        form: TaskAssigneeForm,
    ) -> Result<AnimalTask> {
        require_roles(session, STAFF_ROLES)?;

        let mut task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("task", task_id))?;
        self.check_assignee(form.assignee_id).await?;

        task.assignee_id = form.assignee_id;
        debug!(task_id = %task_id, assignee_id = ?form.assignee_id, "Task reassigned");

        self.save(task, "assign").await
    }

    /// Soft delete. The live status is kept for `restore_task`.
    pub async fn delete_task(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        task_id: Uuid,
    ) -> Result<AnimalTask> {
        require_roles(session, STAFF_ROLES)?;

        let mut task = self.load(animal_id, task_id).await?;
        TaskTransition::to(&task, TaskStatus::Deleted).apply(&mut task);

        self.save(task, "delete").await
    }

    /// Undo a soft delete, back to the exact prior status
    pub async fn restore_task(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        task_id: Uuid,
    ) -> Result<AnimalTask> {
        require_roles(session, STAFF_ROLES)?;

        let mut task = self.load(animal_id, task_id).await?;
        TaskTransition::restore(&task)?.apply(&mut task);

        self.save(task, "restore").await
    }

    pub async fn list_for_animal(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<AnimalTask>> {
        require_roles(session, STAFF_ROLES)?;
        require_animal(self.store.as_ref(), animal_id).await?;

        self.store
            .list_tasks(&TaskFilter {
                animal_id: Some(animal_id),
                include_deleted,
                ..Default::default()
            })
            .await
    }

    /// Cross-animal task board
    pub async fn dashboard(&self, session: Option<&SessionContext>, filter: TaskFilter) -> Result<Vec<AnimalTask>> {
        require_roles(session, STAFF_ROLES)?;
        self.store.list_tasks(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AnimalListingStatus, Role};
    use crate::forms::fixtures::task_form;
    use crate::services::testing::Harness;
    use tokio_test::{assert_err, assert_ok};

    async fn created(h: &Harness, staff: &SessionContext, status: TaskStatus) -> AnimalTask {
        let animal = h.animal(AnimalListingStatus::Draft).await;
        let mut form = task_form("Trim nails");
        form.status = status;
        h.services.tasks.create_task(Some(staff), animal.id, form).await.unwrap()
    }

    #[tokio::test]
    async fn test_user_cannot_create_tasks() {
        let h = Harness::new();
        let user = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Published).await;

        let err = h
            .services
            .tasks
            .create_task(Some(&user), animal.id, task_form("Walk"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let missing = h.services.tasks.create_task(None, animal.id, task_form("Walk")).await;
        assert!(matches!(missing, Err(AppError::Unauthorized { .. })));

        let tasks = h.store.list_tasks(&TaskFilter { include_deleted: true, ..Default::default() }).await.unwrap();
        assert!(tasks.is_empty());
        assert!(h.revalidator.take().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_animal_and_staff_assignee() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let user = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;

        let err = h
            .services
            .tasks
            .create_task(Some(&staff), Uuid::new_v4(), task_form("Feed"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let mut form = task_form("Feed");
        form.assignee_id = Some(user.person_id);
        let err = h.services.tasks.create_task(Some(&staff), animal.id, form).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("assignee_id"));

        let mut form = task_form("Feed");
        form.assignee_id = Some(staff.person_id);
        let task = assert_ok!(h.services.tasks.create_task(Some(&staff), animal.id, form).await);
        assert_eq!(task.assignee_id, Some(staff.person_id));
        assert_eq!(task.created_by, staff.person_id);

        let tags = h.revalidator.take();
        assert!(tags.contains(&ViewTag::AnimalTasks(animal.id)));
        assert!(tags.contains(&ViewTag::TaskDashboard));
    }

    #[tokio::test]
    async fn test_delete_then_restore_returns_prior_status() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;

        for start in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            let task = created(&h, &staff, start).await;

            let deleted = assert_ok!(h.services.tasks.delete_task(Some(&staff), task.animal_id, task.id).await);
            assert_eq!(deleted.status, TaskStatus::Deleted);
            assert_eq!(deleted.previous_status, Some(start));

            let restored = assert_ok!(h.services.tasks.restore_task(Some(&staff), task.animal_id, task.id).await);
            assert_eq!(restored.status, start);
            assert_eq!(restored.previous_status, None);
        }
    }

    #[tokio::test]
    async fn test_status_moves_through_the_table() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let task = created(&h, &staff, TaskStatus::Todo).await;
        let to = |status| TaskStatusForm { status };

        let done = assert_ok!(
            h.services.tasks.update_task_status(Some(&staff), task.animal_id, task.id, to(TaskStatus::Done)).await
        );
        assert_eq!(done.status, TaskStatus::Done);

        let deleted = assert_ok!(
            h.services.tasks.update_task_status(Some(&staff), task.animal_id, task.id, to(TaskStatus::Deleted)).await
        );
        assert_eq!(deleted.previous_status, Some(TaskStatus::Done));

        let back = assert_ok!(
            h.services.tasks.update_task_status(Some(&staff), task.animal_id, task.id, to(TaskStatus::InProgress)).await
        );
        assert_eq!(back.status, TaskStatus::InProgress);
        assert_eq!(back.previous_status, None);
    }

    #[tokio::test]
    async fn test_restore_of_live_task_is_rejected() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let task = created(&h, &staff, TaskStatus::InProgress).await;

        let err = h
            .services
            .tasks
            .restore_task(Some(&staff), task.animal_id, task.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_task_must_belong_to_animal() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let task = created(&h, &staff, TaskStatus::Todo).await;
        let other = h.animal(AnimalListingStatus::Draft).await;

        assert_err!(h.services.tasks.delete_task(Some(&staff), other.id, task.id).await);
        let stored = h.store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_deleted_tasks_are_hidden_by_default() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let task = created(&h, &staff, TaskStatus::Todo).await;
        h.services
            .tasks
            .create_task(Some(&staff), task.animal_id, task_form("Bath"))
            .await
            .unwrap();
        h.services.tasks.delete_task(Some(&staff), task.animal_id, task.id).await.unwrap();

        let visible = h.services.tasks.list_for_animal(Some(&staff), task.animal_id, false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Bath");

        let all = h.services.tasks.list_for_animal(Some(&staff), task.animal_id, true).await.unwrap();
        assert_eq!(all.len(), 2);

        let board = h.services.tasks.dashboard(Some(&staff), TaskFilter::default()).await.unwrap();
        assert_eq!(board.len(), 1);
    }

    #[tokio::test]
    async fn test_reassign_and_unassign() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let admin = h.person(Role::Admin).await;
        let task = created(&h, &staff, TaskStatus::Todo).await;

        let assigned = h
            .services
            .tasks
            .update_task_assignee(Some(&staff), task.id, TaskAssigneeForm { assignee_id: Some(admin.person_id) })
            .await
            .unwrap();
        assert_eq!(assigned.assignee_id, Some(admin.person_id));

        let cleared = h
            .services
            .tasks
            .update_task_assignee(Some(&staff), task.id, TaskAssigneeForm { assignee_id: None })
            .await
            .unwrap();
        assert_eq!(cleared.assignee_id, None);
    }
}
