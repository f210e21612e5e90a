/// In-memory implementation of [`EntityStore`]
///
/// Mirrors the PostgreSQL store: the same uniqueness and reference checks,
/// the same cascades, the same orderings. One lock guards all tables, so each
/// operation is atomic with respect to every other.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CategoryQuery, CommentQuery, EntityStore, StoreError, StoreResult, TaskQuery, TaskSortField,
    UserQuery,
};
use crate::models::category::{Category, CategoryRef, CreateCategory, UpdateCategory};
use crate::models::comment::{Comment, CommentRecord, CreateComment};
use crate::models::task::{
    dedup_ids, CreateTask, Task, TaskRecord, TaskRelation, UpdateTask,
};
use crate::models::user::{CreateUser, UpdateUser, User, UserRef};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    tasks: HashMap<Uuid, Task>,
    assignees: HashMap<Uuid, Vec<Uuid>>,
    task_categories: HashMap<Uuid, Vec<Uuid>>,
    comments: HashMap<Uuid, Comment>,
    clock: Option<DateTime<Utc>>,
}

/// Entity store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(term: &str, fields: &[Option<&str>]) -> bool {
    let term = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
}

impl Tables {
    /// Wall clock, forced strictly monotonic so every write gets a distinct
    /// timestamp
    fn tick(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.clock {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.clock = Some(now);
        now
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| user.username == username && Some(user.id) != except)
    }

    fn check_users(&self, ids: &[Uuid], field: &'static str) -> StoreResult<()> {
        if ids.iter().all(|id| self.users.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference { field })
        }
    }

    fn check_categories(&self, ids: &[Uuid]) -> StoreResult<()> {
        if ids.iter().all(|id| self.categories.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference { field: "categories" })
        }
    }

    fn user_ref(&self, id: Uuid) -> Option<UserRef> {
        self.users.get(&id).map(User::as_ref_name)
    }

    fn record(&self, task: &Task) -> Option<TaskRecord> {
        let creator = self.user_ref(task.created_by)?;

        let mut assignees: Vec<UserRef> = self
            .assignees
            .get(&task.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.user_ref(*id))
            .collect();
        assignees.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));

        let mut categories: Vec<CategoryRef> = self
            .task_categories
            .get(&task.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.categories.get(id).map(Category::as_ref_name))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Some(TaskRecord {
            task: task.clone(),
            creator,
            assignees,
            categories,
        })
    }

    fn comment_record(&self, comment: &Comment) -> Option<CommentRecord> {
        Some(CommentRecord {
            author: self.user_ref(comment.user_id)?,
            comment: comment.clone(),
        })
    }

    fn relation_mut(&mut self, relation: TaskRelation) -> &mut HashMap<Uuid, Vec<Uuid>> {
        match relation {
            TaskRelation::Assignees => &mut self.assignees,
            TaskRelation::Categories => &mut self.task_categories,
        }
    }

    fn check_relation(&self, relation: TaskRelation, ids: &[Uuid]) -> StoreResult<()> {
        match relation {
            TaskRelation::Assignees => self.check_users(ids, "assigned_to"),
            TaskRelation::Categories => self.check_categories(ids),
        }
    }

    fn remove_task(&mut self, id: Uuid) -> bool {
        self.assignees.remove(&id);
        self.task_categories.remove(&id);
        self.comments.retain(|_, comment| comment.task_id != id);
        self.tasks.remove(&id).is_some()
    }
}

fn task_matches(record: &TaskRecord, query: &TaskQuery) -> bool {
    let task = &record.task;

    query.visibility.admits(record)
        && query.status.map_or(true, |status| task.status == status)
        && query.priority.map_or(true, |priority| task.priority == priority)
        && query
            .category
            .map_or(true, |id| record.categories.iter().any(|c| c.id == id))
        && query.assigned_to.map_or(true, |id| record.is_assigned(id))
        && query.created_by.map_or(true, |id| task.created_by == id)
        && query.search.as_deref().map_or(true, |term| {
            matches_search(term, &[Some(task.title.as_str()), task.description.as_deref()])
        })
}

fn compare_tasks(a: &Task, b: &Task, query: &TaskQuery) -> Ordering {
    let primary = match query.ordering.field {
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortField::DueDate => a.due_date.cmp(&b.due_date),
        TaskSortField::Priority => a.priority.cmp(&b.priority),
        TaskSortField::Status => a.status.cmp(&b.status),
    };
    let primary = if query.ordering.descending {
        primary.reverse()
    } else {
        primary
    };

    primary
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;

        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|user| {
                query.search.as_deref().map_or(true, |term| {
                    matches_search(
                        term,
                        &[
                            Some(user.username.as_str()),
                            Some(user.email.as_str()),
                            Some(user.first_name.as_str()),
                            Some(user.last_name.as_str()),
                        ],
                    )
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(query.page.apply(users))
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.username_taken(&data.username, None) {
            return Err(StoreError::UniqueViolation { field: "username" });
        }

        let now = tables.tick();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            role: data.role,
            profile_picture: data.profile_picture,
            password_hash: data.password_hash,
            date_joined: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(username) = &data.username {
            if tables.username_taken(username, Some(id)) {
                return Err(StoreError::UniqueViolation { field: "username" });
            }
        }

        let now = tables.tick();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(first_name) = data.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(picture) = data.profile_picture {
            user.profile_picture = picture;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = now;

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        let created: Vec<Uuid> = tables
            .tasks
            .values()
            .filter(|task| task.created_by == id)
            .map(|task| task.id)
            .collect();
        for task_id in created {
            tables.remove_task(task_id);
        }

        for members in tables.assignees.values_mut() {
            members.retain(|member| *member != id);
        }
        tables.comments.retain(|_, comment| comment.user_id != id);

        Ok(true)
    }

    async fn missing_user_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter(|id| !tables.users.contains_key(id))
            .copied()
            .collect())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;

        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|category| {
                query.search.as_deref().map_or(true, |term| {
                    matches_search(
                        term,
                        &[Some(category.name.as_str()), category.description.as_deref()],
                    )
                })
            })
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(query.page.apply(categories))
    }

    async fn create_category(&self, data: CreateCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;

        let category = Category {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            color: data.color,
        };
        tables.categories.insert(category.id, category.clone());

        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        data: UpdateCategory,
    ) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.write().await;

        let Some(category) = tables.categories.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            category.name = name;
        }
        if let Some(description) = data.description {
            category.description = description;
        }
        if let Some(color) = data.color {
            category.color = color;
        }

        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for members in tables.task_categories.values_mut() {
            members.retain(|member| *member != id);
        }

        Ok(true)
    }

    async fn missing_category_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter(|id| !tables.categories.contains_key(id))
            .copied()
            .collect())
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<TaskRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).and_then(|task| tables.record(task)))
    }

    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskRecord>> {
        let tables = self.tables.read().await;

        let mut records: Vec<TaskRecord> = tables
            .tasks
            .values()
            .filter_map(|task| tables.record(task))
            .filter(|record| task_matches(record, query))
            .collect();
        records.sort_by(|a, b| compare_tasks(&a.task, &b.task, query));

        Ok(query.page.apply(records))
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<TaskRecord> {
        let mut tables = self.tables.write().await;

        tables.check_users(&[data.created_by], "created_by")?;
        tables.check_users(&data.assigned_to, "assigned_to")?;
        tables.check_categories(&data.categories)?;

        let now = tables.tick();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: data.status,
            due_date: data.due_date,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };

        tables.assignees.insert(task.id, dedup_ids(&data.assigned_to));
        tables
            .task_categories
            .insert(task.id, dedup_ids(&data.categories));
        tables.tasks.insert(task.id, task.clone());

        tables
            .record(&task)
            .ok_or(StoreError::InvalidReference { field: "created_by" })
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<TaskRecord>> {
        let mut tables = self.tables.write().await;

        if !tables.tasks.contains_key(&id) {
            return Ok(None);
        }
        if let Some(assignees) = &data.assigned_to {
            tables.check_users(assignees, "assigned_to")?;
        }
        if let Some(categories) = &data.categories {
            tables.check_categories(categories)?;
        }

        let now = tables.tick();
        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(priority) = data.priority {
            task.priority = priority;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = due_date;
        }
        task.updated_at = now;
        let task = task.clone();

        if let Some(assignees) = data.assigned_to {
            tables.assignees.insert(id, dedup_ids(&assignees));
        }
        if let Some(categories) = data.categories {
            tables.task_categories.insert(id, dedup_ids(&categories));
        }

        Ok(tables.record(&task))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.remove_task(id))
    }

    async fn replace_task_relation(
        &self,
        id: Uuid,
        relation: TaskRelation,
        ids: &[Uuid],
    ) -> StoreResult<Option<TaskRecord>> {
        let mut tables = self.tables.write().await;

        if !tables.tasks.contains_key(&id) {
            return Ok(None);
        }
        tables.check_relation(relation, ids)?;

        let now = tables.tick();
        tables.relation_mut(relation).insert(id, dedup_ids(ids));

        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };
        task.updated_at = now;
        let task = task.clone();

        Ok(tables.record(&task))
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<CommentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&id)
            .and_then(|comment| tables.comment_record(comment)))
    }

    async fn list_comments(&self, query: &CommentQuery) -> StoreResult<Vec<CommentRecord>> {
        let tables = self.tables.read().await;

        let mut records: Vec<CommentRecord> = tables
            .comments
            .values()
            .filter(|comment| query.task.map_or(true, |task_id| comment.task_id == task_id))
            .filter_map(|comment| tables.comment_record(comment))
            .collect();
        records.sort_by(|a, b| {
            a.comment
                .created_at
                .cmp(&b.comment.created_at)
                .then(a.comment.id.cmp(&b.comment.id))
        });

        Ok(query.page.apply(records))
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<CommentRecord> {
        let mut tables = self.tables.write().await;

        if !tables.tasks.contains_key(&data.task_id) {
            return Err(StoreError::InvalidReference { field: "task" });
        }
        tables.check_users(&[data.user_id], "user")?;

        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            user_id: data.user_id,
            content: data.content,
            created_at: tables.tick(),
        };
        tables.comments.insert(comment.id, comment.clone());

        tables
            .comment_record(&comment)
            .ok_or(StoreError::InvalidReference { field: "user" })
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
    ) -> StoreResult<Option<CommentRecord>> {
        let mut tables = self.tables.write().await;

        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        let comment = comment.clone();

        Ok(tables.comment_record(&comment))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}
