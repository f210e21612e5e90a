/// Authorization engine
///
/// Pure decision logic over (actor, action, resource). Roles carry no
/// behavior; everything lives in the rule table of [`authorize`] and the two
/// object-level predicates composed by [`authorize_task_change`].
///
/// # Permission Model
///
/// 1. **Authentication**: anonymous actors may only register
///    ([`Resource::User`] + [`Action::Create`])
/// 2. **Role rules**: [`authorize`] answers Allow, Deny or Related per
///    resource and action
/// 3. **Object rules**: a Related grant is settled against the target's
///    current state (creator, assignees, author, identity)
/// 4. **Visibility**: task collections are narrowed by [`task_visibility`]
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::authorization::{authorize, Action, Actor, Grant, Principal, Resource};
/// use taskhub_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let manager = Actor::User(Principal {
///     id: Uuid::new_v4(),
///     username: "mia".to_string(),
///     role: Role::Manager,
/// });
///
/// assert_eq!(authorize(&manager, Resource::Category, Action::Create), Ok(Grant::Allow));
/// assert_eq!(authorize(&manager, Resource::Task, Action::Delete), Ok(Grant::Allow));
/// ```

use uuid::Uuid;

use crate::models::comment::CommentRecord;
use crate::models::task::TaskRecord;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No identity on a request that needs one
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    /// Identity known, action denied
    #[error("{0}")]
    Forbidden(String),
}

/// An authenticated identity with its role as currently stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// The identity making a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Principal),
}

impl Actor {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::Anonymous => None,
            Actor::User(principal) => Some(principal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Category,
    Task,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    List,
    Read,
    Update,
    Delete,
}

/// Outcome of the role rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Allowed for any target
    Allow,

    /// Never allowed for this role
    Deny,

    /// Allowed only for targets the actor is related to
    Related,
}

/// Task collection filter for an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskVisibility {
    /// Every task
    All,

    /// Tasks the user created or is assigned to
    Involving(Uuid),
}

impl TaskVisibility {
    pub fn admits(&self, task: &TaskRecord) -> bool {
        match self {
            TaskVisibility::All => true,
            TaskVisibility::Involving(user_id) => {
                task.is_creator(*user_id) || task.is_assigned(*user_id)
            }
        }
    }
}

/// Returns the principal or fails with Unauthenticated
pub fn require_principal(actor: &Actor) -> Result<&Principal, AuthzError> {
    actor.principal().ok_or(AuthzError::Unauthenticated)
}

/// Role rule table
///
/// # Errors
///
/// Returns `AuthzError::Unauthenticated` for anonymous actors on anything
/// other than user registration.
pub fn authorize(actor: &Actor, resource: Resource, action: Action) -> Result<Grant, AuthzError> {
    let principal = match actor {
        Actor::User(principal) => principal,
        Actor::Anonymous if (resource, action) == (Resource::User, Action::Create) => {
            return Ok(Grant::Allow)
        }
        Actor::Anonymous => return Err(AuthzError::Unauthenticated),
    };

    let role = principal.role;
    let elevated = matches!(role, Role::Admin | Role::Manager);

    let grant = match (resource, action) {
        (Resource::User, Action::Create) => Grant::Allow,
        (Resource::User, Action::List | Action::Delete) => {
            if role == Role::Admin {
                Grant::Allow
            } else {
                Grant::Deny
            }
        }
        (Resource::User, Action::Read | Action::Update) => {
            if role == Role::Admin {
                Grant::Allow
            } else {
                Grant::Related
            }
        }

        (Resource::Category, _) => {
            if elevated {
                Grant::Allow
            } else {
                Grant::Deny
            }
        }

        (Resource::Task, Action::Create) => Grant::Allow,
        (Resource::Task, _) => {
            if elevated {
                Grant::Allow
            } else {
                Grant::Related
            }
        }

        (Resource::Comment, Action::Create | Action::List | Action::Read) => Grant::Allow,
        (Resource::Comment, Action::Update | Action::Delete) => {
            if elevated {
                Grant::Allow
            } else {
                Grant::Related
            }
        }
    };

    Ok(grant)
}

/// Fails with Forbidden unless the role table grants the action outright
pub fn require_allow(actor: &Actor, resource: Resource, action: Action) -> Result<(), AuthzError> {
    match authorize(actor, resource, action)? {
        Grant::Allow => Ok(()),
        Grant::Deny | Grant::Related => Err(AuthzError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        )),
    }
}

pub fn is_manager_or_admin(principal: &Principal) -> bool {
    matches!(principal.role, Role::Admin | Role::Manager)
}

pub fn is_owner_or_assignee(principal: &Principal, task: &TaskRecord) -> bool {
    task.is_creator(principal.id) || task.is_assigned(principal.id)
}

/// Update/delete decision for one task
///
/// Allowed when either predicate holds. The task must be loaded fresh for
/// the request so the assignee check sees current membership.
pub fn authorize_task_change(actor: &Actor, task: &TaskRecord) -> Result<(), AuthzError> {
    let principal = require_principal(actor)?;

    if is_owner_or_assignee(principal, task) || is_manager_or_admin(principal) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            "Only the creator, an assignee, a manager or an admin may change this task"
                .to_string(),
        ))
    }
}

/// Update/delete decision for one comment: the author, or a manager/admin
pub fn authorize_comment_change(actor: &Actor, comment: &CommentRecord) -> Result<(), AuthzError> {
    let principal = require_principal(actor)?;

    if comment.comment.user_id == principal.id || is_manager_or_admin(principal) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            "Only the author, a manager or an admin may change this comment".to_string(),
        ))
    }
}

/// Read/update decision for one user account
pub fn authorize_user_target(
    actor: &Actor,
    action: Action,
    target_id: Uuid,
) -> Result<(), AuthzError> {
    match authorize(actor, Resource::User, action)? {
        Grant::Allow => Ok(()),
        Grant::Related if actor.principal().map(|p| p.id) == Some(target_id) => Ok(()),
        Grant::Deny | Grant::Related => Err(AuthzError::Forbidden(
            "You may only access your own account".to_string(),
        )),
    }
}

/// Visibility predicate for task collection reads
pub fn task_visibility(actor: &Actor) -> Result<TaskVisibility, AuthzError> {
    let principal = require_principal(actor)?;

    match authorize(actor, Resource::Task, Action::List)? {
        Grant::Allow => Ok(TaskVisibility::All),
        Grant::Related => Ok(TaskVisibility::Involving(principal.id)),
        Grant::Deny => Err(AuthzError::Forbidden(
            "You do not have permission to list tasks".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::CategoryRef;
    use crate::models::comment::Comment;
    use crate::models::task::{Priority, Task, TaskStatus};
    use crate::models::user::UserRef;
    use chrono::Utc;

    fn actor(role: Role) -> Actor {
        Actor::User(Principal {
            id: Uuid::new_v4(),
            username: format!("{}-user", role.as_str()),
            role,
        })
    }

    fn user_ref(id: Uuid) -> UserRef {
        UserRef {
            id,
            username: id.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    fn task(created_by: Uuid, assignees: &[Uuid]) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            task: Task {
                id: Uuid::new_v4(),
                title: "Fix bug".to_string(),
                description: None,
                priority: Priority::Medium,
                status: TaskStatus::Pending,
                due_date: now,
                created_by,
                created_at: now,
                updated_at: now,
            },
            creator: user_ref(created_by),
            assignees: assignees.iter().map(|id| user_ref(*id)).collect(),
            categories: Vec::<CategoryRef>::new(),
        }
    }

    fn id_of(actor: &Actor) -> Uuid {
        actor.principal().unwrap().id
    }

    #[test]
    fn test_anonymous_may_only_register() {
        let anon = Actor::Anonymous;
        assert_eq!(authorize(&anon, Resource::User, Action::Create), Ok(Grant::Allow));

        for resource in [Resource::User, Resource::Category, Resource::Task, Resource::Comment] {
            for action in [Action::List, Action::Read, Action::Update, Action::Delete] {
                assert_eq!(
                    authorize(&anon, resource, action),
                    Err(AuthzError::Unauthenticated)
                );
            }
        }
        assert_eq!(task_visibility(&anon), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn test_category_rules() {
        for action in [Action::Create, Action::List, Action::Update, Action::Delete] {
            assert_eq!(authorize(&actor(Role::Admin), Resource::Category, action), Ok(Grant::Allow));
            assert_eq!(authorize(&actor(Role::Manager), Resource::Category, action), Ok(Grant::Allow));
            assert_eq!(authorize(&actor(Role::Employee), Resource::Category, action), Ok(Grant::Deny));
        }
    }

    #[test]
    fn test_user_rules() {
        let admin = actor(Role::Admin);
        let manager = actor(Role::Manager);
        let employee = actor(Role::Employee);
        let other = Uuid::new_v4();

        assert_eq!(authorize(&admin, Resource::User, Action::List), Ok(Grant::Allow));
        assert_eq!(authorize(&manager, Resource::User, Action::List), Ok(Grant::Deny));
        assert_eq!(authorize(&employee, Resource::User, Action::Delete), Ok(Grant::Deny));

        assert!(authorize_user_target(&admin, Action::Update, other).is_ok());
        assert!(authorize_user_target(&manager, Action::Read, other).is_err());
        assert!(authorize_user_target(&manager, Action::Read, id_of(&manager)).is_ok());
        assert!(authorize_user_target(&employee, Action::Update, id_of(&employee)).is_ok());
        assert!(authorize_user_target(&employee, Action::Delete, id_of(&employee)).is_err());
    }

    #[test]
    fn test_task_visibility_per_role() {
        let employee = actor(Role::Employee);
        assert_eq!(task_visibility(&actor(Role::Admin)), Ok(TaskVisibility::All));
        assert_eq!(task_visibility(&actor(Role::Manager)), Ok(TaskVisibility::All));
        assert_eq!(
            task_visibility(&employee),
            Ok(TaskVisibility::Involving(id_of(&employee)))
        );
    }

    #[test]
    fn test_visibility_admits_creator_or_assignee_only() {
        let me = Uuid::new_v4();
        let visibility = TaskVisibility::Involving(me);

        assert!(visibility.admits(&task(me, &[])));
        assert!(visibility.admits(&task(Uuid::new_v4(), &[me])));
        assert!(!visibility.admits(&task(Uuid::new_v4(), &[Uuid::new_v4()])));
        assert!(TaskVisibility::All.admits(&task(Uuid::new_v4(), &[])));
    }

    #[test]
    fn test_task_change_is_or_of_two_predicates() {
        let manager = actor(Role::Manager);
        let admin = actor(Role::Admin);
        let creator = actor(Role::Employee);
        let assignee = actor(Role::Employee);
        let stranger = actor(Role::Employee);

        let record = task(id_of(&creator), &[id_of(&assignee)]);

        assert!(authorize_task_change(&manager, &record).is_ok());
        assert!(authorize_task_change(&admin, &record).is_ok());
        assert!(authorize_task_change(&creator, &record).is_ok());
        assert!(authorize_task_change(&assignee, &record).is_ok());
        assert!(matches!(
            authorize_task_change(&stranger, &record),
            Err(AuthzError::Forbidden(_))
        ));
        assert_eq!(
            authorize_task_change(&Actor::Anonymous, &record),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_comment_change_rules() {
        let author = actor(Role::Employee);
        let other = actor(Role::Employee);
        let manager = actor(Role::Manager);

        let record = CommentRecord {
            comment: Comment {
                id: Uuid::new_v4(),
                task_id: Uuid::new_v4(),
                user_id: id_of(&author),
                content: "looks good".to_string(),
                created_at: Utc::now(),
            },
            author: user_ref(id_of(&author)),
        };

        assert!(authorize_comment_change(&author, &record).is_ok());
        assert!(authorize_comment_change(&manager, &record).is_ok());
        assert!(authorize_comment_change(&other, &record).is_err());
        assert_eq!(
            authorize(&other, Resource::Comment, Action::List),
            Ok(Grant::Allow)
        );
    }

    #[test]
    fn test_require_allow_rejects_related_grants() {
        assert!(require_allow(&actor(Role::Admin), Resource::User, Action::List).is_ok());
        assert!(matches!(
            require_allow(&actor(Role::Employee), Resource::User, Action::List),
            Err(AuthzError::Forbidden(_))
        ));
        assert!(require_allow(&actor(Role::Employee), Resource::Task, Action::Create).is_ok());
    }
}
