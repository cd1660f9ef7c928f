//! Reference resolution for responses.
//!
//! Documents store bare `ObjectId` references; these helpers load the
//! referenced users/projects with a single `$in` query and hand back maps
//! keyed by id, so list endpoints stay at two round trips.

use crate::{
    database::MongoDB,
    models::{Project, ProjectRef, ProjectSummary, User, UserRef, UserSummary},
    utils::AppError,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use std::collections::{HashMap, HashSet};

pub type UserMap = HashMap<ObjectId, User>;
pub type ProjectMap = HashMap<ObjectId, Project>;

fn distinct(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub async fn load_users(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<UserMap, AppError> {
    let ids = distinct(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<User> = db
        .users()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(users
        .into_iter()
        .filter_map(|user| user.id.map(|id| (id, user)))
        .collect())
}

pub async fn load_projects(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<ProjectMap, AppError> {
    let ids = distinct(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let projects: Vec<Project> = db
        .projects()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(projects
        .into_iter()
        .filter_map(|project| project.id.map(|id| (id, project)))
        .collect())
}

/// Populated reference when the user is in `users`, bare id otherwise
pub fn user_ref(users: &UserMap, id: &ObjectId, select: fn(&User) -> UserSummary) -> UserRef {
    users
        .get(id)
        .map(|user| UserRef::Populated(select(user)))
        .unwrap_or_else(|| UserRef::id(id))
}

pub fn project_ref(
    projects: &ProjectMap,
    id: &ObjectId,
    select: fn(&Project) -> ProjectSummary,
) -> ProjectRef {
    projects
        .get(id)
        .map(|project| ProjectRef::Populated(select(project)))
        .unwrap_or_else(|| ProjectRef::Id(id.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_eq!(distinct(vec![a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn test_user_ref_falls_back_to_id() {
        let present = ObjectId::new();
        let missing = ObjectId::new();
        let mut users = UserMap::new();
        users.insert(
            present,
            User {
                id: Some(present),
                name: "Meera".into(),
                email: "meera@example.com".into(),
                password: String::new(),
                role: Role::User,
                avatar: None,
                created_at: 0,
                updated_at: 0,
            },
        );

        let populated = serde_json::to_value(user_ref(&users, &present, UserSummary::contact)).unwrap();
        assert_eq!(populated["name"], "Meera");
        assert_eq!(populated["email"], "meera@example.com");

        let bare = serde_json::to_value(user_ref(&users, &missing, UserSummary::contact)).unwrap();
        assert_eq!(bare, serde_json::json!(missing.to_hex()));
    }
}
