use crate::{
    database::MongoDB,
    models::{
        now_millis, EditUpdateInput, Project, ProjectResponse, ProjectStatus, ProjectUpdate,
        ProjectUpdateResponse, UpdateInput, UserSummary,
    },
    services::populate::{load_users, user_ref},
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use serde::Deserialize;

pub const FEATURED_LIMIT: i64 = 6;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

/// Public listing filter: active projects, optional category and text search
pub fn build_list_filter(query: &ProjectQuery) -> Document {
    let mut filter = doc! { "status": ProjectStatus::Active.as_str() };

    if let Some(category) = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "All")
    {
        filter.insert("category", category);
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = regex::escape(search);
        filter.insert(
            "$or",
            vec![
                doc! { "title": { "$regex": &pattern, "$options": "i" } },
                doc! { "description": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }

    filter
}

pub fn sort_for(sort_by: Option<&str>) -> Document {
    match sort_by {
        Some("trending") => doc! { "backers": -1 },
        Some("newest") => doc! { "created_at": -1 },
        Some("ending") => doc! { "days_left": 1 },
        Some("funded") => doc! { "raised": -1 },
        _ => doc! { "created_at": -1 },
    }
}

pub async fn find_project(db: &MongoDB, id: &ObjectId) -> Result<Project, AppError> {
    db.projects()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// Attaches creators selected with `select` to each project
pub async fn with_creators(
    db: &MongoDB,
    projects: Vec<Project>,
    select: fn(&crate::models::User) -> UserSummary,
) -> Result<Vec<ProjectResponse>, AppError> {
    let users = load_users(db, projects.iter().map(|p| p.creator)).await?;

    Ok(projects
        .into_iter()
        .map(|project| {
            let creator = user_ref(&users, &project.creator, select);
            ProjectResponse::new(project, creator)
        })
        .collect())
}

pub async fn list_projects(db: &MongoDB, query: &ProjectQuery) -> Result<Vec<ProjectResponse>, AppError> {
    let projects: Vec<Project> = db
        .projects()
        .find(build_list_filter(query))
        .sort(sort_for(query.sort_by.as_deref()))
        .await?
        .try_collect()
        .await?;

    with_creators(db, projects, UserSummary::public).await
}

pub async fn get_project(db: &MongoDB, id: &str) -> Result<ProjectResponse, AppError> {
    let id = parse_object_id(id, "project")?;
    let project = find_project(db, &id).await?;

    let mut populated = with_creators(db, vec![project], UserSummary::full).await?;
    populated
        .pop()
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

pub async fn featured_projects(db: &MongoDB) -> Result<Vec<ProjectResponse>, AppError> {
    let projects: Vec<Project> = db
        .projects()
        .find(doc! { "featured": true, "status": ProjectStatus::Active.as_str() })
        .limit(FEATURED_LIMIT)
        .await?
        .try_collect()
        .await?;

    with_creators(db, projects, UserSummary::public).await
}

/// Timeline of a project, newest first
pub async fn project_updates(db: &MongoDB, id: &str) -> Result<Vec<ProjectUpdateResponse>, AppError> {
    let id = parse_object_id(id, "project")?;
    let mut updates = find_project(db, &id).await?.updates;
    updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(updates.iter().map(ProjectUpdateResponse::from).collect())
}

pub async fn add_update(
    db: &MongoDB,
    project_id: &str,
    input: UpdateInput,
) -> Result<ProjectUpdateResponse, AppError> {
    let project_id = parse_object_id(project_id, "project")?;

    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(AppError::Validation("Title and content are required".into()));
    }

    let now = now_millis();
    let update = ProjectUpdate {
        id: ObjectId::new(),
        title: input.title,
        content: input.content,
        kind: input.kind.unwrap_or_default(),
        image: input.image,
        video_url: input.video_url,
        created_at: now,
    };

    let result = db
        .projects()
        .update_one(
            doc! { "_id": project_id },
            doc! {
                "$push": { "updates": to_bson(&update)? },
                "$set": { "updated_at": now },
            },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Project not found".into()));
    }

    log::info!("📰 Update {} added to project {}", update.id, project_id);

    Ok(ProjectUpdateResponse::from(&update))
}

pub async fn edit_update(
    db: &MongoDB,
    project_id: &str,
    update_id: &str,
    input: EditUpdateInput,
) -> Result<ProjectUpdateResponse, AppError> {
    let project_id = parse_object_id(project_id, "project")?;
    let update_id = parse_object_id(update_id, "update")?;

    let project = find_project(db, &project_id).await?;
    let mut update = project
        .updates
        .into_iter()
        .find(|u| u.id == update_id)
        .ok_or_else(|| AppError::NotFound("Update not found".into()))?;

    input.apply(&mut update);

    let result = db
        .projects()
        .update_one(
            doc! { "_id": project_id, "updates._id": update_id },
            doc! { "$set": { "updates.$": to_bson(&update)?, "updated_at": now_millis() } },
        )
        .await?;

    if result.matched_count == 0 {
        // Removed between the read and the write
        return Err(AppError::NotFound("Update not found".into()));
    }

    Ok(ProjectUpdateResponse::from(&update))
}

pub async fn delete_update(db: &MongoDB, project_id: &str, update_id: &str) -> Result<(), AppError> {
    let project_id = parse_object_id(project_id, "project")?;
    let update_id = parse_object_id(update_id, "update")?;

    let result = db
        .projects()
        .update_one(
            doc! { "_id": project_id, "updates._id": update_id },
            doc! {
                "$pull": { "updates": { "_id": update_id } },
                "$set": { "updated_at": now_millis() },
            },
        )
        .await?;

    if result.matched_count == 0 {
        // Tell a missing project apart from a missing update
        find_project(db, &project_id).await?;
        return Err(AppError::NotFound("Update not found".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_defaults_to_active_only() {
        let filter = build_list_filter(&ProjectQuery::default());
        assert_eq!(filter, doc! { "status": "active" });
    }

    #[test]
    fn test_list_filter_ignores_all_category() {
        let query = ProjectQuery {
            category: Some("All".into()),
            ..Default::default()
        };
        assert!(build_list_filter(&query).get("category").is_none());

        let query = ProjectQuery {
            category: Some("Technology".into()),
            ..Default::default()
        };
        assert_eq!(build_list_filter(&query).get_str("category").unwrap(), "Technology");
    }

    #[test]
    fn test_search_is_regex_escaped_and_case_insensitive() {
        let query = ProjectQuery {
            search: Some("c++ (beta)".into()),
            ..Default::default()
        };
        let filter = build_list_filter(&query);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);

        let title = clauses[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"c\+\+ \(beta\)");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_sort_options() {
        assert_eq!(sort_for(Some("trending")), doc! { "backers": -1 });
        assert_eq!(sort_for(Some("newest")), doc! { "created_at": -1 });
        assert_eq!(sort_for(Some("ending")), doc! { "days_left": 1 });
        assert_eq!(sort_for(Some("funded")), doc! { "raised": -1 });
        assert_eq!(sort_for(Some("unknown")), doc! { "created_at": -1 });
        assert_eq!(sort_for(None), doc! { "created_at": -1 });
    }
}
