use crate::{
    database::MongoDB,
    models::{end_date_after, now_millis, CampaignInput, PaymentStatus, Project, ProjectResponse, ProjectStatus, UpdateProjectRequest, UserSummary},
    services::project_service::with_creators,
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson, Document};
use mongodb::options::ReturnDocument;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct PlatformStats {
    pub total_projects: u64,
    pub active_projects: u64,
    pub total_users: u64,
    pub total_payments: u64,
    pub total_raised: f64,
}

pub async fn create_project(
    db: &MongoDB,
    creator: ObjectId,
    input: CampaignInput,
) -> Result<ProjectResponse, AppError> {
    input.validate()?;

    let mut project = input.into_project(creator, now_millis())?;
    let result = db.projects().insert_one(&project).await?;
    project.id = result.inserted_id.as_object_id();

    log::info!("✅ Project created: {} ({})", project.title, crate::models::hex_id(&project.id));

    Ok(ProjectResponse::from(project))
}

/// `$set` document for the fields present in a partial update
pub fn build_project_update(request: UpdateProjectRequest, now: i64) -> Result<Document, AppError> {
    let mut set = Document::new();

    let text_fields = [
        ("title", request.title),
        ("description", request.description),
        ("long_description", request.long_description),
        ("category", request.category),
        ("image", request.image),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }

    if let Some(goal) = request.goal {
        if !(goal > 0.0) {
            return Err(AppError::Validation("goal must be greater than 0".into()));
        }
        set.insert("goal", goal);
    }
    if let Some(days_left) = request.days_left {
        set.insert("days_left", days_left);
        set.insert("end_date", end_date_after(now, days_left)?);
    }
    if let Some(status) = request.status {
        set.insert("status", status.as_str());
    }
    if let Some(featured) = request.featured {
        set.insert("featured", featured);
    }
    if let Some(verified) = request.verified {
        set.insert("verified", verified);
    }
    if let Some(rewards) = request.rewards {
        let rewards: Vec<_> = rewards.into_iter().map(|r| r.into_reward()).collect();
        set.insert("rewards", to_bson(&rewards)?);
    }

    set.insert("updated_at", now);
    Ok(set)
}

pub async fn update_project(
    db: &MongoDB,
    id: &str,
    request: UpdateProjectRequest,
) -> Result<ProjectResponse, AppError> {
    let id = parse_object_id(id, "project")?;
    let set = build_project_update(request, now_millis())?;

    let project = db
        .projects()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    Ok(ProjectResponse::from(project))
}

pub async fn delete_project(db: &MongoDB, id: &str) -> Result<(), AppError> {
    let id = parse_object_id(id, "project")?;

    db.projects()
        .find_one_and_delete(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    log::info!("🗑️  Project deleted: {}", id);
    Ok(())
}

/// Every project regardless of status, newest first
pub async fn all_projects(db: &MongoDB) -> Result<Vec<ProjectResponse>, AppError> {
    let projects: Vec<Project> = db
        .projects()
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    with_creators(db, projects, UserSummary::contact).await
}

fn numeric(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => *v as f64,
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

pub async fn platform_stats(db: &MongoDB) -> Result<PlatformStats, AppError> {
    let total_projects = db.projects().count_documents(doc! {}).await?;
    let active_projects = db
        .projects()
        .count_documents(doc! { "status": ProjectStatus::Active.as_str() })
        .await?;
    let total_users = db.users().count_documents(doc! {}).await?;
    let total_payments = db.payments().count_documents(doc! {}).await?;

    let pipeline = vec![
        doc! { "$match": { "status": to_bson(&PaymentStatus::Completed)? } },
        doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount" } } },
    ];
    let groups: Vec<Document> = db.payments().aggregate(pipeline).await?.try_collect().await?;
    let total_raised = numeric(groups.first().and_then(|g| g.get("total")));

    Ok(PlatformStats {
        total_projects,
        active_projects,
        total_users,
        total_payments,
        total_raised,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RewardInput;

    #[test]
    fn test_partial_update_only_sets_present_fields() {
        let request = UpdateProjectRequest {
            title: Some("New title".into()),
            featured: Some(true),
            status: Some(ProjectStatus::Successful),
            ..Default::default()
        };
        let set = build_project_update(request, 42).unwrap();

        assert_eq!(set.get_str("title").unwrap(), "New title");
        assert!(set.get_bool("featured").unwrap());
        assert_eq!(set.get_str("status").unwrap(), "successful");
        assert_eq!(set.get_i64("updated_at").unwrap(), 42);
        assert!(set.get("goal").is_none());
        assert!(set.get("description").is_none());
    }

    #[test]
    fn test_partial_update_rewards_get_ids() {
        let request = UpdateProjectRequest {
            rewards: Some(vec![RewardInput {
                title: "Mug".into(),
                description: "Ceramic".into(),
                amount: 800.0,
                delivery: "Mar 2027".into(),
            }]),
            ..Default::default()
        };
        let set = build_project_update(request, 1).unwrap();
        let rewards = set.get_array("rewards").unwrap();
        let reward = rewards[0].as_document().unwrap();
        assert!(reward.get_object_id("_id").is_ok());
        assert_eq!(reward.get_i64("backers").unwrap(), 0);
    }

    #[test]
    fn test_partial_update_rejects_non_positive_goal() {
        let request = UpdateProjectRequest {
            goal: Some(-5.0),
            ..Default::default()
        };
        assert!(build_project_update(request, 1).is_err());
    }

    #[test]
    fn test_partial_update_bounds_days_left_and_moves_end_date() {
        for days in [0, -1, 3651, 9_000_000_000_000_000] {
            let request = UpdateProjectRequest {
                days_left: Some(days),
                ..Default::default()
            };
            assert!(matches!(build_project_update(request, 1), Err(AppError::Validation(_))));
        }

        let request = UpdateProjectRequest {
            days_left: Some(7),
            ..Default::default()
        };
        let set = build_project_update(request, 1_000).unwrap();
        assert_eq!(set.get_i64("days_left").unwrap(), 7);
        assert_eq!(
            set.get_i64("end_date").unwrap(),
            1_000 + 7 * crate::models::DAY_MILLIS
        );
    }

    #[test]
    fn test_numeric_sum_variants() {
        assert_eq!(numeric(Some(&Bson::Double(12.5))), 12.5);
        assert_eq!(numeric(Some(&Bson::Int32(7))), 7.0);
        assert_eq!(numeric(Some(&Bson::Int64(9))), 9.0);
        assert_eq!(numeric(None), 0.0);
    }
}
