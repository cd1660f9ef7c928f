use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::{
    database::MongoDB,
    models::{
        now_millis, CampaignRequest, Payment, PaymentResponse, PaymentStatus, Project,
        ProjectResponse, ProjectStatus, ProjectSummary, RequestStatus, UserInfo, UserSummary,
    },
    services::{
        auth_service::{find_user, hash_password, is_valid_email, normalize_email, validate_password, verify_password},
        populate::{load_projects, load_users, project_ref, user_ref},
        project_service::with_creators,
    },
    utils::{is_duplicate_key, AppError},
};

#[derive(Debug, Default, Serialize, PartialEq, utoipa::ToSchema)]
pub struct RequestCounts {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Default, Serialize, PartialEq, utoipa::ToSchema)]
pub struct UserStats {
    pub total_raised: f64,
    pub total_backers: i64,
    pub projects_created: u64,
    pub success_rate: u64,
    pub total_contributed: f64,
    pub projects_backed: u64,
    pub campaign_requests: RequestCounts,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct FundingPoint {
    pub month: String,
    pub raised: f64,
    pub goal: f64,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct BackerPoint {
    pub month: String,
    pub backers: i64,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct StatusSlice {
    pub name: String,
    pub value: u64,
    pub color: String,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct ContributionPoint {
    pub month: String,
    pub contributions: u64,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct CategoryPoint {
    pub category: String,
    pub raised: f64,
}

#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct UserAnalytics {
    pub funding_progress: Vec<FundingPoint>,
    pub backer_growth: Vec<BackerPoint>,
    pub project_status: Vec<StatusSlice>,
    pub monthly_contributions: Vec<ContributionPoint>,
    pub category_performance: Vec<CategoryPoint>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

const STATUS_COLORS: [(ProjectStatus, &str, &str); 4] = [
    (ProjectStatus::Active, "Active", "#10b981"),
    (ProjectStatus::Successful, "Successful", "#3b82f6"),
    (ProjectStatus::Draft, "Draft", "#6b7280"),
    (ProjectStatus::Failed, "Failed", "#ef4444"),
];

/// Short month name ("Jan") of a millisecond timestamp
fn month_of(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%b").to_string())
        .unwrap_or_default()
}

/// Sums values per key while remembering the order keys first appeared in
struct Ordered<V> {
    keys: Vec<String>,
    values: HashMap<String, V>,
}

impl<V: Default> Ordered<V> {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: HashMap::new(),
        }
    }

    fn entry(&mut self, key: String) -> &mut V {
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.entry(key).or_default()
    }

    fn into_pairs(mut self) -> impl Iterator<Item = (String, V)> {
        self.keys.into_iter().map(move |key| {
            let value = self.values.remove(&key).unwrap_or_default();
            (key, value)
        })
    }
}

pub fn compute_user_stats(projects: &[Project], payments: &[Payment], requests: &[CampaignRequest]) -> UserStats {
    let projects_created = projects.len() as u64;
    let successful = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Successful)
        .count() as u64;
    let success_rate = if projects_created > 0 {
        ((successful as f64 / projects_created as f64) * 100.0).round() as u64
    } else {
        0
    };

    let count_status = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count() as u64;

    UserStats {
        total_raised: projects.iter().map(|p| p.raised).sum(),
        total_backers: projects.iter().map(|p| p.backers).sum(),
        projects_created,
        success_rate,
        total_contributed: payments.iter().map(|p| p.amount).sum(),
        projects_backed: payments.iter().map(|p| p.project).collect::<HashSet<_>>().len() as u64,
        campaign_requests: RequestCounts {
            total: requests.len() as u64,
            pending: count_status(RequestStatus::Pending),
            approved: count_status(RequestStatus::Approved),
            rejected: count_status(RequestStatus::Rejected),
        },
    }
}

pub fn compute_analytics(projects: &[Project], payments: &[Payment]) -> UserAnalytics {
    let mut funding: Ordered<(f64, f64)> = Ordered::new();
    let mut backers: Ordered<i64> = Ordered::new();
    let mut categories: Ordered<f64> = Ordered::new();

    for project in projects {
        let month = month_of(project.created_at);
        let entry = funding.entry(month.clone());
        entry.0 += project.raised;
        entry.1 += project.goal;
        *backers.entry(month) += project.backers;
        *categories.entry(project.category.clone()) += project.raised;
    }

    let mut contributions: Ordered<u64> = Ordered::new();
    for payment in payments {
        *contributions.entry(month_of(payment.created_at)) += 1;
    }

    let mut cumulative = 0;
    let backer_growth = backers
        .into_pairs()
        .map(|(month, count)| {
            cumulative += count;
            BackerPoint {
                month,
                backers: cumulative,
            }
        })
        .collect();

    let project_status = STATUS_COLORS
        .iter()
        .map(|(status, name, color)| StatusSlice {
            name: name.to_string(),
            value: projects.iter().filter(|p| p.status == *status).count() as u64,
            color: color.to_string(),
        })
        .filter(|slice| slice.value > 0)
        .collect();

    UserAnalytics {
        funding_progress: funding
            .into_pairs()
            .map(|(month, (raised, goal))| FundingPoint { month, raised, goal })
            .collect(),
        backer_growth,
        project_status,
        monthly_contributions: contributions
            .into_pairs()
            .map(|(month, contributions)| ContributionPoint { month, contributions })
            .collect(),
        category_performance: categories
            .into_pairs()
            .map(|(category, raised)| CategoryPoint { category, raised })
            .collect(),
    }
}

async fn created_projects(db: &MongoDB, user_id: ObjectId) -> Result<Vec<Project>, AppError> {
    Ok(db
        .projects()
        .find(doc! { "creator": user_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?)
}

async fn completed_payments(db: &MongoDB, user_id: ObjectId) -> Result<Vec<Payment>, AppError> {
    Ok(db
        .payments()
        .find(doc! { "user": user_id, "status": to_bson(&PaymentStatus::Completed)? })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?)
}

pub async fn stats(db: &MongoDB, user_id: ObjectId) -> Result<UserStats, AppError> {
    let projects = created_projects(db, user_id).await?;
    let payments = completed_payments(db, user_id).await?;
    let requests: Vec<CampaignRequest> = db
        .campaign_requests()
        .find(doc! { "creator": user_id })
        .await?
        .try_collect()
        .await?;

    Ok(compute_user_stats(&projects, &payments, &requests))
}

pub async fn my_projects(db: &MongoDB, user_id: ObjectId) -> Result<Vec<ProjectResponse>, AppError> {
    let projects = created_projects(db, user_id).await?;
    with_creators(db, projects, UserSummary::contact).await
}

pub async fn backed_projects(db: &MongoDB, user_id: ObjectId) -> Result<Vec<PaymentResponse>, AppError> {
    let payments = completed_payments(db, user_id).await?;
    let users = load_users(db, [user_id]).await?;
    let projects = load_projects(db, payments.iter().map(|p| p.project)).await?;

    Ok(payments
        .into_iter()
        .map(|payment| {
            let user = user_ref(&users, &payment.user, UserSummary::contact);
            let project = project_ref(&projects, &payment.project, ProjectSummary::overview);
            PaymentResponse::new(payment, user, project)
        })
        .collect())
}

pub async fn analytics(db: &MongoDB, user_id: ObjectId) -> Result<UserAnalytics, AppError> {
    let mut projects = created_projects(db, user_id).await?;
    let mut payments = completed_payments(db, user_id).await?;

    // First-seen order follows creation time
    projects.reverse();
    payments.reverse();

    Ok(compute_analytics(&projects, &payments))
}

pub async fn update_profile(
    db: &MongoDB,
    user_id: ObjectId,
    request: UpdateProfileRequest,
) -> Result<UserInfo, AppError> {
    let user = find_user(db, &user_id).await?;
    let mut set = doc! { "updated_at": now_millis() };

    if let Some(email) = request.email.as_deref().map(normalize_email).filter(|e| !e.is_empty()) {
        if email != user.email {
            if !is_valid_email(&email) {
                return Err(AppError::Validation("Please provide a valid email".into()));
            }
            let taken = db
                .users()
                .find_one(doc! { "email": &email, "_id": { "$ne": user_id } })
                .await?
                .is_some();
            if taken {
                return Err(AppError::Conflict("Email already in use".into()));
            }
            set.insert("email", email);
        }
    }
    if let Some(name) = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        set.insert("name", name);
    }
    if let Some(avatar) = request.avatar.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        set.insert("avatar", avatar);
    }

    let updated = db
        .users()
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("Email already in use".into())
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    log::info!("✅ Profile updated for user {}", user_id);
    Ok(UserInfo::from(&updated))
}

pub async fn update_password(
    db: &MongoDB,
    user_id: ObjectId,
    request: UpdatePasswordRequest,
) -> Result<(), AppError> {
    let (current, new) = match (request.current_password.as_deref(), request.new_password.as_deref()) {
        (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => (current, new),
        _ => {
            return Err(AppError::Validation(
                "Please provide current and new password".into(),
            ))
        }
    };

    let user = find_user(db, &user_id).await?;
    if !verify_password(current, &user.password)? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    validate_password(new)?;

    db.users()
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "password": hash_password(new)?, "updated_at": now_millis() } },
        )
        .await?;

    log::info!("🔐 Password updated for user {}", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn millis(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap().timestamp_millis()
    }

    fn project(category: &str, status: ProjectStatus, raised: f64, goal: f64, backers: i64, created_at: i64) -> Project {
        Project {
            id: Some(ObjectId::new()),
            title: "P".into(),
            description: "D".into(),
            long_description: None,
            category: category.into(),
            image: "https://img/p.png".into(),
            goal,
            raised,
            backers,
            days_left: 30,
            end_date: None,
            status,
            verified: false,
            featured: false,
            creator: ObjectId::new(),
            rewards: vec![],
            updates: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    fn payment(project: ObjectId, amount: f64, created_at: i64) -> Payment {
        Payment::completed(ObjectId::new(), project, amount, None, "pi_x", created_at)
    }

    fn request(status: RequestStatus) -> CampaignRequest {
        let input = crate::models::CampaignInput {
            title: "R".into(),
            description: "D".into(),
            long_description: None,
            category: "Art".into(),
            image: "https://img/r.png".into(),
            goal: 100.0,
            days_left: 5,
            featured: false,
            rewards: vec![],
        };
        let mut request = CampaignRequest::submit(input, ObjectId::new(), 0);
        request.status = status;
        request
    }

    #[test]
    fn test_stats_for_new_user_are_zero() {
        let stats = compute_user_stats(&[], &[], &[]);
        assert_eq!(stats, UserStats::default());
    }

    #[test]
    fn test_stats_aggregation() {
        let jan = millis(2026, 1, 10);
        let projects = vec![
            project("Tech", ProjectStatus::Successful, 1000.0, 800.0, 10, jan),
            project("Tech", ProjectStatus::Active, 250.0, 5000.0, 3, jan),
            project("Art", ProjectStatus::Failed, 0.0, 100.0, 0, jan),
        ];
        let backed = ObjectId::new();
        let payments = vec![payment(backed, 100.0, jan), payment(backed, 50.0, jan), payment(ObjectId::new(), 25.0, jan)];
        let requests = vec![
            request(RequestStatus::Pending),
            request(RequestStatus::Approved),
            request(RequestStatus::Approved),
            request(RequestStatus::Rejected),
        ];

        let stats = compute_user_stats(&projects, &payments, &requests);
        assert_eq!(stats.total_raised, 1250.0);
        assert_eq!(stats.total_backers, 13);
        assert_eq!(stats.projects_created, 3);
        assert_eq!(stats.success_rate, 33);
        assert_eq!(stats.total_contributed, 175.0);
        assert_eq!(stats.projects_backed, 2);
        assert_eq!(
            stats.campaign_requests,
            RequestCounts { total: 4, pending: 1, approved: 2, rejected: 1 }
        );
    }

    #[test]
    fn test_analytics_months_keep_first_seen_order() {
        let projects = vec![
            project("Tech", ProjectStatus::Active, 100.0, 1000.0, 2, millis(2026, 3, 1)),
            project("Art", ProjectStatus::Active, 50.0, 500.0, 5, millis(2026, 1, 1)),
            project("Tech", ProjectStatus::Successful, 900.0, 800.0, 4, millis(2026, 3, 20)),
        ];
        let analytics = compute_analytics(&projects, &[]);

        assert_eq!(
            analytics.funding_progress,
            vec![
                FundingPoint { month: "Mar".into(), raised: 1000.0, goal: 1800.0 },
                FundingPoint { month: "Jan".into(), raised: 50.0, goal: 500.0 },
            ]
        );
        assert_eq!(
            analytics.backer_growth,
            vec![
                BackerPoint { month: "Mar".into(), backers: 6 },
                BackerPoint { month: "Jan".into(), backers: 11 },
            ]
        );
        assert_eq!(
            analytics.category_performance,
            vec![
                CategoryPoint { category: "Tech".into(), raised: 1000.0 },
                CategoryPoint { category: "Art".into(), raised: 50.0 },
            ]
        );
    }

    #[test]
    fn test_analytics_status_drops_empty_slices() {
        let now = millis(2026, 5, 5);
        let projects = vec![
            project("Tech", ProjectStatus::Active, 0.0, 1.0, 0, now),
            project("Tech", ProjectStatus::Active, 0.0, 1.0, 0, now),
            project("Tech", ProjectStatus::Failed, 0.0, 1.0, 0, now),
        ];
        let analytics = compute_analytics(&projects, &[]);
        assert_eq!(
            analytics.project_status,
            vec![
                StatusSlice { name: "Active".into(), value: 2, color: "#10b981".into() },
                StatusSlice { name: "Failed".into(), value: 1, color: "#ef4444".into() },
            ]
        );
    }

    #[test]
    fn test_analytics_counts_contributions_per_month() {
        let project_id = ObjectId::new();
        let payments = vec![
            payment(project_id, 10.0, millis(2026, 7, 1)),
            payment(project_id, 20.0, millis(2026, 7, 30)),
            payment(project_id, 30.0, millis(2026, 8, 2)),
        ];
        let analytics = compute_analytics(&[], &payments);
        assert_eq!(
            analytics.monthly_contributions,
            vec![
                ContributionPoint { month: "Jul".into(), contributions: 2 },
                ContributionPoint { month: "Aug".into(), contributions: 1 },
            ]
        );
        assert!(analytics.funding_progress.is_empty());
        assert!(analytics.project_status.is_empty());
    }
}
