use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{end_date_after, hex_id, CampaignInput, Project, ProjectStatus, Reward, RewardResponse, UserRef};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(AppError::Validation(format!("Invalid status: {}", other))),
        }
    }
}

/// A proposal awaiting admin review (collection `campaign_requests`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub category: String,
    pub image: String,
    pub goal: f64,
    pub days_left: i64,
    #[serde(default)]
    pub featured: bool,
    pub creator: ObjectId,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CampaignRequest {
    pub fn submit(input: CampaignInput, creator: ObjectId, now: i64) -> Self {
        CampaignRequest {
            id: None,
            title: input.title,
            description: input.description,
            long_description: input.long_description,
            category: input.category,
            image: input.image,
            goal: input.goal,
            days_left: input.days_left,
            featured: input.featured,
            creator,
            rewards: input.rewards.into_iter().map(|r| r.into_reward()).collect(),
            status: RequestStatus::Pending,
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            certificate_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only pending requests can be reviewed
    pub fn ensure_pending(&self) -> Result<(), AppError> {
        if self.status == RequestStatus::Pending {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Campaign request has already been {}",
                self.status
            )))
        }
    }

    pub fn is_created_by(&self, user_id: &ObjectId) -> bool {
        &self.creator == user_id
    }

    /// The live project an approval creates: active, verified, fresh reward ids
    pub fn to_project(&self, now: i64) -> Result<Project, AppError> {
        let end_date = end_date_after(now, self.days_left)?;
        Ok(Project {
            id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            long_description: self.long_description.clone(),
            category: self.category.clone(),
            image: self.image.clone(),
            goal: self.goal,
            raised: 0.0,
            backers: 0,
            days_left: self.days_left,
            end_date: Some(end_date),
            status: ProjectStatus::Active,
            verified: true,
            featured: self.featured,
            creator: self.creator,
            rewards: self
                .rewards
                .iter()
                .map(|r| Reward {
                    id: ObjectId::new(),
                    backers: 0,
                    ..r.clone()
                })
                .collect(),
            updates: vec![],
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ReviewRequest {
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignRequestResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub category: String,
    pub image: String,
    pub goal: f64,
    pub days_left: i64,
    pub featured: bool,
    pub creator: UserRef,
    pub rewards: Vec<RewardResponse>,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CampaignRequestResponse {
    pub fn new(request: CampaignRequest, creator: UserRef, reviewed_by: Option<UserRef>) -> Self {
        CampaignRequestResponse {
            id: hex_id(&request.id),
            title: request.title,
            description: request.description,
            long_description: request.long_description,
            category: request.category,
            image: request.image,
            goal: request.goal,
            days_left: request.days_left,
            featured: request.featured,
            creator,
            rewards: request.rewards.iter().map(RewardResponse::from).collect(),
            status: request.status,
            admin_notes: request.admin_notes,
            reviewed_by,
            reviewed_at: request.reviewed_at,
            certificate_url: request.certificate_url,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

impl From<CampaignRequest> for CampaignRequestResponse {
    fn from(request: CampaignRequest) -> Self {
        let creator = UserRef::id(&request.creator);
        let reviewed_by = request.reviewed_by.as_ref().map(UserRef::id);
        CampaignRequestResponse::new(request, creator, reviewed_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RewardInput, DAY_MILLIS};

    fn pending_request() -> CampaignRequest {
        let input = CampaignInput {
            title: "Community Library".into(),
            description: "Books for everyone".into(),
            long_description: Some("A long story".into()),
            category: "Education".into(),
            image: "https://img/library.png".into(),
            goal: 120000.0,
            days_left: 45,
            featured: true,
            rewards: vec![RewardInput {
                title: "Bookmark".into(),
                description: "Printed bookmark".into(),
                amount: 250.0,
                delivery: "Jan 2027".into(),
            }],
        };
        let mut request = CampaignRequest::submit(input, ObjectId::new(), 1_000);
        request.id = Some(ObjectId::new());
        request
    }

    #[test]
    fn test_submit_starts_pending() {
        let request = pending_request();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.reviewed_by.is_none());
        assert!(request.ensure_pending().is_ok());
    }

    #[test]
    fn test_approving_a_pending_request_yields_one_matching_project() {
        let request = pending_request();
        let now = 5_000;
        let project = request.to_project(now).unwrap();

        assert!(project.id.is_none());
        assert_eq!(project.title, request.title);
        assert_eq!(project.creator, request.creator);
        assert_eq!(project.goal, request.goal);
        assert_eq!(project.featured, request.featured);
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.end_date, Some(now + 45 * DAY_MILLIS));
        assert_eq!(project.rewards.len(), 1);
        assert_ne!(project.rewards[0].id, request.rewards[0].id);
        assert_eq!(project.rewards[0].title, "Bookmark");
    }

    #[test]
    fn test_stored_request_with_huge_duration_is_not_approvable() {
        let mut request = pending_request();
        request.days_left = 9_000_000_000_000_000;
        assert!(matches!(request.to_project(5_000), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_reviewed_requests_cannot_be_reviewed_again() {
        let mut request = pending_request();
        request.status = RequestStatus::Approved;
        let err = request.ensure_pending().unwrap_err();
        assert_eq!(err.to_string(), "Campaign request has already been approved");

        request.status = RequestStatus::Rejected;
        assert!(request.ensure_pending().is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert!("archived".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_response_uses_hex_ids() {
        let request = pending_request();
        let creator_hex = request.creator.to_hex();
        let json = serde_json::to_value(CampaignRequestResponse::from(request)).unwrap();
        assert_eq!(json["creator"], creator_hex);
        assert_eq!(json["status"], "pending");
        assert!(json.get("reviewed_by").is_none());
    }
}
