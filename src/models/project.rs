use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{end_date_after, hex_id, validate_days_left, UserRef};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Successful,
    Failed,
    Draft,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Successful => "successful",
            ProjectStatus::Failed => "failed",
            ProjectStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Milestone,
    #[default]
    Announcement,
    Media,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub delivery: String,
    #[serde(default)]
    pub backers: i64,
}

/// Timeline entry embedded in a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: UpdateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub created_at: i64,
}

impl ProjectUpdate {
    pub fn announcement(title: &str, content: String, now: i64) -> Self {
        ProjectUpdate {
            id: ObjectId::new(),
            title: title.to_string(),
            content,
            kind: UpdateKind::Announcement,
            image: None,
            video_url: None,
            created_at: now,
        }
    }
}

/// Live campaign document (collection `projects`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub category: String,
    pub image: String,
    pub goal: f64,
    #[serde(default)]
    pub raised: f64,
    #[serde(default)]
    pub backers: i64,
    pub days_left: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "default_verified")]
    pub verified: bool,
    #[serde(default)]
    pub featured: bool,
    pub creator: ObjectId,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default)]
    pub updates: Vec<ProjectUpdate>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_verified() -> bool {
    true
}

// ==================== REQUEST MODELS ====================

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct RewardInput {
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub delivery: String,
}

impl RewardInput {
    pub fn into_reward(self) -> Reward {
        Reward {
            id: ObjectId::new(),
            title: self.title,
            description: self.description,
            amount: self.amount,
            delivery: self.delivery,
            backers: 0,
        }
    }
}

/// Campaign fields shared by project creation and campaign request submission
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CampaignInput {
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    pub category: String,
    pub image: String,
    pub goal: f64,
    pub days_left: i64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rewards: Vec<RewardInput>,
}

impl CampaignInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("image", &self.image),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }
        if !(self.goal > 0.0) {
            return Err(AppError::Validation("goal must be greater than 0".into()));
        }
        validate_days_left(self.days_left)?;
        for reward in &self.rewards {
            if reward.title.trim().is_empty() || !(reward.amount > 0.0) {
                return Err(AppError::Validation(
                    "Each reward needs a title and a positive amount".into(),
                ));
            }
        }
        Ok(())
    }

    /// Builds an active project owned by `creator`, ending `days_left` days from `now`
    pub fn into_project(self, creator: ObjectId, now: i64) -> Result<Project, AppError> {
        let end_date = end_date_after(now, self.days_left)?;
        Ok(Project {
            id: None,
            title: self.title,
            description: self.description,
            long_description: self.long_description,
            category: self.category,
            image: self.image,
            goal: self.goal,
            raised: 0.0,
            backers: 0,
            days_left: self.days_left,
            end_date: Some(end_date),
            status: ProjectStatus::Active,
            verified: true,
            featured: self.featured,
            creator,
            rewards: self.rewards.into_iter().map(RewardInput::into_reward).collect(),
            updates: vec![],
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub goal: Option<f64>,
    pub days_left: Option<i64>,
    pub status: Option<ProjectStatus>,
    pub featured: Option<bool>,
    pub verified: Option<bool>,
    pub rewards: Option<Vec<RewardInput>>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct UpdateInput {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<UpdateKind>,
    pub image: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct EditUpdateInput {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<UpdateKind>,
    pub image: Option<String>,
    pub video_url: Option<String>,
}

impl EditUpdateInput {
    /// Non-empty title/content replace; image and video_url replace whenever present
    pub fn apply(self, update: &mut ProjectUpdate) {
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            update.title = title;
        }
        if let Some(content) = self.content.filter(|c| !c.trim().is_empty()) {
            update.content = content;
        }
        if let Some(kind) = self.kind {
            update.kind = kind;
        }
        if self.image.is_some() {
            update.image = self.image;
        }
        if self.video_url.is_some() {
            update.video_url = self.video_url;
        }
    }
}

// ==================== RESPONSE MODELS ====================

#[derive(Debug, Clone, Serialize)]
pub struct RewardResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub delivery: String,
    pub backers: i64,
}

impl From<&Reward> for RewardResponse {
    fn from(reward: &Reward) -> Self {
        RewardResponse {
            id: reward.id.to_hex(),
            title: reward.title.clone(),
            description: reward.description.clone(),
            amount: reward.amount,
            delivery: reward.delivery.clone(),
            backers: reward.backers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectUpdateResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub created_at: i64,
}

impl From<&ProjectUpdate> for ProjectUpdateResponse {
    fn from(update: &ProjectUpdate) -> Self {
        ProjectUpdateResponse {
            id: update.id.to_hex(),
            title: update.title.clone(),
            content: update.content.clone(),
            kind: update.kind,
            image: update.image.clone(),
            video_url: update.video_url.clone(),
            created_at: update.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub category: String,
    pub image: String,
    pub goal: f64,
    pub raised: f64,
    pub backers: i64,
    pub days_left: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    pub status: ProjectStatus,
    pub verified: bool,
    pub featured: bool,
    pub creator: UserRef,
    pub rewards: Vec<RewardResponse>,
    pub updates: Vec<ProjectUpdateResponse>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectResponse {
    pub fn new(project: Project, creator: UserRef) -> Self {
        ProjectResponse {
            id: hex_id(&project.id),
            title: project.title,
            description: project.description,
            long_description: project.long_description,
            category: project.category,
            image: project.image,
            goal: project.goal,
            raised: project.raised,
            backers: project.backers,
            days_left: project.days_left,
            end_date: project.end_date,
            status: project.status,
            verified: project.verified,
            featured: project.featured,
            creator,
            rewards: project.rewards.iter().map(RewardResponse::from).collect(),
            updates: project.updates.iter().map(ProjectUpdateResponse::from).collect(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        let creator = UserRef::id(&project.creator);
        ProjectResponse::new(project, creator)
    }
}

/// A populated project reference with the selected fields only
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raised: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

impl ProjectSummary {
    pub fn title_only(project: &Project) -> Self {
        ProjectSummary {
            id: hex_id(&project.id),
            title: project.title.clone(),
            ..Default::default()
        }
    }

    pub fn with_image(project: &Project) -> Self {
        ProjectSummary {
            image: Some(project.image.clone()),
            ..ProjectSummary::title_only(project)
        }
    }

    /// Everything the backed-projects dashboard shows
    pub fn overview(project: &Project) -> Self {
        ProjectSummary {
            id: hex_id(&project.id),
            title: project.title.clone(),
            description: Some(project.description.clone()),
            image: Some(project.image.clone()),
            category: Some(project.category.clone()),
            goal: Some(project.goal),
            raised: Some(project.raised),
            status: Some(project.status),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Populated(ProjectSummary),
    Id(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DAY_MILLIS;

    fn input() -> CampaignInput {
        CampaignInput {
            title: "Solar Lamps".into(),
            description: "Light for rural schools".into(),
            long_description: None,
            category: "Technology".into(),
            image: "https://img/solar.png".into(),
            goal: 50000.0,
            days_left: 30,
            featured: false,
            rewards: vec![RewardInput {
                title: "Thank-you card".into(),
                description: "Handwritten".into(),
                amount: 500.0,
                delivery: "Dec 2026".into(),
            }],
        }
    }

    #[test]
    fn test_into_project_sets_end_date_and_defaults() {
        let creator = ObjectId::new();
        let now = 1_700_000_000_000;
        let project = input().into_project(creator, now).unwrap();

        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.end_date, Some(now + 30 * DAY_MILLIS));
        assert_eq!(project.raised, 0.0);
        assert_eq!(project.backers, 0);
        assert!(project.verified);
        assert_eq!(project.creator, creator);
        assert_eq!(project.rewards.len(), 1);
        assert_eq!(project.rewards[0].backers, 0);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut bad = input();
        bad.title = "  ".into();
        assert_eq!(bad.validate().unwrap_err().to_string(), "title is required");

        let mut bad = input();
        bad.goal = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.days_left = 0;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.days_left = 9_000_000_000_000_000;
        assert!(bad.validate().is_err());
        assert!(matches!(
            bad.into_project(ObjectId::new(), 1_700_000_000_000),
            Err(AppError::Validation(_))
        ));

        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_edit_update_keeps_untouched_fields() {
        let mut update = ProjectUpdate::announcement("Launch", "We are live".into(), 10);
        update.image = Some("old.png".into());

        EditUpdateInput {
            title: Some("".into()),
            content: Some("Now shipping".into()),
            kind: Some(UpdateKind::Milestone),
            image: None,
            video_url: Some("https://video".into()),
        }
        .apply(&mut update);

        assert_eq!(update.title, "Launch");
        assert_eq!(update.content, "Now shipping");
        assert_eq!(update.kind, UpdateKind::Milestone);
        assert_eq!(update.image.as_deref(), Some("old.png"));
        assert_eq!(update.video_url.as_deref(), Some("https://video"));
    }

    #[test]
    fn test_update_kind_serializes_as_type() {
        let update = ProjectUpdate::announcement("T", "C".into(), 0);
        let json = serde_json::to_value(ProjectUpdateResponse::from(&update)).unwrap();
        assert_eq!(json["type"], "announcement");
    }
}
