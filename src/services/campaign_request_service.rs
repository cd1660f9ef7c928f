use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use serde::Serialize;

use crate::{
    config::AppConfig,
    database::MongoDB,
    documents::{certificate_path, CertificateData, DocumentStore},
    models::{
        hex_id, now_millis, CampaignInput, CampaignRequest, CampaignRequestResponse, ProjectResponse,
        RequestStatus, UserSummary,
    },
    services::{
        auth_service::{find_user, Claims},
        populate::{load_users, user_ref},
    },
    utils::{filename_safe, parse_object_id, AppError},
};

pub const DEFAULT_REJECTION_NOTE: &str = "Campaign request did not meet our guidelines";

#[derive(Debug, Serialize)]
pub struct ApprovalResult {
    pub campaign_request: CampaignRequestResponse,
    pub project: ProjectResponse,
    pub certificate_url: String,
    pub certificate_download_url: String,
}

/// PDF bytes plus the attachment name to serve them under
pub struct CertificateDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

async fn find_request(db: &MongoDB, id: &ObjectId) -> Result<CampaignRequest, AppError> {
    db.campaign_requests()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("Campaign request not found".into()))
}

async fn populate(
    db: &MongoDB,
    requests: Vec<CampaignRequest>,
    creator_select: Option<fn(&crate::models::User) -> UserSummary>,
) -> Result<Vec<CampaignRequestResponse>, AppError> {
    let mut ids: Vec<ObjectId> = requests.iter().filter_map(|r| r.reviewed_by).collect();
    if creator_select.is_some() {
        ids.extend(requests.iter().map(|r| r.creator));
    }
    let users = load_users(db, ids).await?;

    Ok(requests
        .into_iter()
        .map(|request| {
            let creator = match creator_select {
                Some(select) => user_ref(&users, &request.creator, select),
                None => crate::models::UserRef::id(&request.creator),
            };
            let reviewed_by = request
                .reviewed_by
                .as_ref()
                .map(|id| user_ref(&users, id, UserSummary::contact));
            CampaignRequestResponse::new(request, creator, reviewed_by)
        })
        .collect())
}

pub async fn submit(
    db: &MongoDB,
    creator: ObjectId,
    input: CampaignInput,
) -> Result<CampaignRequestResponse, AppError> {
    input.validate()?;

    let mut request = CampaignRequest::submit(input, creator, now_millis());
    let result = db.campaign_requests().insert_one(&request).await?;
    request.id = result.inserted_id.as_object_id();

    log::info!("📨 Campaign request submitted: {} by {}", request.title, creator);

    Ok(CampaignRequestResponse::from(request))
}

/// The caller's requests, newest first
pub async fn my_requests(db: &MongoDB, creator: ObjectId) -> Result<Vec<CampaignRequestResponse>, AppError> {
    let requests: Vec<CampaignRequest> = db
        .campaign_requests()
        .find(doc! { "creator": creator })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    populate(db, requests, None).await
}

pub async fn all_requests(
    db: &MongoDB,
    status: Option<&str>,
) -> Result<Vec<CampaignRequestResponse>, AppError> {
    let mut filter = Document::new();
    if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
        let status: RequestStatus = status.parse()?;
        filter.insert("status", status.as_str());
    }

    let requests: Vec<CampaignRequest> = db
        .campaign_requests()
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    populate(db, requests, Some(UserSummary::full)).await
}

pub async fn get_request(
    db: &MongoDB,
    claims: &Claims,
    id: &str,
) -> Result<CampaignRequestResponse, AppError> {
    let id = parse_object_id(id, "campaign request")?;
    let request = find_request(db, &id).await?;

    if !request.is_created_by(&claims.user_id()?) && !claims.is_admin() {
        return Err(AppError::Forbidden("Not authorized to view this request".into()));
    }

    let mut populated = populate(db, vec![request], Some(UserSummary::full)).await?;
    populated
        .pop()
        .ok_or_else(|| AppError::NotFound("Campaign request not found".into()))
}

/// Approves a pending request: creates its project, flips the status with a
/// compare-and-set on `pending`, then issues the certificate
pub async fn approve(
    db: &MongoDB,
    config: &AppConfig,
    store: &DocumentStore,
    reviewer: ObjectId,
    id: &str,
    admin_notes: Option<String>,
) -> Result<ApprovalResult, AppError> {
    let id = parse_object_id(id, "campaign request")?;
    let request = find_request(db, &id).await?;
    request.ensure_pending()?;

    let creator = find_user(db, &request.creator).await?;

    let now = now_millis();
    let mut project = request.to_project(now)?;
    let inserted = db.projects().insert_one(&project).await?;
    project.id = inserted.inserted_id.as_object_id();
    let project_id = project.id;

    let certificate_url = certificate_path(&id.to_hex());
    let mut set = doc! {
        "status": RequestStatus::Approved.as_str(),
        "reviewed_by": reviewer,
        "reviewed_at": now,
        "certificate_url": &certificate_url,
        "updated_at": now,
    };
    if let Some(notes) = admin_notes {
        set.insert("admin_notes", notes);
    }

    let updated = db
        .campaign_requests()
        .find_one_and_update(
            doc! { "_id": id, "status": RequestStatus::Pending.as_str() },
            doc! { "$set": set },
        )
        .return_document(ReturnDocument::After)
        .await;

    let updated = match updated {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            // Another reviewer got there first
            rollback_project(db, project_id).await;
            let current = find_request(db, &id).await?;
            return Err(AppError::Conflict(format!(
                "Campaign request has already been {}",
                current.status
            )));
        }
        Err(e) => {
            rollback_project(db, project_id).await;
            return Err(e.into());
        }
    };

    // Only the reviewer who won the status flip renders the certificate
    let certificate = CertificateData {
        request_id: id.to_hex(),
        creator_name: creator.name.clone(),
        campaign_title: request.title.clone(),
        category: request.category.clone(),
        goal: request.goal,
        approved_at: Utc.timestamp_millis_opt(now).single().unwrap_or_else(Utc::now),
    };
    if let Err(e) = store.save_certificate(certificate).await {
        reopen_request(db, &id, reviewer, now).await;
        rollback_project(db, project_id).await;
        return Err(e);
    }

    log::info!(
        "✅ Campaign request {} approved, project {} created",
        id,
        hex_id(&project_id)
    );

    let mut users = load_users(db, [reviewer]).await?;
    let reviewed_by = Some(user_ref(&users, &reviewer, UserSummary::contact));
    users.insert(request.creator, creator);
    let creator_ref = user_ref(&users, &request.creator, UserSummary::contact);

    Ok(ApprovalResult {
        campaign_request: CampaignRequestResponse::new(updated, creator_ref, reviewed_by),
        project: ProjectResponse::from(project),
        certificate_url,
        certificate_download_url: config.certificate_download_url(&id.to_hex()),
    })
}

/// Puts an approval this reviewer just made back to pending
async fn reopen_request(db: &MongoDB, id: &ObjectId, reviewer: ObjectId, reviewed_at: i64) {
    let result = db
        .campaign_requests()
        .update_one(
            doc! {
                "_id": id,
                "status": RequestStatus::Approved.as_str(),
                "reviewed_by": reviewer,
                "reviewed_at": reviewed_at,
            },
            doc! {
                "$set": { "status": RequestStatus::Pending.as_str(), "updated_at": now_millis() },
                "$unset": { "reviewed_by": "", "reviewed_at": "", "certificate_url": "", "admin_notes": "" },
            },
        )
        .await;
    match result {
        Ok(_) => log::warn!("↩️  Campaign request {} reopened after failed certificate", id),
        Err(e) => log::error!("❌ Failed to reopen campaign request {}: {}", id, e),
    }
}

async fn rollback_project(db: &MongoDB, project_id: Option<ObjectId>) {
    let Some(project_id) = project_id else {
        return;
    };
    match db.projects().delete_one(doc! { "_id": project_id }).await {
        Ok(_) => log::warn!("↩️  Rolled back project {} after failed approval", project_id),
        Err(e) => log::error!("❌ Failed to roll back project {}: {}", project_id, e),
    }
}

pub async fn reject(
    db: &MongoDB,
    reviewer: ObjectId,
    id: &str,
    admin_notes: Option<String>,
) -> Result<CampaignRequestResponse, AppError> {
    let id = parse_object_id(id, "campaign request")?;
    let request = find_request(db, &id).await?;
    request.ensure_pending()?;

    let now = now_millis();
    let notes = admin_notes
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string());

    let updated = db
        .campaign_requests()
        .find_one_and_update(
            doc! { "_id": id, "status": RequestStatus::Pending.as_str() },
            doc! { "$set": {
                "status": RequestStatus::Rejected.as_str(),
                "admin_notes": notes,
                "reviewed_by": reviewer,
                "reviewed_at": now,
                "updated_at": now,
            } },
        )
        .return_document(ReturnDocument::After)
        .await?;

    match updated {
        Some(updated) => {
            log::info!("🚫 Campaign request {} rejected", id);
            Ok(CampaignRequestResponse::from(updated))
        }
        None => {
            let current = find_request(db, &id).await?;
            Err(AppError::Conflict(format!(
                "Campaign request has already been {}",
                current.status
            )))
        }
    }
}

pub async fn delete(db: &MongoDB, claims: &Claims, id: &str) -> Result<(), AppError> {
    let id = parse_object_id(id, "campaign request")?;
    let request = find_request(db, &id).await?;

    let is_creator = request.is_created_by(&claims.user_id()?);
    let is_admin = claims.is_admin();

    if !is_creator && !is_admin {
        return Err(AppError::Forbidden("Not authorized to delete this request".into()));
    }
    if !is_admin && request.status != RequestStatus::Pending {
        return Err(AppError::Conflict("You can only delete pending requests".into()));
    }

    db.campaign_requests().delete_one(doc! { "_id": id }).await?;
    log::info!("🗑️  Campaign request {} deleted", id);
    Ok(())
}

pub async fn certificate(
    db: &MongoDB,
    store: &DocumentStore,
    claims: &Claims,
    id: &str,
) -> Result<CertificateDownload, AppError> {
    let id = parse_object_id(id, "campaign request")?;
    let request = find_request(db, &id).await?;

    if request.status != RequestStatus::Approved {
        return Err(AppError::Validation(
            "Certificate is only available for approved campaigns".into(),
        ));
    }
    let certificate_url = request
        .certificate_url
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Certificate not generated yet".into()))?;

    if !request.is_created_by(&claims.user_id()?) && !claims.is_admin() {
        return Err(AppError::Forbidden("Not authorized to view this certificate".into()));
    }

    let creator_name = match find_user(db, &request.creator).await {
        Ok(user) => user.name,
        Err(_) => "Creator".to_string(),
    };

    Ok(CertificateDownload {
        filename: format!("FundRise_Certificate_{}.pdf", filename_safe(&creator_name)),
        bytes: store.read(certificate_url).await?,
    })
}
