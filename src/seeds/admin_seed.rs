use crate::config::AdminSettings;
use crate::database::MongoDB;
use crate::models::{now_millis, Role, User};
use crate::services::auth_service;
use mongodb::bson::doc;

/// Creates the default admin account when no user holds `ADMIN_EMAIL`.
/// An existing account is left untouched, whatever its role.
pub async fn seed_default_admin(db: &MongoDB, admin: &AdminSettings) {
    let collection = db.users();

    match collection.find_one(doc! { "email": &admin.email }).await {
        Ok(Some(_)) => {
            log::info!("👑 Admin account {} already exists, skipping seed", admin.email);
            return;
        }
        Ok(None) => {}
        Err(e) => {
            log::error!("   ❌ Failed to look up admin account: {}", e);
            return;
        }
    }

    let password = match auth_service::hash_password(&admin.password) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("   ❌ Failed to hash admin password: {}", e);
            return;
        }
    };

    let now = now_millis();
    let user = User {
        id: None,
        name: "Admin".into(),
        email: admin.email.clone(),
        password,
        role: Role::Admin,
        avatar: None,
        created_at: now,
        updated_at: now,
    };

    match collection.insert_one(&user).await {
        Ok(_) => {
            log::info!("✅ Default admin user created");
            log::info!("📧 Admin Email: {}", admin.email);
        }
        Err(e) => log::error!("   ❌ Failed to create default admin: {}", e),
    }
}
