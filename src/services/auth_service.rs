use crate::{
    config::JwtSettings,
    database::MongoDB,
    models::{now_millis, Role, User, UserInfo},
    utils::{is_duplicate_key, parse_object_id, AppError},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use mongodb::bson::{doc, oid::ObjectId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid");
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex ObjectId)
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Invalid token subject".into()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    Ok(verify(password, hashed)?)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

// Generate JWT token
pub fn generate_jwt(user: &User, settings: &JwtSettings) -> Result<String, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("Cannot issue a token for an unsaved user".into()))?;

    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_hex(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(settings.expire_days)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: settings.audience.clone(),
        iss: settings.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str, settings: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);
    validation.set_issuer(&[settings.issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Not authorized, token failed: {}", e)))
}

// User registration
pub async fn register(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Valid email is required".into()));
    }
    validate_password(&request.password)?;

    let collection = db.users();

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let now = now_millis();
    let mut user = User {
        id: None,
        name: name.to_string(),
        email: email.clone(),
        password: hash_password(&request.password)?,
        role: Role::User,
        avatar: None,
        created_at: now,
        updated_at: now,
    };

    let result = collection.insert_one(&user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("User already exists".into())
        } else {
            AppError::Database(e)
        }
    })?;
    user.id = result.inserted_id.as_object_id();

    let token = generate_jwt(&user, settings)?;

    log::info!("✅ User registered successfully: {}", email);

    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(&user),
    })
}

// User login
pub async fn login(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Valid email is required".into()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }

    let user = db
        .users()
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = generate_jwt(&user, settings)?;

    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(&user),
    })
}

pub async fn find_user(db: &MongoDB, user_id: &ObjectId) -> Result<User, AppError> {
    db.users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let id = parse_object_id(user_id, "user")?;
    let user = find_user(db, &id).await?;
    Ok(UserInfo::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "unit-test-secret".into(),
            issuer: "fundrise-api".into(),
            audience: "fundrise-web".into(),
            expire_days: 7,
        }
    }

    fn saved_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password: String::new(),
            role,
            avatar: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = saved_user(Role::Admin);
        let token = generate_jwt(&user, &settings()).unwrap();
        let claims = verify_token(&token, &settings()).unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, "ravi@example.com");
        assert!(claims.is_admin());
        assert_eq!(claims.user_id().unwrap(), user.id.unwrap());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_rejects_wrong_secret_and_audience() {
        let user = saved_user(Role::User);
        let token = generate_jwt(&user, &settings()).unwrap();

        let mut wrong_secret = settings();
        wrong_secret.secret = "other".into();
        assert!(verify_token(&token, &wrong_secret).is_err());

        let mut wrong_audience = settings();
        wrong_audience.audience = "someone-else".into();
        assert!(matches!(
            verify_token(&token, &wrong_audience),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_unsaved_user_gets_no_token() {
        let mut user = saved_user(Role::User);
        user.id = None;
        assert!(generate_jwt(&user, &settings()).is_err());
    }

    #[test]
    fn test_password_hash_verifies() {
        let hashed = bcrypt::hash("secret123", 4).unwrap();
        assert!(verify_password("secret123", &hashed).unwrap());
        assert!(!verify_password("secret124", &hashed).unwrap());
    }

    #[test]
    fn test_email_and_password_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("spaces in@b.co"));
        assert_eq!(normalize_email("  Mixed@Case.COM "), "mixed@case.com");

        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
