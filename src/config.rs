use std::env;
use std::path::PathBuf;

/// JWT signing settings shared by the auth service and middleware
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expire_days: i64,
}

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct CloudinarySettings {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub email: String,
    pub password: String,
}

/// Runtime configuration, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub frontend_url: String,
    pub backend_url: String,
    pub documents_dir: PathBuf,
    pub jwt: JwtSettings,
    pub stripe: StripeSettings,
    pub cloudinary: CloudinarySettings,
    pub admin: AdminSettings,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = var_or("PORT", "5000").parse::<u16>().unwrap_or_else(|_| {
            log::warn!("⚠️  Invalid PORT value, falling back to 5000");
            5000
        });

        let expire_days = var_or("JWT_EXPIRE_DAYS", "7").parse::<i64>().unwrap_or(7);

        AppConfig {
            host: var_or("HOST", "0.0.0.0"),
            port,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017/CrowdFunding"),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            backend_url: var_or("BACKEND_URL", &format!("http://localhost:{}", port)),
            documents_dir: PathBuf::from(var_or("DOCUMENTS_DIR", ".")),
            jwt: JwtSettings {
                secret: var_or("JWT_SECRET", "default-secret-change-me"),
                issuer: var_or("JWT_ISSUER", "fundrise-api"),
                audience: var_or("JWT_AUDIENCE", "fundrise-web"),
                expire_days,
            },
            stripe: StripeSettings {
                secret_key: optional_var("STRIPE_SECRET_KEY"),
                webhook_secret: optional_var("STRIPE_WEBHOOK_SECRET"),
                api_base: var_or("STRIPE_API_BASE", "https://api.stripe.com"),
                currency: var_or("STRIPE_CURRENCY", "inr").to_lowercase(),
            },
            cloudinary: CloudinarySettings {
                cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
                api_key: optional_var("CLOUDINARY_API_KEY"),
                api_secret: optional_var("CLOUDINARY_API_SECRET"),
            },
            admin: AdminSettings {
                email: var_or("ADMIN_EMAIL", "admin@fundrise.com").to_lowercase(),
                password: var_or("ADMIN_PASSWORD", "Admin@123"),
            },
        }
    }

    /// Public URL the receipt for `payment_id` can be downloaded from
    pub fn receipt_download_url(&self, payment_id: &str) -> String {
        format!("{}/api/payments/receipt/{}", self.backend_url.trim_end_matches('/'), payment_id)
    }

    pub fn certificate_download_url(&self, request_id: &str) -> String {
        format!(
            "{}/api/campaign-requests/certificate/{}",
            self.backend_url.trim_end_matches('/'),
            request_id
        )
    }

    /// Logs which integrations are configured, never the secrets themselves
    pub fn log_summary(&self) {
        log::info!("🌐 Frontend URL: {}", self.frontend_url);
        log::info!(
            "🔑 Stripe Key: {}",
            if self.stripe.secret_key.is_some() { "✅ Loaded" } else { "❌ Missing" }
        );
        log::info!(
            "🪝 Stripe webhook secret: {}",
            if self.stripe.webhook_secret.is_some() { "✅ Loaded" } else { "⚠️  Missing (signatures not verified)" }
        );
        log::info!(
            "☁️  Cloudinary: {}",
            if self.cloudinary.cloud_name.is_some()
                && self.cloudinary.api_key.is_some()
                && self.cloudinary.api_secret.is_some()
            {
                "✅ Configured"
            } else {
                "❌ NOT SET"
            }
        );
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 5000,
        mongodb_uri: "mongodb://localhost:27017/CrowdFundingTest".into(),
        frontend_url: "http://localhost:5173".into(),
        backend_url: "http://localhost:5000/".into(),
        documents_dir: std::env::temp_dir().join("fundrise-test-docs"),
        jwt: JwtSettings {
            secret: "test-secret".into(),
            issuer: "fundrise-api".into(),
            audience: "fundrise-web".into(),
            expire_days: 7,
        },
        stripe: StripeSettings {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".into(),
            currency: "inr".into(),
        },
        cloudinary: CloudinarySettings {
            cloud_name: None,
            api_key: None,
            api_secret: None,
        },
        admin: AdminSettings {
            email: "admin@fundrise.com".into(),
            password: "Admin@123".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_urls_trim_trailing_slash() {
        let config = test_config();
        assert_eq!(
            config.receipt_download_url("abc"),
            "http://localhost:5000/api/payments/receipt/abc"
        );
        assert_eq!(
            config.certificate_download_url("def"),
            "http://localhost:5000/api/campaign-requests/certificate/def"
        );
    }
}
