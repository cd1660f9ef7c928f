use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

use crate::models::{CampaignRequest, Payment, Project, User};

pub const USERS: &str = "users";
pub const PROJECTS: &str = "projects";
pub const CAMPAIGN_REQUESTS: &str = "campaign_requests";
pub const PAYMENTS: &str = "payments";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name(uri);
        let db = client.database(&db_name);

        // Test connection
        db.run_command(doc! { "ping": 1 }).await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the lookup indexes plus the unique ones the write paths rely on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, Document, Option<IndexOptions>)> = vec![
            (USERS, doc! { "email": 1 }, Some(unique())),
            (PROJECTS, doc! { "status": 1, "category": 1 }, None),
            (PROJECTS, doc! { "creator": 1 }, None),
            (CAMPAIGN_REQUESTS, doc! { "creator": 1 }, None),
            (CAMPAIGN_REQUESTS, doc! { "status": 1 }, None),
            (PAYMENTS, doc! { "user": 1 }, None),
            // At most one payment per Stripe intent/session
            (PAYMENTS, doc! { "stripe_payment_id": 1 }, Some(unique())),
        ];

        for (collection, keys, options) in indexes {
            let description = format!("{}({:?})", collection, keys.keys().collect::<Vec<_>>());
            let model = IndexModel::builder().keys(keys).options(options).build();

            match self.collection::<Document>(collection).create_index(model).await {
                Ok(_) => log::info!("   ✅ Index created: {}", description),
                Err(e) => log::warn!("   ⚠️  Index {} not created: {}", description, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    pub fn projects(&self) -> Collection<Project> {
        self.collection(PROJECTS)
    }

    pub fn campaign_requests(&self) -> Collection<CampaignRequest> {
        self.collection(CAMPAIGN_REQUESTS)
    }

    pub fn payments(&self) -> Collection<Payment> {
        self.collection(PAYMENTS)
    }
}

/// Database name from the URI path, defaulting to `CrowdFunding`
fn database_name(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("CrowdFunding")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name("mongodb://localhost:27017/FundRise"), "FundRise");
        assert_eq!(
            database_name("mongodb+srv://u:p@cluster.example.net/Crowd?retryWrites=true"),
            "Crowd"
        );
        assert_eq!(database_name("mongodb://localhost:27017"), "CrowdFunding");
        assert_eq!(database_name("mongodb://localhost:27017/?w=majority"), "CrowdFunding");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017/CrowdFundingTest".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
    }
}
