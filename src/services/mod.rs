pub mod admin_service;
pub mod auth_service;
pub mod campaign_request_service;
pub mod checkout_service;
pub mod payment_service;
pub mod populate;
pub mod project_service;
pub mod upload_service;
pub mod user_service;
