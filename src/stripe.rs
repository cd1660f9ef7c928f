//! Stripe over its REST API: PaymentIntents, Checkout Sessions and webhook verification.

pub mod client;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use types::*;
