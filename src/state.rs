use std::sync::Arc;

use crate::{
    clients::{ai::AiClient, mailer::Mailer, rates::RateCache, stripe::StripeClient},
    config::AppConfig,
    db::DbPool,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub stripe: Arc<StripeClient>,
    pub rates: Arc<RateCache>,
    pub mailer: Arc<Mailer>,
    pub ai: Arc<AiClient>,
}
