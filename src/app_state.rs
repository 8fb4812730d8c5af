use crate::{config::Config, error::AppResult, social_interface::SocialInterface};

#[derive(Clone)]
pub struct AppState {
    pub social: SocialInterface,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        // Store, object storage and services all come from the same config
        let social = SocialInterface::from_config(&config).await?;

        Ok(Self { social, config })
    }
}
