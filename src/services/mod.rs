//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod email;
pub mod occupancy;
pub mod stats;

use std::sync::Arc;

use crate::{
    config::{CirculationConfig, EmailConfig, SeatingConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub occupancy: occupancy::OccupancyService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        circulation_config: CirculationConfig,
        seating_config: SeatingConfig,
        email_config: EmailConfig,
    ) -> AppResult<Self> {
        let mailer: Arc<dyn email::Mailer> = Arc::new(email::EmailService::new(email_config));
        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                circulation_config,
                mailer,
            ),
            occupancy: occupancy::OccupancyService::new(repository.clone(), seating_config),
            stats: stats::StatsService::new(repository.clone()),
            repository,
        })
    }
}
