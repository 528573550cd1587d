use inq_config::InqConfig;
use inq_db::error::DatabaseError;
use inq_db::service::InvestigationService;

/// Everything a command handler needs.
pub struct AppContext {
    pub config: InqConfig,
    pub service: InvestigationService,
}

impl AppContext {
    pub async fn init(config: InqConfig) -> Result<Self, DatabaseError> {
        if !config.database.is_persistent() {
            tracing::warn!(
                backend = ?config.database.backend,
                "store is not persistent; records are dropped when inq exits"
            );
        }
        let service = InvestigationService::from_config(&config).await?;
        Ok(Self { config, service })
    }
}
