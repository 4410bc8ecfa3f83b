use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use crate::config::Config;
use crate::intelligence::backends::BackendRegistry;
use crate::intelligence::classifier::ClassifierSettings;
use crate::matching::store::MatchStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Match log. Production: `PgMatchStore` over the connection pool.
    pub store: Arc<dyn MatchStore>,
    pub s3: S3Client,
    pub backends: BackendRegistry,
    pub classifier: ClassifierSettings,
    pub config: Config,
}
