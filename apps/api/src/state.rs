use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::parser_webhook::ParseNotifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// CV parser webhook. `DisabledNotifier` when no parser URL is configured.
    pub parser: Arc<dyn ParseNotifier>,
}

#[cfg(test)]
impl AppState {
    /// State whose pool and S3 client never connect unless a handler
    /// actually reaches them.
    pub fn for_tests(parser: Arc<dyn ParseNotifier>) -> Self {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
        use sqlx::postgres::PgPoolOptions;

        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .expect("lazy pool from a valid URL");
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .endpoint_url(&config.s3_endpoint)
            .force_path_style(true)
            .build();

        AppState {
            db,
            s3: S3Client::from_conf(s3_config),
            config,
            parser,
        }
    }
}
