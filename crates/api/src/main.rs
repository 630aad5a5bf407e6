use anyhow::Context;
use chrono::Duration;

use tessera_api::app::{self, services};
use tessera_api::config::ApiConfig;
use tessera_auth::Hs256Jwt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tessera_observability::init();

    let config = ApiConfig::from_env()?;
    let (store, demo) = services::build_store(&config).await?;

    if let Some(demo) = demo {
        let jwt = Hs256Jwt::new(&config.jwt_secret);
        let token = services::mint_access_token(
            &jwt,
            demo.user_id,
            demo.tenant_id,
            &demo.email,
            &demo.grants,
            Duration::minutes(config.token_ttl_minutes),
        )?;
        tracing::info!(
            tenant_id = %demo.tenant_id,
            user_id = %demo.user_id,
            token = %token,
            "demo tenant ready"
        );
    }

    let app = app::build_app(&config.jwt_secret, store);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
