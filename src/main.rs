use usersdesk::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    usersdesk::init_tracing("usersdesk=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    tracing::info!(
        backend = ?app_state.config.store_backend,
        uploads = %app_state.config.upload_dir.display(),
        "state ready"
    );

    app::serve(app::build_app(app_state), &host, port).await
}
