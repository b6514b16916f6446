use anyhow::Context;
use closeknit::{digest, state::AppState, telemetry};
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let state = AppState::init().await.context("init state")?;
    let sent = digest::send_weekly_digest(&state, &digest::TracingMailer, OffsetDateTime::now_utc())
        .await
        .context("send weekly digest")?;
    tracing::info!(sent, "done");
    Ok(())
}
