/// Installs the global tracing subscriber. `LOG_FORMAT=json` selects JSON lines.
pub fn init() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "closeknit=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
