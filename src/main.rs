use routeros_client::{AppError, Config, Result, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    setup_tracing();

    let config = Config::from_env();
    if config.sessions.is_empty() {
        return Err(AppError::Config(
            "no sessions configured; set ROUTEROS_ADDRESS or SESSIONS_CONFIG".to_string(),
        ));
    }

    let commands: Vec<String> = std::env::args().skip(1).collect();
    if commands.is_empty() {
        return Err(AppError::Config(
            "no commands given; usage: routeros-client '<command>' ...".to_string(),
        ));
    }

    tracing::info!(
        "Loaded configuration for {} session(s)",
        config.sessions.len()
    );
    for session in &config.sessions {
        tracing::info!("  - Session '{}' at {}", session.name, session.address);
    }

    let mut all_ok = true;
    for session_config in &config.sessions {
        let mut session = Session::new(session_config.clone());
        let ok = session.execute(&commands).await;
        all_ok &= ok;

        let buckets = session.buckets();
        let report = serde_json::json!({
            "session": session_config.name,
            "ok": ok,
            "commands": &buckets.stdin,
            "stdout": &buckets.stdout,
            "stderr": &buckets.stderr,
            "errors": session.errors(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::error!("Failed to render report: {}", e),
        }

        session.disconnect().await;
    }

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}

fn setup_tracing() {
    // EnvFilter::try_from_default_env() honours RUST_LOG; default to "info"
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
