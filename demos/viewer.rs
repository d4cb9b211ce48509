use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vms_events::config::SETTINGS_FILE;
use vms_events::identity::request_token;
use vms_events::{
    ClientOptions, RestNameResolver, Settings, Supervisor, SupervisorConfig, ViewerMode,
    WsConnector, viewer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let program = std::env::args().next().unwrap_or_else(|| "viewer".to_string());
    let mode = match std::env::args().nth(1) {
        Some(arg) => match ViewerMode::from_str(&arg) {
            Ok(mode) => mode,
            Err(_) => {
                println!("Usage: {} [eventviewer|stateviewer]", program);
                return Ok(());
            }
        },
        None => ViewerMode::EventViewer,
    };

    let Ok(password) = std::env::var("VMS_PASSWORD") else {
        println!("Set VMS_PASSWORD to log in.");
        println!(
            "Gateway and user come from VMS_API_GATEWAY / VMS_USERNAME or {}",
            SETTINGS_FILE
        );
        return Ok(());
    };

    let settings = Settings::from_env_or_file(SETTINGS_FILE)?;
    let options = ClientOptions::default()
        .with_verify_tls(std::env::var("VMS_VERIFY_TLS").map_or(true, |v| v != "0"));

    println!("Logging in to {} as {}...", settings.api_gateway, settings.username);
    let token = request_token(&options.http_client()?, &settings, &password).await?;
    settings.save(SETTINGS_FILE)?;

    let names = Arc::new(RestNameResolver::new(
        &settings.api_gateway,
        &token.access_token,
        &options,
    )?);
    let connector = WsConnector::for_gateway(&settings.api_gateway, &token.access_token)?;
    let mut sink = viewer(mode, names, std::io::stdout(), true);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let mut supervisor = Supervisor::new(connector, SupervisorConfig::for_mode(mode));
    let resume = supervisor.run(sink.as_mut(), &cancel).await;

    println!();
    println!(
        "Stopped {}. Session {} resumable from event {}",
        mode.as_ref(),
        resume.session_id,
        resume.last_event_id
    );
    Ok(())
}
