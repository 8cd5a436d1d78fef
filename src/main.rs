//! board-realtime - listens to a board and the user's notification channel
//! and logs every event it receives.

use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Value;

use board_realtime::adapters::pusher::{
    HttpAuthorizerConfig, HttpChannelAuthorizer, PusherTransport, SigningChannelAuthorizer,
};
use board_realtime::application::RealtimeContext;
use board_realtime::config::AppConfig;
use board_realtime::domain::realtime::{EventName, RealtimeEvent};
use board_realtime::ports::{AuthorizationError, ChannelAuthorizer};
use board_realtime::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(&config.logging) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let authorizer = match build_authorizer(&config) {
        Ok(authorizer) => authorizer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build channel authorizer");
            return ExitCode::FAILURE;
        }
    };

    let transport = Arc::new(PusherTransport::start(
        config.pusher.clone(),
        config.channels.formatter(),
        Some(authorizer),
    ));
    let context = RealtimeContext::new(transport.clone(), &config.channels, config.logging.mode());

    for name in EventName::ALL {
        context.define(name, move |payload| log_event(name, payload));
    }

    context.boot(config.session.user_id.as_ref());
    context.subscribe_to_board(config.session.board_id.as_ref().map(|id| id.as_str()));

    tracing::info!(
        user_id = ?config.session.user_id,
        board_id = ?config.session.board_id,
        "Listening for events, press Ctrl-C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }

    context.teardown();
    if let Err(e) = transport.shutdown().await {
        tracing::warn!(error = %e, "Transport did not shut down cleanly");
    }
    ExitCode::SUCCESS
}

/// Signs locally when the app secret is known, otherwise asks the backend.
fn build_authorizer(config: &AppConfig) -> Result<Arc<dyn ChannelAuthorizer>, AuthorizationError> {
    if let Some(secret) = config.pusher.app_secret() {
        tracing::debug!("Signing private channels with the app secret");
        return Ok(Arc::new(SigningChannelAuthorizer::new(
            config.pusher.app_key.clone(),
            secrecy::Secret::new(secret.to_string()),
        )));
    }

    let mut http = HttpAuthorizerConfig::new(config.pusher.auth_endpoint.clone());
    if let Some(token) = &config.pusher.auth_token {
        http = http.with_token(token.clone());
    }
    Ok(Arc::new(HttpChannelAuthorizer::new(http)?))
}

fn log_event(name: EventName, payload: &Value) {
    match RealtimeEvent::decode(name, payload) {
        Ok(RealtimeEvent::CardMoved(card)) => tracing::info!(
            post_id = card.post_id,
            column_id = card.new_column_id,
            title = %card.title,
            assignee = %card.assignee_name,
            "Card moved"
        ),
        Ok(RealtimeEvent::TestBroadcast(test)) => tracing::info!(
            message = %test.message,
            server_timestamp = test.server_timestamp,
            "Test broadcast"
        ),
        Ok(event) => {
            if let Some(notification) = event.notification() {
                tracing::info!(
                    event = %name,
                    id = notification.id,
                    kind = %notification.kind,
                    content = %notification.content,
                    "Notification received"
                );
            }
        }
        Err(e) => tracing::warn!(event = %name, error = %e, payload = %payload, "Undecodable payload"),
    }
}
