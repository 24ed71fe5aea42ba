use anyhow::Result;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tavern_api::{
    auth_routes, character_routes, participant_routes, roll_routes, session_routes,
    setup_tracing, user_routes, GlobalState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let cors = CorsLayer::very_permissive();
    let trace = TraceLayer::new_for_http();

    let state = GlobalState::new().await?;

    let app = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(session_routes())
        .merge(participant_routes())
        .merge(character_routes())
        .merge(roll_routes())
        .layer(cors)
        .layer(trace)
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .unwrap_or("3033".into())
        .parse()
        .expect("failed to convert to number");

    let listener = tokio::net::TcpListener::bind(format!(":::{port}")).await?;

    tracing::info!("LISTENING ON {port}");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
