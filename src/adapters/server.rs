use crate::app::{InvocationContext, RequestReply};
use crate::utils::error::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;

impl IntoResponse for RequestReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, self.body).into_response()
    }
}

/// Routes `GET /` and `POST /` to the request-triggered entry point. Request
/// bodies are ignored.
pub fn router(ctx: InvocationContext) -> Router {
    Router::new()
        .route("/", get(turn_off_light).post(turn_off_light))
        .with_state(ctx)
}

async fn turn_off_light(State(ctx): State<InvocationContext>) -> RequestReply {
    tracing::info!("🔔 Received turn-off request");
    ctx.handle_request().await
}

pub async fn serve(addr: SocketAddr, ctx: InvocationContext) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}
