#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use lights_out::utils::logger;
#[cfg(feature = "lambda")]
use lights_out::InvocationContext;
#[cfg(feature = "lambda")]
use serde::Serialize;

#[cfg(feature = "lambda")]
#[derive(Serialize)]
pub struct Response {
    pub message: String,
}

/// Event-triggered entry point. The payload is opaque; polling continues in
/// the background after the response is returned, for as long as the Lambda
/// sandbox stays alive.
#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<serde_json::Value>) -> Result<Response, Error> {
    tracing::info!("Starting lights-out Lambda function");

    let payload = serde_json::to_vec(&event.payload)?;
    let ctx = InvocationContext::from_env();
    let _detached = ctx
        .handle_event(&payload)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    tracing::info!("Poller started");
    Ok(Response {
        message: "OK".to_string(),
    })
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
