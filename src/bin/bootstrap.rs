/// Function runtime packaged into the code archive
///
/// The runtime sets `_HANDLER` from the deployed function's handler setting,
/// which picks the body that answers every request.
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stratus::handler::{ApiResponse, HandlerVariant};

const HANDLER_ENV: &str = "_HANDLER";

fn variant_from(handler: Option<&str>) -> Result<HandlerVariant, Error> {
    let handler = handler.ok_or_else(|| format!("{} is not set", HANDLER_ENV))?;
    HandlerVariant::from_entry_point(handler)
        .ok_or_else(|| Error::from(format!("Unknown handler: {}", handler)))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "bootstrap=info".into()),
        )
        .without_time()
        .init();

    let variant = variant_from(std::env::var(HANDLER_ENV).ok().as_deref())?;
    info!("Starting {} handler", variant);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<ApiResponse, Error>(variant.invoke(&event.payload))
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_setting_selects_variant() {
        assert_eq!(variant_from(Some("hello")).unwrap(), HandlerVariant::Hello);
        assert_eq!(variant_from(Some("joke")).unwrap(), HandlerVariant::Joke);
    }

    #[test]
    fn test_unknown_or_missing_handler_rejected() {
        assert!(variant_from(None).unwrap_err().to_string().contains("_HANDLER"));
        assert!(variant_from(Some("main.handler"))
            .unwrap_err()
            .to_string()
            .contains("Unknown handler"));
    }

    #[test]
    fn test_response_shape_matches_proxy_integration() {
        let response = variant_from(Some("hello")).unwrap().invoke(&Value::Null);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert!(value["body"].as_str().unwrap().contains("Hello from API Gateway!"));
    }
}
