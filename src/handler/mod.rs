/// Function handler bodies deployed behind the API
///
/// These are the behaviours the declared function runs. They are kept here so
/// the same code backs local invocation, the local emulator and the smoke check.
pub mod hello;
pub mod joke;

use serde::{Deserialize, Serialize};

pub use hello::HELLO_MESSAGE;
pub use joke::JOKES;

/// Response shape expected by an API Gateway proxy integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    /// JSON document encoded as a string
    pub body: String,
}

impl ApiResponse {
    /// Build a 200 response whose body is `payload` encoded as JSON
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        Self {
            status_code: 200,
            // Serializing plain string maps cannot fail
            body: serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

/// Which handler body the function runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HandlerVariant {
    /// Static greeting
    #[default]
    Hello,
    /// Random joke with a timestamp
    Joke,
}

impl HandlerVariant {
    /// Run the handler for one request. The event is accepted and ignored.
    pub fn invoke(&self, _event: &serde_json::Value) -> ApiResponse {
        match self {
            HandlerVariant::Hello => hello::handle(),
            HandlerVariant::Joke => joke::handle(),
        }
    }

    /// Name of the function entry point inside the code archive
    pub fn entry_point(&self) -> &'static str {
        match self {
            HandlerVariant::Hello => "hello",
            HandlerVariant::Joke => "joke",
        }
    }

    /// Variant named by a function's handler setting
    pub fn from_entry_point(handler: &str) -> Option<Self> {
        match handler.trim() {
            "hello" => Some(HandlerVariant::Hello),
            "joke" => Some(HandlerVariant::Joke),
            _ => None,
        }
    }
}

impl std::fmt::Display for HandlerVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.entry_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes_camel_case() {
        let response = ApiResponse::ok(&serde_json::json!({"message": "hi"}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"], r#"{"message":"hi"}"#);
    }

    #[test]
    fn test_invoke_ignores_event() {
        let event = serde_json::json!({"path": "/source", "httpMethod": "GET"});
        let with_event = HandlerVariant::Hello.invoke(&event);
        let without = HandlerVariant::Hello.invoke(&serde_json::Value::Null);
        assert_eq!(with_event, without);
    }

    #[test]
    fn test_entry_point_maps_back_to_variant() {
        for variant in [HandlerVariant::Hello, HandlerVariant::Joke] {
            assert_eq!(
                HandlerVariant::from_entry_point(variant.entry_point()),
                Some(variant)
            );
        }
        assert_eq!(HandlerVariant::from_entry_point("index.handler"), None);
        assert_eq!(HandlerVariant::from_entry_point(""), None);
    }

    #[test]
    fn test_variant_parses_lowercase() {
        let variant: HandlerVariant = serde_yaml::from_str("joke").unwrap();
        assert_eq!(variant, HandlerVariant::Joke);
        assert_eq!(variant.to_string(), "joke");
    }
}
