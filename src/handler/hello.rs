/// Static greeting handler
use serde::{Deserialize, Serialize};

use super::ApiResponse;

pub const HELLO_MESSAGE: &str = "Hello from API Gateway!";

/// Body of the greeting response
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelloBody {
    pub message: String,
}

pub fn handle() -> ApiResponse {
    ApiResponse::ok(&HelloBody {
        message: HELLO_MESSAGE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_status_and_body() {
        let response = handle();
        assert_eq!(response.status_code, 200);

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["message"], HELLO_MESSAGE);
    }

    #[test]
    fn test_hello_body_is_strict() {
        let response = handle();
        assert!(serde_json::from_str::<HelloBody>(&response.body).is_ok());
        assert!(serde_json::from_str::<HelloBody>(r#"{"message":"x","extra":1}"#).is_err());
    }
}
