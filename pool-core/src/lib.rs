use serde::{Deserialize, Serialize};

/// Payload a backend instance posts to the proxy's `/register` route when it
/// comes up. The URL is the instance's own base address, scheme included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
}

impl RegisterRequest {
    pub fn new(url: impl Into<String>) -> Self {
        RegisterRequest { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_wire_shape() {
        let req = RegisterRequest::new("http://localhost:8081");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"url":"http://localhost:8081"}"#);

        let parsed: RegisterRequest = serde_json::from_str(r#"{"url":"http://localhost:8082"}"#).unwrap();
        assert_eq!(parsed.url, "http://localhost:8082");
    }
}
