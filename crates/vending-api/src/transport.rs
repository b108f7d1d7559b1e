use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ApiError, Result};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

// ─── ClientSettings ───────────────────────────────────────────────────────

/// HTTP settings shared by the catalog and directory clients.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer …` when set. Request signing is the
    /// job of whatever sits in front of the endpoint.
    pub bearer_token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("vending/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            bearer_token: None,
        }
    }
}

// ─── JsonTransport ────────────────────────────────────────────────────────

/// JSON 1.1 RPC transport: every operation is a POST to the service endpoint
/// with the operation named in `X-Amz-Target`.
#[derive(Debug, Clone)]
pub(crate) struct JsonTransport {
    http: reqwest::Client,
    endpoint: String,
    target_prefix: &'static str,
    bearer_token: Option<String>,
}

#[derive(Deserialize)]
struct ServiceFault {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl JsonTransport {
    pub(crate) fn new(
        endpoint: impl Into<String>,
        target_prefix: &'static str,
        settings: &ClientSettings,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            target_prefix,
            bearer_token: settings.bearer_token.clone(),
        })
    }

    pub(crate) async fn call<Req, Resp>(&self, operation: &'static str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        tracing::debug!(operation, endpoint = %self.endpoint, "remote call");

        let payload =
            serde_json::to_vec(body).map_err(|source| ApiError::Encode { operation, source })?;
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", self.target_prefix, operation))
            .body(payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Http { operation, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ApiError::Http { operation, source })?;

        if !status.is_success() {
            return Err(fault(operation, status.as_u16(), text));
        }

        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|source| ApiError::Decode { operation, source })
    }
}

/// Map an error response onto [`ApiError`]. Faults carry a `__type` such as
/// `com.amazonaws.organizations#AccountNotFoundException`; only the part
/// after `#` is kept.
fn fault(operation: &'static str, status: u16, body: String) -> ApiError {
    match serde_json::from_str::<ServiceFault>(&body) {
        Ok(ServiceFault {
            kind: Some(kind),
            message,
        }) => {
            let code = kind.rsplit('#').next().unwrap_or(&kind).to_string();
            ApiError::Service {
                operation,
                status,
                code,
                message: message.unwrap_or_default(),
            }
        }
        _ => ApiError::Status {
            operation,
            status,
            body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_strips_namespace_from_type() {
        let err = fault(
            "DescribeAccount",
            400,
            r#"{"__type":"com.amazonaws.organizations#AccountNotFoundException","Message":"gone"}"#
                .into(),
        );
        match err {
            ApiError::Service { code, message, .. } => {
                assert_eq!(code, "AccountNotFoundException");
                assert_eq!(message, "gone");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unserializable_body_is_an_encode_error() {
        // Never contacted: encoding fails before the request is sent.
        let transport =
            JsonTransport::new("http://127.0.0.1:9", "Test", &ClientSettings::default()).unwrap();
        let body = std::collections::BTreeMap::from([((1u8, 2u8), "tuple keys")]);

        let err = transport
            .call::<_, serde_json::Value>("DescribeRecord", &body)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Encode { operation: "DescribeRecord", .. }));
        assert!(err.to_string().starts_with("failed to encode DescribeRecord request"));
    }

    #[test]
    fn fault_without_type_keeps_body() {
        let err = fault("ListRoots", 503, "<html>unavailable</html>".into());
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
        assert!(err.to_string().contains("unavailable"));
    }
}
