//! HTTP side of the tool: the [`Transport`] seam, its `reqwest`
//! implementation, and the two calls made against the receipts API.

use std::{fmt::Debug, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result, TransportError};

pub const LOGIN_URL: &str = "https://publicapi.citygross.se/publickdb/odata/Logins/SignIn";
pub const RECEIPTS_URL: &str = "https://publicapi.citygross.se/PublicContent/api/receipts";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("receipts/", env!("CARGO_PKG_VERSION"));

/// Query parameters asking for newest receipts first, soft-deleted ones excluded.
const RECEIPT_QUERY: [&str; 2] = [
    "$orderBy=endDateTimeUtc desc",
    "$filter=flags/isDeleted eq false",
];

/// Sends a JSON body with an HTTP POST and returns the decoded JSON response.
pub trait Transport {
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent, the server answers
    /// with a non-success status, or the body is not JSON.
    fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Value,
    ) -> std::result::Result<Value, TransportError>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
///
/// The underlying connection pool lives as long as this value.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a client whose every request gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        mut headers: HeaderMap,
        body: &Value,
    ) -> std::result::Result<Value, TransportError> {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .body(serde_json::to_vec(body)?)
            .send()?;
        let status = resp.status();
        debug!(url, %status, "response received");
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        let text = resp.text()?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Account credentials for the login call.
#[derive(Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Password")]
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token returned by a successful login.
///
/// Held as a ready-made, sensitive `Authorization` header value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(HeaderValue);

impl Token {
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if `uid` cannot be sent in a header.
    pub fn new(uid: &str) -> Result<Self> {
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {uid}")).map_err(|_| Error::InvalidToken)?;
        bearer.set_sensitive(true);
        Ok(Self(bearer))
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Exchanges `credentials` for a bearer token.
///
/// # Errors
///
/// Returns [`Error::Authentication`] if the call fails,
/// [`Error::MissingToken`] if the response carries no string `Uid`, and
/// [`Error::InvalidToken`] if that `Uid` is not usable as a header.
pub fn login(transport: &impl Transport, url: &str, credentials: &Credentials) -> Result<Token> {
    info!(email = %credentials.email, "logging in");
    let body = serde_json::to_value(credentials)
        .map_err(|e| Error::Authentication(TransportError::Json(e)))?;
    let resp = transport
        .post_json(url, HeaderMap::new(), &body)
        .map_err(Error::Authentication)?;
    let uid = resp
        .get("Uid")
        .and_then(Value::as_str)
        .ok_or(Error::MissingToken)?;
    Token::new(uid)
}

/// Fetches every non-deleted receipt, newest first, as raw JSON.
///
/// # Errors
///
/// Returns [`Error::Fetch`] if the call fails, and [`Error::NotAnArray`] if
/// the response is valid JSON of the wrong shape.
pub fn fetch_receipts(transport: &impl Transport, url: &str, token: &Token) -> Result<Vec<Value>> {
    let body = serde_json::json!({ "QueryParams": RECEIPT_QUERY });
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, token.0.clone());

    let resp = transport
        .post_json(url, headers, &body)
        .map_err(Error::Fetch)?;
    match resp {
        Value::Array(receipts) => {
            info!(receipts = receipts.len(), "fetched receipts");
            Ok(receipts)
        }
        other => Err(Error::NotAnArray {
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            email: "anna@example.com".into(),
            password: "hunter2".into(),
        }
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn login_posts_credentials_and_returns_uid() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/signin")
                .header("content-type", "application/json")
                .json_body(json!({ "Email": "anna@example.com", "Password": "hunter2" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "Uid": "tok-123", "Name": "Anna" }));
        });

        let token = login(&transport(), &server.url("/signin"), &credentials()).unwrap();

        mock.assert();
        assert_eq!(token, Token::new("tok-123").unwrap());
    }

    #[test]
    fn login_fails_on_unauthorized_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(401).json_body(json!({ "Message": "Invalid login" }));
        });

        let err = login(&transport(), &server.url("/signin"), &credentials()).unwrap_err();

        assert!(
            matches!(err, Error::Authentication(TransportError::Status(s)) if s.as_u16() == 401),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn login_fails_when_uid_is_missing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(200).json_body(json!({ "Name": "Anna" }));
        });

        let err = login(&transport(), &server.url("/signin"), &credentials()).unwrap_err();

        assert!(matches!(err, Error::MissingToken), "unexpected error: {err:?}");
    }

    #[test]
    fn login_fails_on_non_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = login(&transport(), &server.url("/signin"), &credentials()).unwrap_err();

        assert!(
            matches!(err, Error::Authentication(TransportError::Json(_))),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn login_rejects_uid_unusable_as_header() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(200).json_body(json!({ "Uid": "tok\n123" }));
        });

        let err = login(&transport(), &server.url("/signin"), &credentials()).unwrap_err();

        assert!(matches!(err, Error::InvalidToken), "unexpected error: {err:?}");
    }

    #[test]
    fn fetch_receipts_sends_query_and_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/receipts")
                .header("authorization", "Bearer tok-123")
                .header("content-type", "application/json")
                .json_body(json!({
                    "QueryParams": [
                        "$orderBy=endDateTimeUtc desc",
                        "$filter=flags/isDeleted eq false"
                    ]
                }));
            then.status(200).json_body(json!([{ "items": [] }, { "items": [] }]));
        });

        let receipts = fetch_receipts(
            &transport(),
            &server.url("/receipts"),
            &Token::new("tok-123").unwrap(),
        )
        .unwrap();

        mock.assert();
        assert_eq!(receipts.len(), 2);
    }

    #[test]
    fn fetch_receipts_fails_on_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/receipts");
            then.status(500);
        });

        let err = fetch_receipts(
            &transport(),
            &server.url("/receipts"),
            &Token::new("tok-123").unwrap(),
        )
        .unwrap_err();

        assert!(
            matches!(err, Error::Fetch(TransportError::Status(s)) if s.is_server_error()),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn fetch_receipts_rejects_non_array_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/receipts");
            then.status(200).json_body(json!({ "items": [] }));
        });

        let err = fetch_receipts(
            &transport(),
            &server.url("/receipts"),
            &Token::new("tok-123").unwrap(),
        )
        .unwrap_err();

        assert!(
            matches!(err, Error::NotAnArray { found: "an object" }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn fetch_receipts_fails_on_non_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/receipts");
            then.status(200).body("[{\"items\": [");
        });

        let err = fetch_receipts(
            &transport(),
            &server.url("/receipts"),
            &Token::new("tok-123").unwrap(),
        )
        .unwrap_err();

        assert!(
            matches!(err, Error::Fetch(TransportError::Json(_))),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn requests_give_up_after_the_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({ "Uid": "tok-123" }));
        });
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();

        let err = login(&transport, &server.url("/signin"), &credentials()).unwrap_err();

        assert!(
            matches!(&err, Error::Authentication(TransportError::Request(e)) if e.is_timeout()),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = format!("{:?}", credentials());
        assert!(!creds.contains("hunter2"));
        assert!(creds.contains("anna@example.com"));
        assert_eq!(format!("{:?}", Token::new("tok-123").unwrap()), "Token(<redacted>)");
    }
}
