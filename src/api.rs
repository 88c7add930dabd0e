use crate::config::EditorConfig;
use crate::error::TransportError;
use crate::session::parse_set_cookie;
use crate::statics;
use crate::value::LbValue;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header;

/// One call against the control data API.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Login {
        username: String,
        password: String,
    },
    FetchControlData {
        token: String,
    },
    SaveControlData {
        token: String,
        /// Version tag of the copy the edits were based on, sent as `If-Match`.
        etag: Option<String>,
        body: LbValue,
    },
}

impl ApiRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ApiRequest::Login { .. } => "login",
            ApiRequest::FetchControlData { .. } => "fetch",
            ApiRequest::SaveControlData { .. } => "save",
        }
    }
}

/// What came back, reduced to the parts the editor looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub etag: Option<String>,
    /// Value of the session cookie, if the response set one.
    pub session_cookie: Option<String>,
    pub body: LbValue,
}

impl ApiResponse {
    pub fn new(status: u16, body: LbValue) -> Self {
        Self {
            status,
            etag: None,
            session_cookie: None,
            body,
        }
    }

    pub fn with_etag(mut self, etag: &str) -> Self {
        self.etag = Some(etag.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server's `{"error": "..."}` message.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get(statics::API_FIELD_ERROR)?.as_str()
    }

    /// Session token of a login response, from the body or else the cookie.
    pub fn token(&self) -> Option<&str> {
        self.body
            .get(statics::API_FIELD_TOKEN)
            .and_then(|v| v.as_str())
            .or(self.session_cookie.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// Carries requests to the server. The HTTP mechanics live behind this seam so the
/// controller can be driven by anything that answers requests.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: ApiRequest) -> BoxFuture<'static, Result<ApiResponse, TransportError>>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    config: EditorConfig,
}

impl HttpTransport {
    pub fn new(config: EditorConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::new(format!("building HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn build(&self, request: ApiRequest) -> reqwest::RequestBuilder {
        match request {
            ApiRequest::Login { username, password } => self
                .client
                .post(self.config.endpoint(statics::API_SESSION_PATH))
                .form(&[
                    (statics::API_FORM_USERNAME, username),
                    (statics::API_FORM_PASSWORD, password),
                ]),
            ApiRequest::FetchControlData { token } => self
                .client
                .get(self.config.endpoint(statics::API_CONTROLDATA_PATH))
                .header(statics::API_HEADER_AUTH_TOKEN, token),
            ApiRequest::SaveControlData { token, etag, body } => {
                let mut builder = self
                    .client
                    .put(self.config.endpoint(statics::API_CONTROLDATA_PATH))
                    .header(statics::API_HEADER_AUTH_TOKEN, token)
                    .json(&body);
                if let Some(etag) = etag {
                    builder = builder.header(header::IF_MATCH, etag);
                }
                builder
            }
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'static, Result<ApiResponse, TransportError>> {
        let name = request.name();
        let builder = self.build(request);

        async move {
            let resp = builder
                .send()
                .await
                .map_err(|e| TransportError::new(format!("{name} request failed: {e}")))?;

            let status = resp.status().as_u16();
            let headers = resp.headers();
            let etag = headers
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let session_cookie = headers
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(parse_set_cookie);

            let text = resp
                .text()
                .await
                .map_err(|e| TransportError::new(format!("{name} response unreadable: {e}")))?;
            let body = if text.trim().is_empty() {
                LbValue::Null
            } else {
                // Proxies answer with HTML error pages; keep the text so it can be shown.
                LbValue::parse_json(&text).unwrap_or(LbValue::String(text))
            };

            log::debug!("{name} answered HTTP {status}");
            Ok(ApiResponse {
                status,
                etag,
                session_cookie,
                body,
            })
        }
        .boxed()
    }
}
