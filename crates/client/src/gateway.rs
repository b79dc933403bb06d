//! API gateway: the one place the dashboard talks HTTP.
//!
//! Every request goes through [`ApiClient::request`], which
//! - attaches `Authorization: Bearer <token>` while a session exists,
//! - sends JSON bodies as `application/json` and leaves multipart content
//!   types to reqwest,
//! - turns a 401 carrying a token failure into a session teardown plus
//!   [`ApiError::SessionExpired`] or [`ApiError::AuthenticationFailed`],
//! - turns every other failure status into [`ApiError::RequestFailed`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use tillpoint_core::{
    ApiErrorBody, AuthFailure, AuthResponse, BusinessType, BusinessTypeSetting, LoginRequest,
    Session, UserProfile,
};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::{SessionContext, SessionEvent};

/// Login endpoint.
pub const LOGIN_ENDPOINT: &str = "/api/auth/login";
/// Current-user endpoint.
pub const ME_ENDPOINT: &str = "/api/auth/me";
/// Business-type setting endpoint.
pub const BUSINESS_TYPE_ENDPOINT: &str = "/api/settings/business-type";

/// Request body variants.
pub enum RequestBody {
    /// No body; still sent as `application/json`.
    Empty,
    /// JSON body.
    Json(serde_json::Value),
    /// Multipart form (file uploads). reqwest sets the boundary header.
    Multipart(Form),
}

impl RequestBody {
    /// Serialize a value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the value cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Ok(Self::Json(serde_json::to_value(body)?))
    }
}

/// Tillpoint API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: SessionContext,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self::with_http(config.api_url.clone(), http, session))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http(base_url: Url, http: reqwest::Client, session: SessionContext) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                session,
            }),
        }
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    // =========================================================================
    // Core request
    // =========================================================================

    /// Send a request and decode the JSON response.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<_>`
    /// work for endpoints that return nothing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` or `ApiError::AuthenticationFailed`
    /// after tearing down the session on a token failure.
    /// Returns `ApiError::RequestFailed` for any other failure status.
    /// Returns `ApiError::Http` on network failures.
    /// Returns `ApiError::Parse` if a success body is not the expected JSON.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let token = self.inner.session.token().await;

        let mut builder = self.inner.http.request(method, url);
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let json: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return Ok(serde_json::from_slice(json)?);
        }

        Err(self.failure(status, &bytes, token.as_deref()).await)
    }

    /// Classify a failure response, tearing down the session when the
    /// server refused the token we sent.
    async fn failure(&self, status: StatusCode, bytes: &[u8], sent_token: Option<&str>) -> ApiError {
        let body = serde_json::from_slice::<ApiErrorBody>(bytes).ok();

        if status == StatusCode::UNAUTHORIZED
            && let Some(body) = &body
            && let Some(kind) = body.auth_failure()
        {
            let (event, error) = match kind {
                AuthFailure::Expired => (
                    SessionEvent::Expired {
                        message: ApiError::SessionExpired.to_string(),
                    },
                    ApiError::SessionExpired,
                ),
                AuthFailure::Rejected => (
                    SessionEvent::Rejected {
                        message: ApiError::AuthenticationFailed.to_string(),
                    },
                    ApiError::AuthenticationFailed,
                ),
            };

            // Nothing to end when the request went out anonymously.
            if let Some(sent) = sent_token
                && let Err(e) = self.inner.session.end_if_current(sent, event).await
            {
                tracing::error!(error = %e, "Failed to clear stored session");
            }
            return error;
        }

        let (message, code) = match body {
            Some(body) => (body.message, body.code),
            None => (format!("Request failed with status {}", status.as_u16()), None),
        };
        tracing::debug!(status = status.as_u16(), %message, "Request failed");

        ApiError::RequestFailed {
            status: status.as_u16(),
            message,
            code,
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // =========================================================================
    // Convenience verbs
    // =========================================================================

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, RequestBody::Empty).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, RequestBody::json(body)?)
            .await
    }

    /// `PUT` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, RequestBody::json(body)?)
            .await
    }

    /// `DELETE` a resource.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, RequestBody::Empty).await
    }

    /// `POST` a multipart form, e.g. a product image.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        self.request(Method::POST, path, RequestBody::Multipart(form))
            .await
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Log in and store the issued session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RequestFailed` with the server message for bad
    /// credentials, or any error from [`request`](Self::request).
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let request = LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let response: AuthResponse = self.post(LOGIN_ENDPOINT, &request).await?;
        let session = Session::from(response);

        self.inner.session.establish(session.clone()).await?;
        Ok(session)
    }

    /// Forget the current session. The token is stateless on the server, so
    /// no request is made.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if stored credentials cannot be removed.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.inner.session.logout().await?;
        Ok(())
    }

    /// Ask the server who the current token belongs to.
    ///
    /// Useful right after [`SessionContext::restore`]: a stored token that
    /// has expired meanwhile ends the session here instead of on the first
    /// real action.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get(ME_ENDPOINT).await
    }

    // =========================================================================
    // Business configuration
    // =========================================================================

    /// Fetch the configured business type; `None` until setup is done.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn fetch_business_type(&self) -> Result<Option<BusinessType>, ApiError> {
        let setting: BusinessTypeSetting = self.get(BUSINESS_TYPE_ENDPOINT).await?;
        Ok(setting.business_type)
    }

    /// Save the business type (admin only).
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn save_business_type(&self, business_type: &BusinessType) -> Result<(), ApiError> {
        let setting = BusinessTypeSetting {
            business_type: Some(business_type.clone()),
        };
        let _: BusinessTypeSetting = self.put(BUSINESS_TYPE_ENDPOINT, &setting).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}
