// Booking service client: the remote operations, their status contract and the error taxonomy

use crate::model::{
    AuthResponse, AuthToken, Booking, BookingFilter, BookingId, BookingIdRecord, BookingRecord,
    Credentials,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://restful-booker.herokuapp.com";

// Remote operations and the status code each one answers with on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateToken,
    CreateBooking,
    GetBooking,
    UpdateBooking,
    DeleteBooking,
    ListBookingIds,
    HealthCheck,
}

impl Operation {
    pub fn method(self) -> Method {
        match self {
            Operation::CreateToken | Operation::CreateBooking => Method::POST,
            Operation::GetBooking | Operation::ListBookingIds | Operation::HealthCheck => {
                Method::GET
            }
            Operation::UpdateBooking => Method::PUT,
            Operation::DeleteBooking => Method::DELETE,
        }
    }

    // Delete and ping answer 201 where everything else answers 200
    pub fn expected_status(self) -> u16 {
        match self {
            Operation::DeleteBooking | Operation::HealthCheck => 201,
            _ => 200,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateToken => "create_token",
            Operation::CreateBooking => "create_booking",
            Operation::GetBooking => "get_booking",
            Operation::UpdateBooking => "update_booking",
            Operation::DeleteBooking => "delete_booking",
            Operation::ListBookingIds => "list_booking_ids",
            Operation::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error during {operation}: {message}")]
    NetworkError {
        operation: Operation,
        message: String,
    },

    #[error("Unexpected status from {operation}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        operation: Operation,
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("Schema mismatch in {operation} response: {message}")]
    SchemaMismatch {
        operation: Operation,
        message: String,
    },
}

impl ApiError {
    pub fn operation(&self) -> Operation {
        match self {
            ApiError::NetworkError { operation, .. }
            | ApiError::UnexpectedStatus { operation, .. }
            | ApiError::SchemaMismatch { operation, .. } => *operation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    // 401 and 403 are both used by the service to refuse a missing or bad token
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

impl ClientStats {
    fn record(&mut self, elapsed: Duration, succeeded: bool) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.requests_sent += 1;
        if succeeded {
            self.requests_succeeded += 1;
        } else {
            self.requests_failed += 1;
        }
        self.average_response_time_ms +=
            (elapsed_ms - self.average_response_time_ms) / self.requests_sent as f64;
        self.max_response_time_ms = self.max_response_time_ms.max(elapsed_ms);
    }
}

#[async_trait]
pub trait BookingApi: Send + Sync + 'static {
    // POST /auth
    async fn create_token(&self, credentials: &Credentials) -> Result<AuthToken, ApiError>;

    // POST /booking
    async fn create_booking(&self, booking: &Booking) -> Result<BookingRecord, ApiError>;

    // GET /booking/{id}
    async fn get_booking(&self, id: BookingId) -> Result<Booking, ApiError>;

    // PUT /booking/{id}; without a token the service refuses the update
    async fn update_booking(
        &self,
        id: BookingId,
        booking: &Booking,
        token: Option<&AuthToken>,
    ) -> Result<Booking, ApiError>;

    // DELETE /booking/{id}
    async fn delete_booking(&self, id: BookingId, token: Option<&AuthToken>)
        -> Result<(), ApiError>;

    // GET /booking
    async fn list_booking_ids(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<BookingIdRecord>, ApiError>;

    // GET /ping, returns the plain-text body
    async fn health_check(&self) -> Result<String, ApiError>;

    fn stats(&self) -> ClientStats;
}

pub struct RestfulBookerClient {
    http: reqwest::Client,
    base_url: Url,
    stats: Mutex<ClientStats>,
}

impl RestfulBookerClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::ConfigError(format!("invalid base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "base_url {base_url} cannot carry a path"
            )));
        }
        if config.timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, operation: Operation, path: &str) -> RequestBuilder {
        let base = self.base_url.as_str().trim_end_matches('/');
        self.http
            .request(operation.method(), format!("{base}{path}"))
            .header(ACCEPT, "application/json")
    }

    fn with_token(request: RequestBuilder, token: Option<&AuthToken>) -> RequestBuilder {
        match token {
            Some(token) => request.header(COOKIE, token.cookie()),
            None => request,
        }
    }

    // Sends the request and enforces the operation's success status. Failures are counted here;
    // a request only counts as succeeded once its body has been decoded, see `finish`
    async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<(Response, Duration), ApiError> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.stats.lock().record(elapsed, false);
                warn!(%operation, error = %e, "request failed");
                return Err(ApiError::NetworkError {
                    operation,
                    message: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        debug!(
            %operation,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "response received"
        );

        if status != operation.expected_status() {
            self.stats.lock().record(elapsed, false);
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%operation, status, error = %e, "failed to read error response body");
                    String::new()
                }
            };
            return Err(ApiError::UnexpectedStatus {
                operation,
                expected: operation.expected_status(),
                actual: status,
                body,
            });
        }

        Ok((response, elapsed))
    }

    fn finish<T>(&self, elapsed: Duration, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.stats.lock().record(elapsed, result.is_ok());
        result
    }

    async fn text(operation: Operation, response: Response) -> Result<String, ApiError> {
        response.text().await.map_err(|e| ApiError::NetworkError {
            operation,
            message: e.to_string(),
        })
    }

    // Reads the body as text first so a malformed body is a schema error, not a network one
    async fn json<T: DeserializeOwned>(
        operation: Operation,
        response: Response,
    ) -> Result<T, ApiError> {
        let body = Self::text(operation, response).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::SchemaMismatch {
            operation,
            message: format!("{e} in body {body:?}"),
        })
    }
}

#[async_trait]
impl BookingApi for RestfulBookerClient {
    async fn create_token(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        let operation = Operation::CreateToken;
        let request = self.request(operation, "/auth").json(credentials);
        let (response, elapsed) = self.send(operation, request).await?;
        let result = Self::json::<AuthResponse>(operation, response)
            .await
            .and_then(|body| match body.token {
                Some(token) if !token.is_empty() => Ok(AuthToken::new(token)),
                _ => Err(ApiError::SchemaMismatch {
                    operation,
                    message: match body.reason {
                        Some(reason) => format!("no token in response, reason: {reason}"),
                        None => "no token in response".to_string(),
                    },
                }),
            });
        self.finish(elapsed, result)
    }

    async fn create_booking(&self, booking: &Booking) -> Result<BookingRecord, ApiError> {
        let operation = Operation::CreateBooking;
        let request = self.request(operation, "/booking").json(booking);
        let (response, elapsed) = self.send(operation, request).await?;
        self.finish(elapsed, Self::json(operation, response).await)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Booking, ApiError> {
        let operation = Operation::GetBooking;
        let request = self.request(operation, &format!("/booking/{id}"));
        let (response, elapsed) = self.send(operation, request).await?;
        self.finish(elapsed, Self::json(operation, response).await)
    }

    async fn update_booking(
        &self,
        id: BookingId,
        booking: &Booking,
        token: Option<&AuthToken>,
    ) -> Result<Booking, ApiError> {
        let operation = Operation::UpdateBooking;
        let request = self
            .request(operation, &format!("/booking/{id}"))
            .json(booking);
        let (response, elapsed) = self
            .send(operation, Self::with_token(request, token))
            .await?;
        self.finish(elapsed, Self::json(operation, response).await)
    }

    async fn delete_booking(
        &self,
        id: BookingId,
        token: Option<&AuthToken>,
    ) -> Result<(), ApiError> {
        let operation = Operation::DeleteBooking;
        let request = self.request(operation, &format!("/booking/{id}"));
        let (_, elapsed) = self
            .send(operation, Self::with_token(request, token))
            .await?;
        self.finish(elapsed, Ok(()))
    }

    async fn list_booking_ids(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<BookingIdRecord>, ApiError> {
        let operation = Operation::ListBookingIds;
        let mut request = self.request(operation, "/booking");
        if !filter.is_empty() {
            request = request.query(&filter.query_pairs());
        }
        let (response, elapsed) = self.send(operation, request).await?;
        self.finish(elapsed, Self::json(operation, response).await)
    }

    async fn health_check(&self) -> Result<String, ApiError> {
        let operation = Operation::HealthCheck;
        let request = self.request(operation, "/ping");
        let (response, elapsed) = self.send(operation, request).await?;
        self.finish(elapsed, Self::text(operation, response).await)
    }

    fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }
}
