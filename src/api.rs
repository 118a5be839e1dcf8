use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::auth::User;
use crate::models::{ExerciseLog, TrainingDay, WorkoutPlan, WorkoutSession};
use crate::session::SessionCompletion;

/// ---------------------------------------------------------------------------
/// Token Provider
/// ---------------------------------------------------------------------------

/// Source of the bearer token attached to API requests
pub trait TokenProvider: Send + Sync {
  fn get(&self) -> Option<String>;
  fn set(&self, token: String);
  fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemoryTokenProvider {
  token: RwLock<Option<String>>,
}

impl InMemoryTokenProvider {
  pub fn new(token: Option<String>) -> Self {
    Self {
      token: RwLock::new(token),
    }
  }
}

impl TokenProvider for InMemoryTokenProvider {
  fn get(&self) -> Option<String> {
    self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  fn set(&self, token: String) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
  }

  fn clear(&self) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Invalid API URL: {0}")]
  Url(#[from] url::ParseError),

  #[error("Not authenticated with the workout API")]
  Unauthorized,

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("API returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Failed to parse response: {0}")]
  Decode(String),
}

impl Serialize for ApiError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Request / Response Bodies
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
  username: &'a str,
  password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
  token: String,
  user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
  plan_id: i64,
  training_day_id: i64,
  week_number: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteSessionRequest {
  exercise_logs: Vec<ExerciseLog>,
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct ApiClient {
  http: Client,
  base_url: Url,
  tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
  pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
    // Url::join replaces the last segment unless the path ends in a slash
    let mut base_url = Url::parse(base_url)?;
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    Ok(Self {
      http: Client::new(),
      base_url,
      tokens,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
    &self.tokens
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
    let url = self.base_url.join(path)?;
    let mut builder = self.http.request(method, url);
    if let Some(token) = self.tokens.get() {
      builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    Ok(builder)
  }

  async fn check(&self, response: Response, what: &str) -> Result<Response, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
      warn!("API rejected token while fetching {}, clearing it", what);
      self.tokens.clear();
      return Err(ApiError::Unauthorized);
    }

    if status == StatusCode::NOT_FOUND {
      return Err(ApiError::NotFound(what.to_string()));
    }

    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::Status {
        status: status.as_u16(),
        body,
      });
    }

    Ok(response)
  }

  async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
    let response = self.check(builder.send().await?, what).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
      let preview: String = text.chars().take(500).collect();
      debug!("Unparseable {} response (first 500 chars): {}", what, preview);
      ApiError::Decode(format!("{}: {}", what, e))
    })
  }

  /// ---------------------------------------------------------------------------
  /// Endpoints
  /// ---------------------------------------------------------------------------

  /// Exchange credentials for a token and store it in the provider
  pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
    let builder = self
      .request(Method::POST, "auth/login")?
      .json(&LoginRequest { username, password });
    let response: LoginResponse = self.send_json(builder, "login").await?;

    self.tokens.set(response.token);
    Ok(response.user)
  }

  pub async fn list_plans(&self) -> Result<Vec<WorkoutPlan>, ApiError> {
    let builder = self.request(Method::GET, "plans")?;
    self.send_json(builder, "plans").await
  }

  pub async fn get_plan(&self, plan_id: i64) -> Result<WorkoutPlan, ApiError> {
    let builder = self.request(Method::GET, &format!("plans/{}", plan_id))?;
    self.send_json(builder, &format!("plan {}", plan_id)).await
  }

  pub async fn list_training_days(&self, plan_id: i64) -> Result<Vec<TrainingDay>, ApiError> {
    let builder = self.request(Method::GET, &format!("plans/{}/training-days", plan_id))?;
    self.send_json(builder, &format!("training days of plan {}", plan_id)).await
  }

  /// Session history with exercise logs, optionally for one plan
  pub async fn list_sessions(&self, plan_id: Option<i64>) -> Result<Vec<WorkoutSession>, ApiError> {
    let mut builder = self.request(Method::GET, "sessions")?;
    if let Some(plan_id) = plan_id {
      builder = builder.query(&[("planId", plan_id)]);
    }
    self.send_json(builder, "sessions").await
  }

  pub async fn start_session(
    &self,
    plan_id: i64,
    training_day_id: i64,
    week_number: i64,
  ) -> Result<WorkoutSession, ApiError> {
    let builder = self.request(Method::POST, "sessions")?.json(&StartSessionRequest {
      plan_id,
      training_day_id,
      week_number,
    });
    self.send_json(builder, "new session").await
  }

  /// Submit the runner's results; the server stamps the completion time
  pub async fn complete_session(
    &self,
    session_id: i64,
    completion: &SessionCompletion,
  ) -> Result<WorkoutSession, ApiError> {
    let builder = self
      .request(Method::PUT, &format!("sessions/{}/complete", session_id))?
      .json(&CompleteSessionRequest {
        exercise_logs: completion.to_logs(),
      });
    self.send_json(builder, &format!("session {}", session_id)).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
