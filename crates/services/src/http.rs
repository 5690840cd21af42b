use std::env;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use quiz_core::model::{
    OptionLabel, Question, QuestionError, QuestionId, SessionOutcome, SkillId, ValidationResult,
};

use crate::backend::{AnswerValidator, OutcomeSource, QuestionSource};
use crate::error::{ApiConfigError, BackendError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the quiz backend.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read `QUIZ_API_BASE_URL`, `QUIZ_API_TOKEN` and `QUIZ_REQUEST_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError` when a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ApiConfigError> {
        let base_url = env::var("QUIZ_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let token = env::var("QUIZ_API_TOKEN").ok();
        let timeout = env::var("QUIZ_REQUEST_TIMEOUT_MS").ok();
        Self::from_parts(&base_url, token, timeout.as_deref())
    }

    fn from_parts(
        base_url: &str,
        token: Option<String>,
        timeout_ms: Option<&str>,
    ) -> Result<Self, ApiConfigError> {
        let mut config = Self::new(parse_base_url(base_url)?);
        config.token = token.filter(|t| !t.trim().is_empty());
        if let Some(raw) = timeout_ms {
            let ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ApiConfigError::InvalidTimeout { raw: raw.to_string() })?;
            config.request_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ApiConfigError::InvalidBaseUrl` if `raw` is not an absolute URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ApiConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiConfigError> {
    Url::parse(raw.trim()).map_err(|source| ApiConfigError::InvalidBaseUrl {
        raw: raw.to_string(),
        source,
    })
}

/// REST client for the three quiz endpoints.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            token: Arc::new(RwLock::new(config.token.clone())),
        }
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn clear_token(&self) {
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| BackendError::Malformed(format!("endpoint {raw}: {e}")))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &'static str,
    ) -> Result<T, BackendError> {
        let request = match self.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(request = what, "backend returned 401, dropping session token");
            self.clear_token();
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            return Err(BackendError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(format!("{what}: {e}")))
    }
}

#[async_trait]
impl QuestionSource for HttpBackend {
    async fn fetch_questions(&self, skill_id: SkillId) -> Result<Vec<Question>, BackendError> {
        let url = self.endpoint(&format!("questions/skill/{skill_id}"))?;
        let payload: Vec<QuestionPayload> = self.execute(self.client.get(url), "questions").await?;
        payload
            .into_iter()
            .map(QuestionPayload::into_question)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BackendError::Malformed(format!("questions: {e}")))
    }
}

#[async_trait]
impl AnswerValidator for HttpBackend {
    async fn submit_answer(
        &self,
        question_id: QuestionId,
        option: OptionLabel,
    ) -> Result<ValidationResult, BackendError> {
        let url = self.endpoint(&format!("questions/{question_id}/validate"))?;
        let body = ValidateRequest {
            answer: option.as_str(),
        };
        let payload: ValidationPayload = self
            .execute(self.client.post(url).json(&body), "validate")
            .await?;
        tracing::debug!(
            %question_id,
            correct = payload.correct,
            score = ?payload.score,
            level = ?payload.level,
            "answer validated"
        );
        Ok(ValidationResult {
            correct: payload.correct,
        })
    }
}

#[async_trait]
impl OutcomeSource for HttpBackend {
    async fn fetch_outcome(&self, skill_id: SkillId) -> Result<SessionOutcome, BackendError> {
        let url = self.endpoint(&format!("questions/user-skill/{skill_id}"))?;
        self.execute(self.client.get(url), "outcome").await
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    id: u64,
    skill: SkillPayload,
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_option: String,
}

#[derive(Debug, Deserialize)]
struct SkillPayload {
    id: u64,
}

impl QuestionPayload {
    fn into_question(self) -> Result<Question, QuestionError> {
        let correct = self.correct_option.parse::<OptionLabel>()?;
        Question::new(
            QuestionId::new(self.id),
            SkillId::new(self.skill.id),
            self.question_text,
            [self.option_a, self.option_b, self.option_c, self.option_d],
            correct,
        )
    }
}

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationPayload {
    correct: bool,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    level: Option<u32>,
}
