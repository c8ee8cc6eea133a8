use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Likert, Question, ResultId},
    error::ApiErrorBody,
    protocol::{QuestionsResponse, ResultPayload, SubmitAnswersRequest, SubmitAnswersResponse},
};
use tracing::{debug, warn};
use url::Url;

pub mod answers;
pub mod error;
pub mod flow;
pub mod result_view;
pub mod timers;
pub mod view;

pub use answers::AnswerSet;
pub use error::{FlowError, LoadFailure, ServiceError};
pub use flow::{
    FlowEvent, FlowInput, FlowOptions, FlowPhase, FlowSnapshot, Navigation, NoticeKind,
    QuestionFlowController, UserNotice,
};
pub use result_view::ResultView;
pub use view::{question_view, NextAction, QuestionView};

const QUESTIONS_PATH: &str = "/api/questions";
const RESULTS_PATH: &str = "/api/results";

/// The remote collaborator that owns question content and scoring.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn fetch_questions(&self) -> Result<Vec<Question>, ServiceError>;
    async fn submit_answers(&self, answers: &[Likert]) -> Result<ResultId, ServiceError>;
    async fn fetch_result(&self, id: &ResultId) -> Result<ResultPayload, ServiceError>;
}

pub struct HttpScoringService {
    http: Client,
    base_url: String,
}

impl HttpScoringService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let base_url = normalize_base_url(&base_url.into())?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ServiceError> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = ApiErrorBody::message_from_body(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!(%status, %message, "scoring service rejected request");
            return Err(ServiceError::Status { status, message });
        }

        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ServiceError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ScoringService for HttpScoringService {
    async fn fetch_questions(&self) -> Result<Vec<Question>, ServiceError> {
        let res = self
            .http
            .get(format!("{}{QUESTIONS_PATH}", self.base_url))
            .send()
            .await?;
        let body: QuestionsResponse = Self::decode(res).await?;
        debug!(count = body.questions.len(), "fetched questions");
        Ok(body.questions)
    }

    async fn submit_answers(&self, answers: &[Likert]) -> Result<ResultId, ServiceError> {
        let res = self
            .http
            .post(format!("{}{RESULTS_PATH}", self.base_url))
            .json(&SubmitAnswersRequest {
                answers: answers.to_vec(),
            })
            .send()
            .await?;
        let body: SubmitAnswersResponse = Self::decode(res).await?;
        Ok(body.id)
    }

    async fn fetch_result(&self, id: &ResultId) -> Result<ResultPayload, ServiceError> {
        let mut url = Url::parse(&format!("{}{RESULTS_PATH}", self.base_url)).map_err(|err| {
            ServiceError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: err.to_string(),
            }
        })?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "cannot be a base".to_string(),
            })?
            .push(id.as_str());

        let res = self.http.get(url).send().await?;
        Self::decode(res).await
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|err| ServiceError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServiceError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "base url must start with http:// or https://".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Reference to the results view for a completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLink {
    pub result_id: ResultId,
    pub href: String,
}

impl ResultsLink {
    pub fn new(view_base: &str, result_id: ResultId) -> Self {
        let href = format!(
            "{}/result.html?{}",
            view_base.trim_end_matches('/'),
            id_query(&result_id)
        );
        Self { result_id, href }
    }

    /// Public link to a stored result, served under `/pages`.
    pub fn share_url(origin: &str, result_id: &ResultId) -> String {
        format!(
            "{}/pages/result.html?{}",
            origin.trim_end_matches('/'),
            id_query(result_id)
        )
    }
}

fn id_query(result_id: &ResultId) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", result_id.as_str())
        .finish()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
