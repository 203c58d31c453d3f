//! Remote gateway to the record store.
//!
//! The backend is a single HTTP endpoint dispatched by an `action` query
//! parameter: reads are GETs with query parameters, writes are POSTs whose
//! JSON body also carries the session token. Every response is an envelope
//! that holds either the payload or an `error` string; the HTTP status is
//! not a reliable signal (the backend can answer 200 with an embedded
//! error, auth failures included), so authentication expiry is detected by
//! status 401 *or* by recognizable error text.
//!
//! The gateway is stateless: it owns no entity data and never touches the
//! store. Its one piece of cleverness is the legacy-slot shim: a numeric
//! loadout ordinal the server rejects as invalid is retried exactly once as
//! the old fixed-slot code, keeping new clients usable against the previous
//! server generation.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::fields::{EnergyLevel, QuestCompletionMode};
use crate::mission::{
    CreateMissionInput, CreateQuestInput, LoadoutConfig, Mission, MissionPatch, MissionRecord,
    Quest, QuestPatch, QuestRecord,
};
use crate::slot::to_legacy_slot;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything that can go wrong talking to the record store.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session token is invalid or expired. The caller must drop its
    /// local session and return to the unauthenticated state; never retry.
    #[error("session invalid or expired")]
    AuthExpired,
    /// An error string embedded in an otherwise well-formed response.
    #[error("{0}")]
    Api(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("server response missing `{0}`")]
    MissingField(&'static str),
}

/// Auth-failure phrases the backend embeds in 200 responses.
fn is_auth_failure_text(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("unauthorized") || lower.contains("invalid or expired session")
}

/// Result of a `login` call.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub email: String,
    pub expires_at: i64,
}

/// Result of an `assignToday` call: the confirmed mission, plus the other
/// mission when the server performed a swap.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub mission: MissionRecord,
    pub swapped: Option<MissionRecord>,
}

/// Per-line outcome of a bulk import.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkLineResult {
    pub index: u32,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub task: Option<MissionRecord>,
}

/// Aggregate outcome of a bulk import. Never all-or-nothing: the server
/// attempts every line independently.
#[derive(Debug, Clone, Default)]
pub struct BulkImportOutcome {
    pub total: u32,
    pub success_count: u32,
    pub error_count: u32,
    pub results: Vec<BulkLineResult>,
}

/// The one response shape the backend speaks: a bag of optional payload
/// fields plus an optional error string.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    error: Option<String>,
    task: Option<MissionRecord>,
    tasks: Option<Vec<MissionRecord>>,
    swapped_task: Option<MissionRecord>,
    quest: Option<QuestRecord>,
    quests: Option<Vec<QuestRecord>>,
    total: Option<u32>,
    success_count: Option<u32>,
    error_count: Option<u32>,
    results: Option<Vec<BulkLineResult>>,
    token: Option<String>,
    #[serde(rename = "userEmail")]
    user_email: Option<String>,
    #[serde(rename = "expiresAt")]
    expires_at: Option<i64>,
    energy_level: Option<EnergyLevel>,
    points_used: Option<u32>,
    points_limit: Option<u32>,
}

/// One operation per server action. The store is generic over this so the
/// optimistic-update protocol can be exercised against an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn get_missions(
        &self,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Mission>, ApiError>;
    async fn create_mission(&self, input: &CreateMissionInput) -> Result<MissionRecord, ApiError>;
    async fn update_mission(&self, patch: &MissionPatch) -> Result<MissionRecord, ApiError>;
    async fn complete_mission(&self, task_id: &str) -> Result<MissionRecord, ApiError>;
    async fn cancel_mission(&self, task_id: &str) -> Result<MissionRecord, ApiError>;
    async fn bulk_create_missions(
        &self,
        inputs: &[CreateMissionInput],
    ) -> Result<BulkImportOutcome, ApiError>;
    async fn assign_today(
        &self,
        task_id: &str,
        slot: Option<&str>,
        swap_with: Option<&str>,
    ) -> Result<AssignOutcome, ApiError>;
    async fn clear_today(&self, task_id: &str) -> Result<MissionRecord, ApiError>;
    async fn get_quests(
        &self,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Quest>, ApiError>;
    async fn create_quest(&self, input: &CreateQuestInput) -> Result<QuestRecord, ApiError>;
    async fn update_quest(&self, patch: &QuestPatch) -> Result<QuestRecord, ApiError>;
    async fn toggle_quest_tracked(&self, quest_id: &str) -> Result<QuestRecord, ApiError>;
    async fn complete_quest(
        &self,
        quest_id: &str,
        mode: Option<QuestCompletionMode>,
    ) -> Result<QuestRecord, ApiError>;
    async fn get_loadout_config(&self) -> Result<LoadoutConfig, ApiError>;
    async fn set_energy_level(&self, level: EnergyLevel) -> Result<LoadoutConfig, ApiError>;
}

/// The real gateway, speaking HTTP to the record store.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    token: String,
}

impl HttpGateway {
    pub fn new(base: Url, token: String) -> Result<Self, ApiError> {
        Self::with_timeout(base, token, DEFAULT_TIMEOUT)
    }

    /// The original client inherited the platform's (absent) timeout; here
    /// the policy is explicit and configurable.
    pub fn with_timeout(base: Url, token: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpGateway { client, base, token })
    }

    /// Authenticate and mint a session token. Not part of [`Gateway`]:
    /// every other action presumes a token already exists.
    pub async fn login(
        base: Url,
        email: &str,
        secret: &str,
        timeout: Duration,
    ) -> Result<LoginOutcome, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut url = base;
        url.query_pairs_mut().append_pair("action", "login");
        let resp = client
            .post(url)
            .json(&json!({ "email": email, "password": secret }))
            .send()
            .await?;
        let env = decode(resp.status(), &resp.text().await?)?;
        Ok(LoginOutcome {
            token: env.token.ok_or(ApiError::MissingField("token"))?,
            email: env.user_email.unwrap_or_else(|| email.to_string()),
            expires_at: env.expires_at.unwrap_or(0),
        })
    }

    fn url(&self, action: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("action", action);
            q.append_pair("token", &self.token);
            for (k, v) in params {
                q.append_pair(k, v);
            }
        }
        url
    }

    async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<Envelope, ApiError> {
        debug!(action, "gateway read");
        // Read params ride in the query string alongside action and token.
        let resp = self.client.get(self.url(action, params)).send().await?;
        decode(resp.status(), &resp.text().await?)
    }

    async fn post(&self, action: &str, mut body: Value) -> Result<Envelope, ApiError> {
        debug!(action, "gateway write");
        if let Some(obj) = body.as_object_mut() {
            // The backend reads the token from the body on writes.
            obj.insert("token".into(), Value::String(self.token.clone()));
        }
        let resp = self.client.post(self.url(action, &[])).json(&body).send().await?;
        decode(resp.status(), &resp.text().await?)
    }

    async fn assign_today_raw(
        &self,
        task_id: &str,
        slot: Option<&str>,
        swap_with: Option<&str>,
    ) -> Result<AssignOutcome, ApiError> {
        let mut body = json!({ "task_id": task_id });
        if let Some(slot) = slot {
            body["today_slot"] = json!(slot);
        }
        if let Some(other) = swap_with {
            body["swap_with_task_id"] = json!(other);
        }
        let env = self.post("assignToday", body).await?;
        Ok(AssignOutcome {
            mission: env.task.ok_or(ApiError::MissingField("task"))?,
            swapped: env.swapped_task,
        })
    }
}

fn decode(status: StatusCode, body: &str) -> Result<Envelope, ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::AuthExpired);
    }
    let mut env: Envelope = serde_json::from_str(body).map_err(ApiError::Decode)?;
    if let Some(error) = env.error.take() {
        if !error.is_empty() {
            if is_auth_failure_text(&error) {
                return Err(ApiError::AuthExpired);
            }
            return Err(ApiError::Api(error));
        }
    }
    Ok(env)
}

fn read_params<'a>(
    status: Option<&'a str>,
    assignee: Option<&'a str>,
) -> Vec<(&'static str, &'a str)> {
    let mut params = Vec::new();
    if let Some(s) = status {
        params.push(("status", s));
    }
    if let Some(a) = assignee {
        params.push(("assignee", a));
    }
    params
}

impl Gateway for HttpGateway {
    async fn get_missions(
        &self,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Mission>, ApiError> {
        let env = self.get("getTasks", &read_params(status, assignee)).await?;
        Ok(env
            .tasks
            .unwrap_or_default()
            .into_iter()
            .map(MissionRecord::into_mission)
            .collect())
    }

    async fn create_mission(&self, input: &CreateMissionInput) -> Result<MissionRecord, ApiError> {
        let body = serde_json::to_value(input).map_err(ApiError::Decode)?;
        let env = self.post("createTask", body).await?;
        env.task.ok_or(ApiError::MissingField("task"))
    }

    async fn update_mission(&self, patch: &MissionPatch) -> Result<MissionRecord, ApiError> {
        let body = serde_json::to_value(patch).map_err(ApiError::Decode)?;
        let env = self.post("updateTask", body).await?;
        env.task.ok_or(ApiError::MissingField("task"))
    }

    async fn complete_mission(&self, task_id: &str) -> Result<MissionRecord, ApiError> {
        let env = self.post("completeTask", json!({ "task_id": task_id })).await?;
        env.task.ok_or(ApiError::MissingField("task"))
    }

    async fn cancel_mission(&self, task_id: &str) -> Result<MissionRecord, ApiError> {
        let env = self.post("cancelTask", json!({ "task_id": task_id })).await?;
        env.task.ok_or(ApiError::MissingField("task"))
    }

    async fn bulk_create_missions(
        &self,
        inputs: &[CreateMissionInput],
    ) -> Result<BulkImportOutcome, ApiError> {
        let body = json!({ "tasks": inputs });
        let env = self.post("bulkCreateTasks", body).await?;
        Ok(BulkImportOutcome {
            total: env.total.unwrap_or(0),
            success_count: env.success_count.unwrap_or(0),
            error_count: env.error_count.unwrap_or(0),
            results: env.results.unwrap_or_default(),
        })
    }

    /// Assign with the legacy-slot compatibility shim: an "invalid
    /// today_slot" rejection of a numeric ordinal is retried exactly once
    /// with the fixed-slot code; a failed retry surfaces the original
    /// error.
    async fn assign_today(
        &self,
        task_id: &str,
        slot: Option<&str>,
        swap_with: Option<&str>,
    ) -> Result<AssignOutcome, ApiError> {
        match self.assign_today_raw(task_id, slot, swap_with).await {
            Err(ApiError::Api(message))
                if message.to_lowercase().contains("invalid today_slot") =>
            {
                let legacy = slot.and_then(to_legacy_slot).filter(|legacy| {
                    *legacy != slot.unwrap_or_default().trim().to_ascii_uppercase()
                });
                let Some(legacy) = legacy else {
                    return Err(ApiError::Api(message));
                };
                warn!(slot = slot.unwrap_or_default(), legacy, "retrying with legacy slot code");
                match self.assign_today_raw(task_id, Some(legacy), swap_with).await {
                    Ok(outcome) => Ok(outcome),
                    Err(_) => Err(ApiError::Api(message)),
                }
            }
            other => other,
        }
    }

    async fn clear_today(&self, task_id: &str) -> Result<MissionRecord, ApiError> {
        let env = self.post("clearToday", json!({ "task_id": task_id })).await?;
        env.task.ok_or(ApiError::MissingField("task"))
    }

    async fn get_quests(
        &self,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Quest>, ApiError> {
        let env = self.get("getQuests", &read_params(status, assignee)).await?;
        Ok(env
            .quests
            .unwrap_or_default()
            .into_iter()
            .map(QuestRecord::into_quest)
            .collect())
    }

    async fn create_quest(&self, input: &CreateQuestInput) -> Result<QuestRecord, ApiError> {
        let body = serde_json::to_value(input).map_err(ApiError::Decode)?;
        let env = self.post("createQuest", body).await?;
        env.quest.ok_or(ApiError::MissingField("quest"))
    }

    async fn update_quest(&self, patch: &QuestPatch) -> Result<QuestRecord, ApiError> {
        let body = serde_json::to_value(patch).map_err(ApiError::Decode)?;
        let env = self.post("updateQuest", body).await?;
        env.quest.ok_or(ApiError::MissingField("quest"))
    }

    async fn toggle_quest_tracked(&self, quest_id: &str) -> Result<QuestRecord, ApiError> {
        let env = self.post("toggleQuestTracked", json!({ "quest_id": quest_id })).await?;
        env.quest.ok_or(ApiError::MissingField("quest"))
    }

    async fn complete_quest(
        &self,
        quest_id: &str,
        mode: Option<QuestCompletionMode>,
    ) -> Result<QuestRecord, ApiError> {
        let mut body = json!({ "quest_id": quest_id });
        if let Some(mode) = mode {
            body["mode"] = serde_json::to_value(mode).map_err(ApiError::Decode)?;
        }
        let env = self.post("completeQuest", body).await?;
        env.quest.ok_or(ApiError::MissingField("quest"))
    }

    async fn get_loadout_config(&self) -> Result<LoadoutConfig, ApiError> {
        let env = self.get("getLoadoutConfig", &[]).await?;
        Ok(LoadoutConfig {
            energy_level: env.energy_level.ok_or(ApiError::MissingField("energy_level"))?,
            points_used: env.points_used.unwrap_or(0),
            points_limit: env.points_limit.unwrap_or(10),
        })
    }

    async fn set_energy_level(&self, level: EnergyLevel) -> Result<LoadoutConfig, ApiError> {
        let body = json!({ "energy_level": level });
        let env = self.post("setEnergyLevel", body).await?;
        Ok(LoadoutConfig {
            energy_level: env.energy_level.ok_or(ApiError::MissingField("energy_level"))?,
            points_used: env.points_used.unwrap_or(0),
            points_limit: env.points_limit.unwrap_or(10),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> HttpGateway {
        let base = Url::parse(&server.uri()).unwrap();
        HttpGateway::new(base, "tok-1".into()).unwrap()
    }

    #[tokio::test]
    async fn embedded_error_with_200_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "completeTask"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "task not found"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).await.complete_mission("t1").await.unwrap_err();
        assert!(matches!(err, ApiError::Api(m) if m == "task not found"));
    }

    #[tokio::test]
    async fn auth_failure_detected_from_error_text_despite_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getTasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "Invalid or expired session. Please log in again."
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).await.get_missions(Some("open"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthExpired));
    }

    #[tokio::test]
    async fn status_401_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = gateway(&server).await.clear_today("t1").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthExpired));
    }

    #[tokio::test]
    async fn invalid_slot_is_retried_once_with_legacy_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "assignToday"))
            .and(body_partial_json(json!({ "today_slot": "3" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "invalid today_slot: 3"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(query_param("action", "assignToday"))
            .and(body_partial_json(json!({ "today_slot": "M2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task": { "task_id": "t1", "today_slot": "M2" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .await
            .assign_today("t1", Some("3"), None)
            .await
            .unwrap();
        assert_eq!(outcome.mission.today_slot.as_deref(), Some("M2"));
    }

    #[tokio::test]
    async fn failed_legacy_retry_surfaces_the_original_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "assignToday"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "invalid today_slot: 3"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .assign_today("t1", Some("3"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api(m) if m == "invalid today_slot: 3"));
    }

    #[tokio::test]
    async fn non_slot_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "assignToday"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "task is archived"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .assign_today("t1", Some("3"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api(m) if m == "task is archived"));
    }

    #[tokio::test]
    async fn legacy_code_input_is_not_retried() {
        // A slot already in legacy form has no translation; one call only.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "assignToday"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "invalid today_slot: B1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .assign_today("t1", Some("B1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api(_)));
    }

    #[tokio::test]
    async fn get_missions_maps_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getTasks"))
            .and(query_param("status", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [
                    { "task_id": "t1", "title": "Water plants", "priority": "low" },
                    { "task_id": "t2", "title": "Fix latch", "challenge": "high" }
                ]
            })))
            .mount(&server)
            .await;

        let missions = gateway(&server).await.get_missions(Some("open"), None).await.unwrap();
        assert_eq!(missions.len(), 2);
        assert_eq!(missions[0].title, "Water plants");
        assert_eq!(missions[1].challenge, Some(crate::fields::Challenge::High));
    }

    #[tokio::test]
    async fn bulk_import_reports_per_line_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "bulkCreateTasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "success_count": 1,
                "error_count": 1,
                "results": [
                    { "index": 0, "success": true, "task": { "task_id": "t1" } },
                    { "index": 1, "success": false, "error": "title required" }
                ]
            })))
            .mount(&server)
            .await;

        let inputs = vec![CreateMissionInput {
            title: "Buy groceries".into(),
            ..CreateMissionInput::default()
        }];
        let outcome = gateway(&server).await.bulk_create_missions(&inputs).await.unwrap();
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].error.as_deref(), Some("title required"));
    }

    #[tokio::test]
    async fn login_returns_token_and_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "login"))
            .and(body_partial_json(json!({ "email": "john@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok-9",
                "userEmail": "john@example.com",
                "expiresAt": 1788200000
            })))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let outcome = HttpGateway::login(base, "john@example.com", "hunter2", DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.token, "tok-9");
        assert_eq!(outcome.email, "john@example.com");
        assert_eq!(outcome.expires_at, 1788200000);
    }

    #[tokio::test]
    async fn loadout_config_defaults_missing_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getLoadoutConfig"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "energy_level": "heavy"
            })))
            .mount(&server)
            .await;

        let config = gateway(&server).await.get_loadout_config().await.unwrap();
        assert_eq!(config.energy_level, EnergyLevel::Heavy);
        assert_eq!(config.points_used, 0);
        assert_eq!(config.points_limit, 10);
    }
}
