//! Generation service client
//!
//! Sends assembled planning briefs to the Claude API and pulls the optional
//! JSON roadmap back out of the reply. The reply itself is not validated.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::MesocyclePhase;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const API_VERSION: &str = "2023-06-01";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  #[allow(dead_code)]
  model: String,
  #[allow(dead_code)]
  stop_reason: Option<String>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Generated Plan
/// ---------------------------------------------------------------------------

/// Reply to a planning brief
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
  pub text: String,
  /// Structured roadmap, when the reply carried one
  pub roadmap: Option<Vec<MesocyclePhase>>,
  pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct RoadmapEnvelope {
  mesocycle_roadmap: Vec<MesocyclePhase>,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct GenerationClient {
  client: Client,
  api_key: String,
  api_url: String,
  model: String,
  max_tokens: u32,
}

impl GenerationClient {
  /// Create a client from loaded configuration; the API key is required here
  pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
    let api_key = config.api_key.clone().ok_or(LlmError::MissingApiKey)?;

    Ok(Self {
      client: Client::new(),
      api_key,
      api_url: config.api_url.to_string(),
      model: config.model.clone(),
      max_tokens: config.max_tokens,
    })
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    tracing::debug!(model = %self.model, chars = user_message.len(), "Sending generation request");

    let response = self
      .client
      .post(&self.api_url)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      // Try to parse error response
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    // Extract text from the first text content block
    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }

  /// Send an assembled planning brief
  pub async fn generate_mesocycle(&self, prompt: &str) -> Result<GeneratedPlan, LlmError> {
    let system_prompt = include_str!("prompts/planner_system.txt");

    let (text, usage) = self.complete(system_prompt, prompt, self.max_tokens).await?;
    let roadmap = extract_roadmap(&text);

    tracing::info!(
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      roadmap_phases = roadmap.as_ref().map_or(0, Vec::len),
      "Generation complete"
    );

    Ok(GeneratedPlan {
      text,
      roadmap,
      usage,
    })
  }
}

/// Pull a `{"mesocycle_roadmap": [...]}` block out of generated text
pub fn extract_roadmap(text: &str) -> Option<Vec<MesocyclePhase>> {
  let json_str = extract_json(text).ok()?;
  serde_json::from_str::<RoadmapEnvelope>(&json_str)
    .ok()
    .map(|envelope| envelope.mesocycle_roadmap)
    .filter(|phases| !phases.is_empty())
}

/// Plain-text roadmap for storage and later briefs, one line per phase
pub fn roadmap_text(phases: &[MesocyclePhase]) -> String {
  phases
    .iter()
    .map(|p| {
      format!(
        "Mesocycle {}: {} | {} | {} | {} weeks | {} blocks",
        p.mesocycle_number, p.phase_name, p.rep_focus, p.emphasis, p.weeks, p.blocks
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Extract JSON from Claude's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  const ROADMAP_REPLY: &str = r#"Mesocycle 1 — Hypertrophy: 8-12 reps, 6 weeks, 2 blocks
Mesocycle 2 — Strength: 4-6 reps, 4 weeks, 1 block

```json
{"mesocycle_roadmap": [
  {"mesocycleNumber": 1, "phaseName": "Hypertrophy", "repFocus": "8-12 reps", "emphasis": "Volume", "weeks": 6, "blocks": 2},
  {"mesocycleNumber": 2, "phaseName": "Strength", "repFocus": "4-6 reps", "emphasis": "Intensity", "weeks": 4, "blocks": 1}
]}
```"#;

  fn test_config(api_url: &str) -> AppConfig {
    AppConfig {
      database_path: "/tmp/unused.db".into(),
      api_key: Some("test-key".to_string()),
      model: "claude-test".to_string(),
      api_url: Url::parse(api_url).unwrap(),
      max_tokens: 1024,
    }
  }

  #[test]
  fn test_extract_json_direct() {
    let input = r#"{"mesocycle_roadmap": []}"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("mesocycle_roadmap"));
  }

  #[test]
  fn test_extract_json_code_block() {
    let input = r#"Here's the plan:

```json
{"summary": "Good block"}
```

Train hard!"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("Good block"));
  }

  #[test]
  fn test_extract_json_fallback() {
    let input = r#"The roadmap is {"mesocycle_roadmap": []} as shown."#;
    let result = extract_json(input).unwrap();
    assert!(result.starts_with('{') && result.ends_with('}'));
  }

  #[test]
  fn test_extract_roadmap_from_reply() {
    let phases = extract_roadmap(ROADMAP_REPLY).expect("Should find roadmap");
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[1].phase_name, "Strength");
    assert_eq!(phases[1].weeks, 4);
  }

  #[test]
  fn test_extract_roadmap_absent() {
    assert!(extract_roadmap("Week 1: squat, bench, row.").is_none());
    assert!(extract_roadmap(r#"{"mesocycle_roadmap": []}"#).is_none());
  }

  #[test]
  fn test_roadmap_text_lists_phases_only() {
    let phases = extract_roadmap(ROADMAP_REPLY).unwrap();
    assert_eq!(
      roadmap_text(&phases),
      "Mesocycle 1: Hypertrophy | 8-12 reps | Volume | 6 weeks | 2 blocks\n\
       Mesocycle 2: Strength | 4-6 reps | Intensity | 4 weeks | 1 blocks"
    );
  }

  #[test]
  fn test_client_requires_api_key() {
    let mut config = test_config("http://localhost/v1/messages");
    config.api_key = None;
    assert!(matches!(
      GenerationClient::from_config(&config),
      Err(LlmError::MissingApiKey)
    ));
  }

  #[tokio::test]
  async fn test_generate_mesocycle_success() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "content": [{"type": "text", "text": ROADMAP_REPLY}],
      "model": "claude-test",
      "stop_reason": "end_turn",
      "usage": {"input_tokens": 120, "output_tokens": 480}
    });
    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "test-key")
      .match_header("anthropic-version", API_VERSION)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let client = GenerationClient::from_config(&test_config(&format!("{}/v1/messages", server.url()))).unwrap();
    let plan = client.generate_mesocycle("Design Mesocycle 1 of 2").await.unwrap();

    mock.assert_async().await;
    assert_eq!(plan.usage.output_tokens, 480);
    assert!(plan.text.contains("Mesocycle 2"));
    assert_eq!(plan.roadmap.map(|r| r.len()), Some(2));
  }

  #[tokio::test]
  async fn test_generate_mesocycle_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(429)
      .with_body(r#"{"type": "error", "error": {"type": "rate_limit_error", "message": "Rate limited"}}"#)
      .create_async()
      .await;

    let client = GenerationClient::from_config(&test_config(&format!("{}/v1/messages", server.url()))).unwrap();
    let err = client.generate_mesocycle("brief").await.unwrap_err();

    assert!(matches!(err, LlmError::Api(ref msg) if msg == "Rate limited"));
  }

  #[tokio::test]
  async fn test_generate_mesocycle_without_text_block() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "content": [],
      "model": "claude-test",
      "stop_reason": "end_turn",
      "usage": {"input_tokens": 10, "output_tokens": 0}
    });
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(200)
      .with_body(body.to_string())
      .create_async()
      .await;

    let client = GenerationClient::from_config(&test_config(&format!("{}/v1/messages", server.url()))).unwrap();
    let err = client.generate_mesocycle("brief").await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
  }
}
