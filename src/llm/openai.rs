//! OpenAI Assistants client implementation
//!
//! Async HTTP client for the Assistants v2 API: assistants back agent personas,
//! threads back conversation contexts.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{AgencyError, Config, Result, ToolCall, ToolDefinition, ToolOutput};
use crate::llm::traits::{
    ConversationBackend, Persona, PersonaSpec, Run, RunStatus, Turn, TurnContent,
};

/// OpenAI Assistants API client
#[derive(Clone)]
pub struct OpenAiAssistants {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Assistant as returned by the API
#[derive(Debug, Deserialize)]
struct AssistantObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    model: String,
    #[serde(default)]
    tools: Vec<serde_json::Value>,
}

/// Thread as returned by the API
#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

/// Create message request
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

/// Create run request
#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

/// Submit tool outputs request
#[derive(Debug, Serialize)]
struct SubmitToolOutputsRequest<'a> {
    tool_outputs: &'a [ToolOutput],
}

/// Run as returned by the API
#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<RunToolCall>,
}

#[derive(Debug, Deserialize)]
struct RunToolCall {
    id: String,
    function: RunFunction,
}

#[derive(Debug, Deserialize)]
struct RunFunction {
    name: String,
    arguments: String,
}

/// Paginated message list
#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    value: String,
}

/// Wire body of an assistant create/update request
#[derive(Debug, Serialize)]
struct AssistantBody<'a> {
    model: &'a str,
    name: &'a str,
    description: &'a str,
    instructions: &'a str,
    tools: &'a [ToolDefinition],
}

impl<'a> From<&'a PersonaSpec> for AssistantBody<'a> {
    fn from(spec: &'a PersonaSpec) -> Self {
        Self {
            model: &spec.model,
            name: &spec.name,
            description: &spec.description,
            instructions: &spec.instructions,
            tools: &spec.tools,
        }
    }
}

impl From<AssistantObject> for Persona {
    fn from(assistant: AssistantObject) -> Self {
        Persona {
            id: assistant.id,
            name: assistant.name.unwrap_or_default(),
            description: assistant.description.unwrap_or_default(),
            instructions: assistant.instructions.unwrap_or_default(),
            model: assistant.model,
            tool_count: assistant.tools.len(),
        }
    }
}

impl From<RunObject> for Run {
    fn from(run: RunObject) -> Self {
        let required_action = run
            .required_action
            .map(|action| {
                action
                    .submit_tool_outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                    .collect()
            })
            .unwrap_or_default();

        Run {
            id: run.id,
            status: RunStatus::from(run.status.as_str()),
            required_action,
        }
    }
}

impl From<MessageObject> for Turn {
    fn from(message: MessageObject) -> Self {
        let content = message
            .content
            .into_iter()
            .map(|part| match (part.kind.as_str(), part.text) {
                ("text", Some(text)) => TurnContent::Text(text.value),
                _ => TurnContent::Other(part.kind),
            })
            .collect();

        Turn {
            id: message.id,
            role: message.role,
            content,
        }
    }
}

impl OpenAiAssistants {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            api_key: config.backend.api_key.clone(),
        })
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("OpenAI-Beta", "assistants=v2");
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        self.execute(self.authorize(request), path).await
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        self.execute(self.authorize(request), path).await
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<R> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                AgencyError::backend(format!("Cannot connect to {}", self.base_url))
            } else {
                AgencyError::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgencyError::backend(format!(
                "Assistants API error on {} ({}): {}",
                path, status, error_text
            )));
        }

        let response_text = response.text().await?;
        debug!(path, body = %response_text, "assistants api response");

        serde_json::from_str(&response_text)
            .map_err(|e| AgencyError::backend(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ConversationBackend for OpenAiAssistants {
    async fn create_persona(&self, spec: &PersonaSpec) -> Result<Persona> {
        let assistant: AssistantObject = self.post("/assistants", &AssistantBody::from(spec)).await?;
        Ok(assistant.into())
    }

    async fn retrieve_persona(&self, persona_id: &str) -> Result<Persona> {
        let assistant: AssistantObject = self.get(&format!("/assistants/{}", persona_id)).await?;
        Ok(assistant.into())
    }

    async fn update_persona(&self, persona_id: &str, spec: &PersonaSpec) -> Result<Persona> {
        let assistant: AssistantObject = self
            .post(&format!("/assistants/{}", persona_id), &AssistantBody::from(spec))
            .await?;
        Ok(assistant.into())
    }

    async fn create_context(&self) -> Result<String> {
        let thread: ThreadObject = self.post("/threads", &serde_json::json!({})).await?;
        Ok(thread.id)
    }

    async fn retrieve_context(&self, context_id: &str) -> Result<String> {
        let thread: ThreadObject = self.get(&format!("/threads/{}", context_id)).await?;
        Ok(thread.id)
    }

    async fn add_user_turn(&self, context_id: &str, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                &format!("/threads/{}/messages", context_id),
                &CreateMessageRequest {
                    role: "user",
                    content: text,
                },
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, context_id: &str, persona_id: &str) -> Result<Run> {
        let run: RunObject = self
            .post(
                &format!("/threads/{}/runs", context_id),
                &CreateRunRequest {
                    assistant_id: persona_id,
                },
            )
            .await?;
        Ok(run.into())
    }

    async fn retrieve_run(&self, context_id: &str, run_id: &str) -> Result<Run> {
        let run: RunObject = self
            .get(&format!("/threads/{}/runs/{}", context_id, run_id))
            .await?;
        Ok(run.into())
    }

    async fn list_turns(&self, context_id: &str) -> Result<Vec<Turn>> {
        let list: MessageList = self
            .get(&format!("/threads/{}/messages?order=desc", context_id))
            .await?;
        Ok(list.data.into_iter().map(Turn::from).collect())
    }

    async fn submit_tool_outputs(
        &self,
        context_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let run: RunObject = self
            .post(
                &format!(
                    "/threads/{}/runs/{}/submit_tool_outputs",
                    context_id, run_id
                ),
                &SubmitToolOutputsRequest {
                    tool_outputs: outputs,
                },
            )
            .await?;
        Ok(run.into())
    }

    fn name(&self) -> &str {
        "openai-assistants"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_required_action() {
        let run: RunObject = serde_json::from_value(serde_json::json!({
            "id": "run_1",
            "object": "thread.run",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "OperationTool", "arguments": "{\"operation\":\"add\"}"}
                    }]
                }
            }
        }))
        .unwrap();

        let run = Run::from(run);
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(run.required_action.len(), 1);
        assert_eq!(run.required_action[0].name, "OperationTool");
        assert_eq!(run.required_action[0].arguments, "{\"operation\":\"add\"}");
    }

    #[test]
    fn test_unknown_status_is_failure() {
        let run: RunObject =
            serde_json::from_value(serde_json::json!({"id": "run_2", "status": "expired"}))
                .unwrap();
        assert_eq!(Run::from(run).status, RunStatus::Failed("expired".into()));
    }

    #[test]
    fn test_message_content_kinds() {
        let message: MessageObject = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "Hello", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file_1"}}
            ]
        }))
        .unwrap();

        let turn = Turn::from(message);
        assert_eq!(
            turn.content,
            vec![
                TurnContent::Text("Hello".into()),
                TurnContent::Other("image_file".into())
            ]
        );
    }

    #[test]
    fn test_assistant_to_persona() {
        let assistant: AssistantObject = serde_json::from_value(serde_json::json!({
            "id": "asst_1",
            "name": "MathAgent",
            "description": null,
            "instructions": "Be precise",
            "model": "gpt-4-turbo-2024-04-09",
            "tools": [{"type": "function", "function": {"name": "OperationTool"}}]
        }))
        .unwrap();

        let persona = Persona::from(assistant);
        assert_eq!(persona.name, "MathAgent");
        assert_eq!(persona.description, "");
        assert_eq!(persona.tool_count, 1);
    }
}
