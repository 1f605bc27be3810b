//! Assistants API client tests against a mock HTTP server

use agency::core::{ToolDefinition, ToolOutput};
use agency::llm::{ConversationBackend, OpenAiAssistants, PersonaSpec, RunStatus, TurnContent};
use agency::AgencyError;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAiAssistants {
    OpenAiAssistants::with_base_url(server.uri(), Some("test-key".to_string())).unwrap()
}

fn math_spec() -> PersonaSpec {
    PersonaSpec {
        name: "MathAgent".into(),
        description: "Solves operations".into(),
        instructions: "Use OperationTool".into(),
        model: "gpt-4-turbo-preview".into(),
        tools: vec![ToolDefinition::function(
            "OperationTool",
            "Performs an arithmetic operation",
            json!({"type": "object"}),
        )],
    }
}

#[tokio::test]
async fn create_persona_sends_assistant_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .and(body_partial_json(json!({
            "name": "MathAgent",
            "model": "gpt-4-turbo-preview",
            "tools": [{"type": "function", "function": {"name": "OperationTool"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_abc",
            "object": "assistant",
            "name": "MathAgent",
            "description": "Solves operations",
            "instructions": "Use OperationTool",
            "model": "gpt-4-turbo-preview",
            "tools": [{"type": "function", "function": {"name": "OperationTool"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let persona = client(&server).create_persona(&math_spec()).await.unwrap();
    assert_eq!(persona.id, "asst_abc");
    assert_eq!(persona.name, "MathAgent");
    assert_eq!(persona.tool_count, 1);
}

#[tokio::test]
async fn update_persona_posts_to_the_assistant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/assistants/asst_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_abc",
            "name": "MathAgent",
            "instructions": "Use OperationTool",
            "model": "gpt-4-turbo-preview",
            "tools": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let persona = client(&server)
        .update_persona("asst_abc", &math_spec())
        .await
        .unwrap();
    assert_eq!(persona.id, "asst_abc");
    assert_eq!(persona.description, "");
    assert_eq!(persona.tool_count, 0);
}

#[tokio::test]
async fn contexts_and_user_turns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "thread_1",
            "object": "thread"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_json(json!({"role": "user", "content": "2+2?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let id = backend.create_context().await.unwrap();
    assert_eq!(id, "thread_1");
    assert_eq!(backend.retrieve_context(&id).await.unwrap(), "thread_1");
    backend.add_user_turn(&id, "2+2?").await.unwrap();
}

#[tokio::test]
async fn runs_decode_required_actions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_json(json!({"assistant_id": "asst_abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "queued"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [
                        {
                            "id": "call_a",
                            "type": "function",
                            "function": {"name": "OperationTool", "arguments": "{\"operation\":\"add\",\"number1\":2,\"number2\":2}"}
                        },
                        {
                            "id": "call_b",
                            "type": "function",
                            "function": {"name": "TalkToAgent", "arguments": "{}"}
                        }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs/run_1/submit_tool_outputs"))
        .and(body_json(json!({
            "tool_outputs": [
                {"tool_call_id": "call_a", "output": "4"},
                {"tool_call_id": "call_b", "output": "ERROR"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "in_progress"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let run = backend.create_run("thread_1", "asst_abc").await.unwrap();
    assert_eq!(run.status, RunStatus::Queued);
    assert!(run.required_action.is_empty());

    let run = backend.retrieve_run("thread_1", "run_1").await.unwrap();
    assert_eq!(run.status, RunStatus::RequiresAction);
    let names: Vec<&str> = run.required_action.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["OperationTool", "TalkToAgent"]);
    assert_eq!(run.required_action[0].id, "call_a");

    let run = backend
        .submit_tool_outputs(
            "thread_1",
            "run_1",
            &[ToolOutput::new("call_a", "4"), ToolOutput::new("call_b", "ERROR")],
        )
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::InProgress);
}

#[tokio::test]
async fn list_turns_newest_first_with_non_text_parts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{"type": "image_file", "image_file": {"file_id": "file_1"}}]
                },
                {
                    "id": "msg_1",
                    "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "4", "annotations": []}}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let turns = client(&server).list_turns("thread_1").await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, vec![TurnContent::Other("image_file".into())]);
    assert_eq!(turns[1].content, vec![TurnContent::Text("4".into())]);
    assert_eq!(turns[1].role, "assistant");
}

#[tokio::test]
async fn error_status_is_a_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assistants/asst_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No assistant found with id 'asst_gone'."}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_persona("asst_gone")
        .await
        .unwrap_err();
    match err {
        AgencyError::Backend(message) => {
            assert!(message.contains("404"));
            assert!(message.contains("No assistant found"));
        }
        other => panic!("expected a backend error, got {:?}", other),
    }
}
