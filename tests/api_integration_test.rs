//! Integration tests for the REST API
//!
//! The router is exercised in-process with `oneshot`. The MCP server and the
//! model are replaced by recording fakes so each test can assert on what was
//! sent to the tool server and whether the connection was closed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kb_bridge::adapters::agent_factory::{AgentFactory, FILES_AGENT_NAME, KB_AGENT_NAME};
use kb_bridge::adapters::api_handler::{ApiState, FILES_INSTRUCTION};
use kb_bridge::agents::memory::InMemoryStore;
use kb_bridge::agents::{Agent, AgentError, AgentResult, AgentRuntime, LlmError, RunOutput, Session};
use kb_bridge::domain::{ConnectionState, Tool, ToolClient, ToolClientError, ToolConnector, ToolOutput};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const LOCAL_ENDPOINT: &str = "http://localhost:3000/mcp";
const REMOTE_ENDPOINT: &str = "https://kb.example.workers.dev/mcp";
const BOUNDARY: &str = "kb-bridge-test-boundary";

// ============================================================================
// Fakes
// ============================================================================

type Reply = Box<dyn Fn(&str, &Value) -> Result<ToolOutput, ToolClientError> + Send + Sync>;

/// Tool client recording every call and close
struct RecordingClient {
    reply: Reply,
    calls: Mutex<Vec<(String, Value)>>,
    staged_file_existed: Mutex<Option<bool>>,
    closes: AtomicUsize,
}

#[async_trait]
impl ToolClient for RecordingClient {
    fn endpoint(&self) -> &str {
        LOCAL_ENDPOINT
    }

    async fn state(&self) -> ConnectionState {
        if self.closes.load(Ordering::SeqCst) > 0 {
            ConnectionState::Closed
        } else {
            ConnectionState::Connected
        }
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ToolClientError> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolClientError> {
        if let Some(path) = arguments.get("file_path").and_then(Value::as_str) {
            *self.staged_file_existed.lock().unwrap() = Some(Path::new(path).exists());
        }
        let reply = (self.reply)(name, &arguments);
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        reply
    }

    async fn close(&self) -> Result<(), ToolClientError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out the same recording client every time
struct FakeConnector {
    endpoint: String,
    client: Arc<RecordingClient>,
    connects: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ToolConnector for FakeConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Arc<dyn ToolClient>, ToolClientError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ToolClientError::Connect {
                endpoint: self.endpoint.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.client.clone())
    }
}

type Script = Box<dyn Fn(&Agent, &str) -> AgentResult<RunOutput> + Send + Sync>;

/// Runtime answering from a script instead of a model
struct ScriptedRuntime {
    script: Script,
    runs: Mutex<Vec<(String, String, Option<String>)>>,
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn run(
        &self,
        agent: &Agent,
        input: &str,
        session: Option<&Session>,
    ) -> AgentResult<RunOutput> {
        self.runs.lock().unwrap().push((
            agent.name.clone(),
            input.to_string(),
            session.map(|s| s.id().to_string()),
        ));
        (self.script)(agent, input)
    }
}

struct Harness {
    app: Router,
    connector: Arc<FakeConnector>,
    client: Arc<RecordingClient>,
    runtime: Arc<ScriptedRuntime>,
}

impl Harness {
    fn new(endpoint: &str, reply: Reply, script: Script) -> Self {
        Self::build(endpoint, reply, script, false)
    }

    fn build(endpoint: &str, reply: Reply, script: Script, fail: bool) -> Self {
        Self::with_body_limit(endpoint, reply, script, fail, 50 * 1024 * 1024)
    }

    fn with_body_limit(
        endpoint: &str,
        reply: Reply,
        script: Script,
        fail: bool,
        max_body_bytes: usize,
    ) -> Self {
        let client = Arc::new(RecordingClient {
            reply,
            calls: Mutex::new(Vec::new()),
            staged_file_existed: Mutex::new(None),
            closes: AtomicUsize::new(0),
        });
        let connector = Arc::new(FakeConnector {
            endpoint: endpoint.to_string(),
            client: client.clone(),
            connects: AtomicUsize::new(0),
            fail,
        });
        let runtime = Arc::new(ScriptedRuntime {
            script,
            runs: Mutex::new(Vec::new()),
        });

        let state = ApiState {
            factory: Arc::new(AgentFactory::new(
                connector.clone(),
                "You are a knowledge base assistant.",
                "gpt-4o-mini",
            )),
            runtime: runtime.clone(),
            sessions: Arc::new(InMemoryStore::new()),
        };

        Self {
            app: kb_bridge::create_app(state, max_body_bytes),
            connector,
            client,
            runtime,
        }
    }

    fn with_reply(endpoint: &str, reply: Reply) -> Self {
        Self::new(endpoint, reply, Box::new(|_, _| Ok(RunOutput::Text(String::new()))))
    }

    fn with_script(script: Script) -> Self {
        Self::new(LOCAL_ENDPOINT, Box::new(|_, _| Ok(ToolOutput::text("ok"))), script)
    }

    fn connects(&self) -> usize {
        self.connector.connects.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.client.closes.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.client.calls.lock().unwrap().clone()
    }

    fn runs(&self) -> Vec<(String, String, Option<String>)> {
        self.runtime.runs.lock().unwrap().clone()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn multipart_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .uri("/api/upload")
        .method("POST")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload_success(_name: &str, _args: &Value) -> Result<ToolOutput, ToolClientError> {
    Ok(ToolOutput::text(
        json!({"success": true, "document": {"id": "doc-1"}}).to_string(),
    ))
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::with_script(Box::new(|_, _| Ok(RunOutput::Text(String::new()))));

    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "server": "running"}));
    assert_eq!(harness.connects(), 0);
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_keeps_given_session_id() {
    let harness = Harness::with_script(Box::new(|_, input| {
        Ok(RunOutput::Text(format!("You asked: {}", input)))
    }));

    let (status, body) = harness
        .send(json_request(
            "POST",
            "/api/chat",
            json!({"message": "What is in my notes?", "session_id": "abc"}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "You asked: What is in my notes?");
    assert_eq!(body["status"], "success");
    assert_eq!(body["session_id"], "abc");

    let runs = harness.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, KB_AGENT_NAME);
    assert_eq!(runs[0].2.as_deref(), Some("abc"));
    assert_eq!(harness.connects(), 1);
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_chat_mints_session_id() {
    let harness = Harness::with_script(Box::new(|_, _| Ok(RunOutput::Text("Hello".into()))));

    let (status, body) = harness
        .send(json_request(
            "POST",
            "/api/chat",
            json!({"message": "hi", "conversation_history": [{"role": "user"}]}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(session_id).is_ok());
    assert_eq!(harness.runs()[0].2.as_deref(), Some(session_id));
}

#[tokio::test]
async fn test_chat_runtime_failure_still_closes_connection() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Err(AgentError::Llm(LlmError::Api {
            status: 500,
            message: "model unavailable".to_string(),
        }))
    }));

    let (status, body) = harness
        .send(json_request("POST", "/api/chat", json!({"message": "hi"})))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("model unavailable"));
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_chat_connect_failure_has_nothing_to_close() {
    let harness = Harness::build(
        LOCAL_ENDPOINT,
        Box::new(|_, _| Ok(ToolOutput::text("ok"))),
        Box::new(|_, _| Ok(RunOutput::Text("unused".into()))),
        true,
    );

    let (status, body) = harness
        .send(json_request("POST", "/api/chat", json!({"message": "hi"})))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
    assert_eq!(harness.connects(), 1);
    assert_eq!(harness.closes(), 0);
    assert!(harness.runs().is_empty());
}

// ============================================================================
// File listing
// ============================================================================

#[tokio::test]
async fn test_list_files_structured_output() {
    let listing = json!({"files": [
        {"id": "1", "filename": "notes.pdf", "created_at": "2024-05-01T10:00:00Z"}
    ]});
    let expected = listing.clone();
    let harness = Harness::with_script(Box::new(move |_, _| {
        Ok(RunOutput::Structured(listing.clone()))
    }));

    let request = Request::builder()
        .uri("/api/files")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected);

    let runs = harness.runs();
    assert_eq!(runs[0].0, FILES_AGENT_NAME);
    assert_eq!(runs[0].1, FILES_INSTRUCTION);
    assert_eq!(runs[0].2, None);
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_list_files_unparsable_output_falls_back() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Ok(RunOutput::Text("I could not find any files.".into()))
    }));

    let request = Request::builder()
        .uri("/api/files")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"files": [], "error": "Could not parse files list"}));
    assert_eq!(harness.closes(), 1);
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_delete_without_ids_is_rejected_before_connecting() {
    let harness = Harness::with_script(Box::new(|_, _| Ok(RunOutput::Text("deleted".into()))));

    let (status, body) = harness
        .send(json_request("DELETE", "/api/files", json!({"document_ids": []})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Either document_id or document_ids must be provided"
    );
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_delete_without_body_is_rejected() {
    let harness = Harness::with_script(Box::new(|_, _| Ok(RunOutput::Text("deleted".into()))));

    let request = Request::builder()
        .uri("/api/files")
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, _) = harness.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_bulk_delete() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Ok(RunOutput::Text("Successfully deleted 2 documents.".into()))
    }));

    let (status, body) = harness
        .send(json_request(
            "DELETE",
            "/api/files",
            json!({"document_ids": ["a", "b"]}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Successfully deleted 2 document(s)");
    assert_eq!(body["details"], "Successfully deleted 2 documents.");
    assert_eq!(
        harness.runs()[0].1,
        "Please use the delete_documents tool to delete multiple documents with ids: [\"a\", \"b\"]"
    );
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_single_delete_prefers_document_id() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Ok(RunOutput::Text("The document has been deleted.".into()))
    }));

    let (status, body) = harness
        .send(json_request(
            "DELETE",
            "/api/files",
            json!({"document_id": "x", "document_ids": ["a", "b"]}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully deleted 1 document(s)");
    assert_eq!(
        harness.runs()[0].1,
        "Please use the delete_document tool to delete the document with id: x"
    );
}

#[tokio::test]
async fn test_legacy_delete_route() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Ok(RunOutput::Text("Successfully removed.".into()))
    }));

    let request = Request::builder()
        .uri("/api/files/doc-42")
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully deleted 1 document(s)");
    assert_eq!(
        harness.runs()[0].1,
        "Please use the delete_document tool to delete the document with id: doc-42"
    );
}

#[tokio::test]
async fn test_unconfirmed_delete_is_an_error() {
    let harness = Harness::with_script(Box::new(|_, _| {
        Ok(RunOutput::Text("Document not found".into()))
    }));

    let (status, body) = harness
        .send(json_request("DELETE", "/api/files", json!({"document_id": "x"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Document not found");
    assert_eq!(harness.closes(), 1);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_without_file_field() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));

    let (status, body) = harness
        .send(multipart_request("attachment", "notes.pdf", b"data"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No filename provided");
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));

    let (status, _) = harness.send(multipart_request("file", "", b"data")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_upload_image_sends_base64() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));
    let data = b"\x89PNG\r\n\x1a\nimage-bytes";

    let (status, body) = harness
        .send(multipart_request("file", "diagram.PNG", data))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["filename"], "diagram.PNG");
    assert_eq!(body["document_id"], "doc-1");
    assert_eq!(body["message"], "Successfully uploaded diagram.PNG");

    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "upload_image");
    assert_eq!(calls[0].1["original_filename"], "diagram.PNG");
    let encoded = calls[0].1["file_base64"].as_str().unwrap();
    assert_eq!(STANDARD.decode(encoded).unwrap(), data);
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_local_document_is_staged_and_removed() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));

    let (status, body) = harness
        .send(multipart_request("file", "report.pdf", b"%PDF-1.4 body"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_id"], "doc-1");

    let calls = harness.calls();
    assert_eq!(calls[0].0, "upload_document");
    let path = calls[0].1["file_path"].as_str().unwrap().to_string();
    assert!(path.ends_with(".pdf"));
    assert_eq!(*harness.client.staged_file_existed.lock().unwrap(), Some(true));
    assert!(!Path::new(&path).exists());
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_local_document_removed_after_tool_failure() {
    let harness = Harness::with_reply(
        LOCAL_ENDPOINT,
        Box::new(|_, _| Err(ToolClientError::Transport("server error".to_string()))),
    );

    let (status, body) = harness
        .send(multipart_request("file", "report.docx", b"content"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "MCP transport error: server error");

    let calls = harness.calls();
    let path = calls[0].1["file_path"].as_str().unwrap();
    assert!(!Path::new(path).exists());
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_remote_document_sends_base64() {
    let harness = Harness::with_reply(REMOTE_ENDPOINT, Box::new(upload_success));

    let (status, _) = harness
        .send(multipart_request("file", "notes.txt", b"hello world"))
        .await;

    assert_eq!(status, StatusCode::OK);
    let calls = harness.calls();
    assert_eq!(calls[0].0, "upload_document");
    assert!(calls[0].1.get("file_path").is_none());
    assert_eq!(calls[0].1["original_filename"], "notes.txt");
    assert_eq!(
        STANDARD
            .decode(calls[0].1["file_base64"].as_str().unwrap())
            .unwrap(),
        b"hello world"
    );
}

#[tokio::test]
async fn test_oversized_document_rejected_before_connecting() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));
    let data = vec![b'a'; 10 * 1024 * 1024 + 1];

    let (status, body) = harness
        .send(multipart_request("file", "big.pdf", &data))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body["detail"],
        "File too large: 10.00 MB. Maximum size is 10 MB."
    );
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_remote_document_over_two_megabytes_rejected() {
    let harness = Harness::with_reply(REMOTE_ENDPOINT, Box::new(upload_success));
    let data = vec![b'a'; 3 * 1024 * 1024];

    let (status, body) = harness
        .send(multipart_request("file", "medium.pdf", &data))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("2MB"));
    assert!(detail.contains("3.00 MB"));
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_local_document_over_two_megabytes_accepted() {
    let harness = Harness::with_reply(LOCAL_ENDPOINT, Box::new(upload_success));
    let data = vec![b'a'; 3 * 1024 * 1024];

    let (status, _) = harness
        .send(multipart_request("file", "medium.pdf", &data))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.connects(), 1);
}

#[tokio::test]
async fn test_remote_upload_timeout() {
    let harness = Harness::with_reply(
        REMOTE_ENDPOINT,
        Box::new(|_, _| {
            Err(ToolClientError::Timeout {
                operation: "call_tool".to_string(),
                seconds: 120,
            })
        }),
    );

    let (status, body) = harness
        .send(multipart_request("file", "notes.pdf", b"content"))
        .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["detail"], "Upload timed out. Please try a smaller file.");
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_upload_failure_reported_by_tool() {
    let harness = Harness::with_reply(
        LOCAL_ENDPOINT,
        Box::new(|_, _| {
            Ok(ToolOutput::text(
                json!({"success": false, "error": "Unsupported format", "details": "xyz"})
                    .to_string(),
            ))
        }),
    );

    let (status, body) = harness
        .send(multipart_request("file", "photo.webp", b"bytes"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Unsupported format: xyz");
    assert_eq!(harness.closes(), 1);
}

#[tokio::test]
async fn test_upload_plain_text_reply_is_success() {
    let harness = Harness::with_reply(
        LOCAL_ENDPOINT,
        Box::new(|_, _| Ok(ToolOutput::from_value(json!(["stored"])))),
    );

    let (status, body) = harness
        .send(multipart_request("file", "photo.jpg", b"bytes"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Uploaded photo.jpg");
    assert_eq!(body["details"], "stored");
    assert_eq!(body["document_id"], Value::Null);
}

#[tokio::test]
async fn test_upload_over_body_limit_is_payload_too_large() {
    let harness = Harness::with_body_limit(
        LOCAL_ENDPOINT,
        Box::new(upload_success),
        Box::new(|_, _| Ok(RunOutput::Text(String::new()))),
        false,
        12 * 1024 * 1024,
    );
    let data = vec![b'a'; 13 * 1024 * 1024];

    let (status, body) = harness
        .send(multipart_request("file", "huge.pdf", &data))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["detail"].is_string());
    assert_eq!(harness.connects(), 0);
}

#[tokio::test]
async fn test_staged_file_already_removed_by_tool() {
    let harness = Harness::with_reply(
        LOCAL_ENDPOINT,
        Box::new(|_, args| {
            let path = args["file_path"].as_str().unwrap();
            std::fs::remove_file(path).unwrap();
            upload_success("upload_document", args)
        }),
    );

    let (status, body) = harness
        .send(multipart_request("file", "consumed.pdf", b"content"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_id"], "doc-1");
    assert_eq!(*harness.client.staged_file_existed.lock().unwrap(), Some(true));
    let calls = harness.calls();
    assert!(!Path::new(calls[0].1["file_path"].as_str().unwrap()).exists());
    assert_eq!(harness.closes(), 1);
}
