//! Test doubles shared by the integration tests: a scripted inference
//! provider, canned user input, a display that records what it was shown,
//! and a one-shot HTTP responder standing in for an Ollama server.

use application::ports::{DisplaySurface, InputSource, Prompt};
use domain::{CompletionRequest, FragmentStream, InferenceProvider, ProviderError, SessionError};
use futures::stream::{self, StreamExt};
use shared::types::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the scripted provider answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Fragments(Vec<String>),
    FailAfter(Vec<String>, ProviderError),
    Refuse(ProviderError),
}

impl Reply {
    pub fn text(fragments: &[&str]) -> Self {
        Reply::Fragments(fragments.iter().map(|f| f.to_string()).collect())
    }

    pub fn broken(fragments: &[&str], reason: &str) -> Self {
        Reply::FailAfter(
            fragments.iter().map(|f| f.to_string()).collect(),
            ProviderError::Stream(reason.to_string()),
        )
    }

    pub fn unreachable() -> Self {
        Reply::Refuse(ProviderError::Unreachable {
            endpoint: "http://localhost:11434".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

#[derive(Default)]
struct ProviderState {
    replies: VecDeque<Reply>,
    requests: Vec<CompletionRequest>,
}

/// Answers requests from a queue and records every request it saw.
/// Clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                replies: replies.into(),
                requests: Vec::new(),
            })),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

impl InferenceProvider for ScriptedProvider {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<FragmentStream, ProviderError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| Reply::Fragments(Vec::new()))
        };
        let items: Vec<std::result::Result<String, ProviderError>> = match reply {
            Reply::Refuse(err) => return Err(err),
            Reply::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            Reply::FailAfter(fragments, err) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(err)))
                .collect(),
        };
        Ok(stream::iter(items).boxed())
    }
}

/// Hands out canned answers in order; once they run out the input is closed.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    pub prompts: Vec<Prompt>,
}

impl ScriptedInput {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            prompts: Vec::new(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn read_text(&mut self, prompt: Prompt) -> Result<Option<String>> {
        self.prompts.push(prompt);
        Ok(self.answers.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    SessionStarted,
    Analyzing,
    Partial(String),
    Finished(String),
    Failed {
        message: String,
        partial: Option<String>,
        guidance: bool,
        model_not_found: bool,
    },
    Farewell,
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub shown: Vec<Shown>,
}

impl RecordingDisplay {
    pub fn finished(&self) -> Vec<String> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Finished(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&Shown> {
        self.shown
            .iter()
            .filter(|s| matches!(s, Shown::Failed { .. }))
            .collect()
    }
}

impl DisplaySurface for RecordingDisplay {
    fn session_started(&mut self) {
        self.shown.push(Shown::SessionStarted);
    }

    fn analyzing(&mut self) {
        self.shown.push(Shown::Analyzing);
    }

    fn partial(&mut self, text: &str) {
        self.shown.push(Shown::Partial(text.to_string()));
    }

    fn finished(&mut self, text: &str) {
        self.shown.push(Shown::Finished(text.to_string()));
    }

    fn turn_failed(&mut self, error: &SessionError) {
        self.shown.push(Shown::Failed {
            message: error.to_string(),
            partial: error.partial_text().map(str::to_string),
            guidance: error.guidance().is_some(),
            model_not_found: error.is_model_not_found(),
        });
    }

    fn farewell(&mut self) {
        self.shown.push(Shown::Farewell);
    }
}

/// Accepts one HTTP connection, records the request body and answers with
/// `status_line` and `body_parts`, written one at a time.
pub async fn serve_once(
    status_line: &str,
    content_type: &str,
    body_parts: Vec<String>,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let head = format!(
        "HTTP/1.1 {}\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
        status_line, content_type
    );
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let body = read_request_body(&mut socket).await;
        socket.write_all(head.as_bytes()).await.unwrap();
        for part in body_parts {
            socket.write_all(part.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
        body
    });
    (base_url, handle)
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).to_string();
            }
        }
    }
    String::new()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// One NDJSON record as Ollama streams it.
pub fn ollama_line(content: &str) -> String {
    format!(
        "{{\"model\":\"llama3\",\"message\":{{\"role\":\"assistant\",\"content\":{}}},\"done\":false}}\n",
        serde_json::to_string(content).unwrap()
    )
}

pub fn ollama_done() -> String {
    "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n"
        .to_string()
}
