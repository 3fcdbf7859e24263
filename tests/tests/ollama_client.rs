use application::session_loop::SessionLoop;
use domain::{CompletionRequest, InferenceProvider, Message, ProviderError, SessionConfig};
use futures::StreamExt;
use infrastructure::ollama_client::OllamaClient;
use tests::{
    dead_url, ollama_done, ollama_line, serve_once, RecordingDisplay, ScriptedInput, Shown,
};

fn request(model: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        temperature: 0.5,
        messages: vec![Message::system("sys"), Message::user("hello")],
    }
}

#[tokio::test]
async fn test_streams_fragments_and_sends_history() {
    let (url, server) = serve_once(
        "200 OK",
        "application/x-ndjson",
        vec![
            ollama_line("Anal"),
            ollama_line("ysis"),
            ollama_line(": done"),
            ollama_done(),
        ],
    )
    .await;

    let client = OllamaClient::new(url);
    let stream = client.stream_completion(request("llama3")).await.unwrap();
    let fragments: Vec<String> = stream.map(Result::unwrap).collect().await;
    assert_eq!(fragments, vec!["Anal", "ysis", ": done"]);

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "llama3");
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["options"]["temperature"], 0.5);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["content"], "hello");
}

#[tokio::test]
async fn test_404_is_model_not_found() {
    let (url, _server) = serve_once(
        "404 Not Found",
        "application/json",
        vec!["{\"error\":\"model \\\"ghost\\\" not found, try pulling it first\"}".to_string()],
    )
    .await;

    let err = OllamaClient::new(url)
        .stream_completion(request("ghost"))
        .await
        .err()
        .unwrap();
    assert_eq!(
        err,
        ProviderError::ModelNotFound {
            model: "ghost".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_error_is_rejected_with_message() {
    let (url, _server) = serve_once(
        "500 Internal Server Error",
        "application/json",
        vec!["{\"error\":\"llama runner process has terminated\"}".to_string()],
    )
    .await;

    let err = OllamaClient::new(url)
        .stream_completion(request("llama3"))
        .await
        .err()
        .unwrap();
    assert_eq!(
        err,
        ProviderError::Rejected {
            status: 500,
            body: "llama runner process has terminated".to_string()
        }
    );
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let url = dead_url().await;
    let err = OllamaClient::new(url.clone())
        .stream_completion(request("llama3"))
        .await
        .err()
        .unwrap();
    match err {
        ProviderError::Unreachable { endpoint, .. } => assert_eq!(endpoint, url),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_truncated_body_is_a_stream_error() {
    let (url, _server) = serve_once(
        "200 OK",
        "application/x-ndjson",
        vec![ollama_line("partial")],
    )
    .await;

    let items: Vec<Result<String, ProviderError>> = OllamaClient::new(url)
        .stream_completion(request("llama3"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items[0], Ok("partial".to_string()));
    assert!(matches!(items[1], Err(ProviderError::Stream(_))));
}

#[tokio::test]
async fn test_session_loop_against_http_server() {
    let (url, _server) = serve_once(
        "200 OK",
        "application/x-ndjson",
        vec![
            ollama_line("Analysis: divide by zero."),
            ollama_line(" Fix: guard x."),
            ollama_done(),
        ],
    )
    .await;

    let mut input = ScriptedInput::new(&["def f(x): return x/0", "ZeroDivisionError", ""]);
    let mut display = RecordingDisplay::default();
    let mut session_loop = SessionLoop::new(
        OllamaClient::new(url),
        &mut input,
        &mut display,
        SessionConfig::default(),
    );
    session_loop.run().await.unwrap();
    assert_eq!(session_loop.turns_completed(), 1);
    drop(session_loop);

    assert_eq!(
        display.finished(),
        vec!["Analysis: divide by zero. Fix: guard x."]
    );
    assert!(display.failures().is_empty());
    assert_eq!(display.shown.last(), Some(&Shown::Farewell));
}
