use futures::StreamExt;
use serde_json::json;
use stu::{
    parse_stream_line, ChatChunk, ChatRequest, Error, ModelBackend, ModelOptions, Ollama, ToolDef,
    WireMessage,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(tools: Vec<ToolDef>) -> ChatRequest {
    ChatRequest {
        model: "llama3".to_string(),
        messages: vec![
            WireMessage::system("You are helpful."),
            WireMessage::user("What is the stock price of ACME?"),
        ],
        tools,
        stream: true,
        options: None,
    }
}

async fn collect(backend: &Ollama, request: ChatRequest) -> Vec<Result<ChatChunk, Error>> {
    let stream = backend.chat_stream(request).await.unwrap();
    stream.collect().await
}

#[test]
fn test_parse_stream_line_chunk() {
    let line = br#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#;
    let chunk = parse_stream_line(line).unwrap().unwrap();
    assert_eq!(chunk.message.content, "Hel");
    assert!(!chunk.done);
}

#[test]
fn test_parse_stream_line_done_with_counts() {
    let line = br#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":26,"eval_count":9}"#;
    let chunk = parse_stream_line(line).unwrap().unwrap();
    assert!(chunk.done);
    assert_eq!(chunk.done_reason.as_deref(), Some("stop"));
    assert_eq!(chunk.prompt_eval_count, Some(26));
    assert_eq!(chunk.eval_count, Some(9));
}

#[test]
fn test_parse_stream_line_tool_calls() {
    let line = br#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"get_current_stock_price","arguments":{"symbol":"ACME"}}}]},"done":false}"#;
    let chunk = parse_stream_line(line).unwrap().unwrap();
    let calls = chunk.message.tool_calls.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function.name, "get_current_stock_price");
    assert_eq!(calls[0].signature(), "get_current_stock_price(symbol=ACME)");
}

#[test]
fn test_parse_stream_line_blank_and_error() {
    assert!(parse_stream_line(b"").unwrap().is_none());
    assert!(parse_stream_line(b"  \r\n").unwrap().is_none());

    let err = parse_stream_line(br#"{"error":"model 'llama3' not found"}"#).unwrap_err();
    match err {
        Error::Stream(message) => assert!(message.contains("not found")),
        other => panic!("expected a stream error, got {:?}", other),
    }

    assert!(matches!(
        parse_stream_line(b"not json").unwrap_err(),
        Error::Parse(_)
    ));
}

#[test]
fn test_request_omits_empty_tools() {
    let body = serde_json::to_value(request(Vec::new())).unwrap();
    assert!(body.get("tools").is_none());
    assert!(body.get("options").is_none());
    assert_eq!(body["messages"][0]["role"], "system");

    let def = ToolDef::function("search_google", "Search Google", json!({"type": "object"}));
    let body = serde_json::to_value(request(vec![def])).unwrap();
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "search_google");

    let mut with_options = request(Vec::new());
    with_options.options = Some(ModelOptions {
        temperature: Some(0.5),
    });
    let body = serde_json::to_value(with_options).unwrap();
    assert_eq!(body["options"], json!({"temperature": 0.5}));
}

#[test]
fn test_base_url_trailing_slash_is_trimmed() {
    assert_eq!(Ollama::new("http://127.0.0.1:11434/").base_url(), "http://127.0.0.1:11434");
    assert_eq!(Ollama::default().base_url(), stu::DEFAULT_OLLAMA_URL);
}

#[tokio::test]
async fn test_chat_stream_yields_chunks_in_order() {
    let mock_server = MockServer::start().await;
    let body = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"ACME "},"done":false}"#,
        "\n",
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"is up."},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"eval_count":2}"#,
    );

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama3", "stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let ollama = Ollama::new(mock_server.uri());
    let chunks = collect(&ollama, request(Vec::new())).await;

    assert_eq!(chunks.len(), 3);
    let chunks: Vec<ChatChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(chunks[0].message.content, "ACME ");
    assert_eq!(chunks[1].message.content, "is up.");
    assert!(chunks[2].done);
    assert_eq!(chunks[2].eval_count, Some(2));
}

#[tokio::test]
async fn test_chat_stream_error_line_ends_stream() {
    let mock_server = MockServer::start().await;
    let body = concat!(
        r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#,
        "\n",
        r#"{"error":"out of memory"}"#,
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let ollama = Ollama::new(mock_server.uri());
    let chunks = collect(&ollama, request(Vec::new())).await;

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].is_ok());
    assert!(matches!(&chunks[1], Err(Error::Stream(message)) if message == "out of memory"));
}

#[tokio::test]
async fn test_chat_stream_non_success_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "model \"llama3\" not found, try pulling it first"
        })))
        .mount(&mock_server)
        .await;

    let ollama = Ollama::new(mock_server.uri());
    let err = match ollama.chat_stream(request(Vec::new())).await {
        Ok(_) => panic!("expected an error response"),
        Err(e) => e,
    };

    match err {
        Error::Response(message, status) => {
            assert_eq!(status, Some(404));
            assert!(message.contains("try pulling it first"));
        }
        other => panic!("expected a response error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_stream_unreachable_server() {
    // Port 9 is the discard port; nothing accepts HTTP there.
    let ollama = Ollama::new("http://127.0.0.1:9");
    let err = match ollama.chat_stream(request(Vec::new())).await {
        Ok(_) => panic!("expected a connection error"),
        Err(e) => e,
    };
    assert!(matches!(err, Error::Unavailable(_)));
}

#[tokio::test]
async fn test_list_models() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:latest", "size": 4661224676u64},
                {"name": "mistral:7b"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let ollama = Ollama::new(mock_server.uri());
    let models = ollama.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3:latest", "mistral:7b"]);
}
