//! Remote backends against a mock HTTP server.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use korea_guide_rag::answer::{fallback_message, RagAssistant};
use korea_guide_rag::app::AppContext;
use korea_guide_rag::config::{parse_config, EmbeddingConfig, GenerationConfig};
use korea_guide_rag::embedding::{EmbeddingProvider, OllamaProvider, OpenAIProvider};
use korea_guide_rag::error::RagError;
use korea_guide_rag::generation::{GenerationRequest, Generator, OpenAIChatGenerator};
use korea_guide_rag::index::VectorIndex;
use korea_guide_rag::models::DocumentChunk;

fn embedding_config(server: &MockServer, provider: &str, max_retries: u32) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: provider.to_string(),
        model: Some("test-embed".to_string()),
        dims: Some(3),
        url: Some(server.uri()),
        max_retries,
        timeout_secs: 5,
        ..EmbeddingConfig::default()
    }
}

fn generation_config(server: &MockServer, max_retries: u32) -> GenerationConfig {
    GenerationConfig {
        url: Some(server.uri()),
        max_retries,
        timeout_secs: 5,
        ..GenerationConfig::default()
    }
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "choices": [ { "index": 0, "message": { "role": "assistant", "content": content } } ]
    })
}

#[tokio::test]
async fn test_openai_embeddings_sorted_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "test-embed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0, 0.0] },
                { "index": 0, "embedding": [1.0, 0.0, 0.0] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 0), "test-key").unwrap();
    let vectors = provider
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

#[tokio::test]
async fn test_openai_wrong_dims_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "index": 0, "embedding": [1.0, 0.0] } ]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 0), "test-key").unwrap();
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
}

#[tokio::test]
async fn test_openai_duplicate_index_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 0, "embedding": [1.0, 0.0, 0.0] },
                { "index": 0, "embedding": [0.0, 1.0, 0.0] }
            ]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 0), "test-key").unwrap();
    let err = provider
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
}

#[tokio::test]
async fn test_slow_backends_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.0] } ]
                }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let embed_config = EmbeddingConfig {
        timeout_secs: 1,
        ..embedding_config(&server, "openai", 0)
    };
    let provider = OpenAIProvider::with_api_key(&embed_config, "test-key").unwrap();
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)), "{:?}", err);

    let chat_config = GenerationConfig {
        timeout_secs: 1,
        ..generation_config(&server, 0)
    };
    let generator = OpenAIChatGenerator::with_api_key(&chat_config, "chat-key").unwrap();
    let err = generator
        .generate(&GenerationRequest {
            query: "q",
            context: "",
            language: "English",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Generation(_)), "{:?}", err);
}

#[tokio::test]
async fn test_openai_retries_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "index": 0, "embedding": [0.0, 0.0, 1.0] } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 1), "test-key").unwrap();
    let vector = provider.embed("retry me").await.unwrap();
    assert_eq!(vector, vec![0.0, 0.0, 1.0]);
}

#[tokio::test]
async fn test_openai_client_error_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 3), "test-key").unwrap();
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_ollama_embeddings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "test-embed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.5, 0.5, 0.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&embedding_config(&server, "ollama", 0)).unwrap();
    let vector = provider.embed("hello").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.5, 0.0]);
}

#[tokio::test]
async fn test_chat_generator_sends_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer chat-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 1000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("9시부터 6시까지 엽니다.")))
        .expect(1)
        .mount(&server)
        .await;

    let generator =
        OpenAIChatGenerator::with_api_key(&generation_config(&server, 0), "chat-key").unwrap();
    let reply = generator
        .generate(&GenerationRequest {
            query: "병원은 언제 열어요?",
            context: "[1] hospitals open 9-6",
            language: "Korean",
        })
        .await
        .unwrap();
    assert_eq!(reply, "9시부터 6시까지 엽니다.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let system = body["messages"][0]["content"].as_str().unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(system.contains("Reply in Korean."));
    assert!(user.contains("[1] hospitals open 9-6"));
    assert!(user.contains("병원은 언제 열어요?"));
}

#[tokio::test]
async fn test_chat_generator_client_error_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let generator =
        OpenAIChatGenerator::with_api_key(&generation_config(&server, 3), "bad-key").unwrap();
    let err = generator
        .generate(&GenerationRequest {
            query: "q",
            context: "",
            language: "English",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));
}

/// Index with one chunk whose vector matches what the mock embedder returns.
fn one_chunk_index() -> Arc<VectorIndex> {
    let mut index = VectorIndex::with_model("test-embed");
    let mut chunk = DocumentChunk::new("c0", "hospitals open 9-6", vec![1.0, 0.0, 0.0]);
    chunk
        .metadata
        .insert("document_id".to_string(), json!("health.md"));
    index.insert(chunk).unwrap();
    Arc::new(index)
}

#[tokio::test]
async fn test_assistant_with_remote_backends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "index": 0, "embedding": [0.9, 0.1, 0.0] } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hospitals open at 9.")))
        .mount(&server)
        .await;

    let embedder =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 0), "k").unwrap();
    let generator = OpenAIChatGenerator::with_api_key(&generation_config(&server, 0), "k").unwrap();
    let rag = RagAssistant::new(one_chunk_index(), Arc::new(embedder), Arc::new(generator), 4)
        .unwrap();

    let answer = rag.answer("when do hospitals open?", "en").await.unwrap();
    assert_eq!(answer.text, "Hospitals open at 9.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].document_id.as_deref(), Some("health.md"));
}

#[tokio::test]
async fn test_generation_outage_yields_fallback_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.0] } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let embedder =
        OpenAIProvider::with_api_key(&embedding_config(&server, "openai", 0), "k").unwrap();
    let generator = OpenAIChatGenerator::with_api_key(&generation_config(&server, 0), "k").unwrap();
    let rag = RagAssistant::new(one_chunk_index(), Arc::new(embedder), Arc::new(generator), 4)
        .unwrap();

    let config = parse_config("[snapshot]\npath = \"unused.json\"\n").unwrap();
    let ctx = AppContext::with_assistant(config, Some(rag));

    let reply = ctx.reply("병원은 언제 열어요?", "ko").await.unwrap();
    assert_eq!(reply, fallback_message("ko"));

    let reply = ctx.reply("when do hospitals open?", "en").await.unwrap();
    assert_eq!(reply, fallback_message("en"));
}
