//! HTTP adapter tests against a mock memory service

use chat_context::{
    HttpMemoryClient, MemoryCategory, MemoryServiceConfig, MemoryStore, SearchOptions,
};

fn client_for(server: &mockito::ServerGuard) -> HttpMemoryClient {
    let config = MemoryServiceConfig {
        base_url: server.url(),
        retry_attempts: 0,
        ..MemoryServiceConfig::default()
    }
    .with_api_key("test-key");

    HttpMemoryClient::new(config).unwrap()
}

#[tokio::test]
async fn search_parses_service_results() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!([
        {
            "id": "m1",
            "memory": "Prefers Rust",
            "user_id": "user_abcd1234",
            "categories": ["user_preference"],
            "score": 0.92
        },
        {
            "id": "m2",
            "data": { "memory": "Works at Acme" },
            "categories": ["personal_info"]
        }
    ]);

    let mock = server
        .mock("POST", "/v1/memories/search/")
        .match_header("authorization", "Token test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.available());

    let facts = client
        .search("rust", "user-123", &SearchOptions::default())
        .await;

    mock.assert_async().await;
    assert_eq!(facts.len(), 2);
    assert_eq!(facts[0].content, "Prefers Rust");
    assert_eq!(facts[0].metadata.category, MemoryCategory::UserPreference);
    assert_eq!(facts[0].relevance_score, 0.92);
    assert_eq!(facts[1].content, "Works at Acme");
    assert_eq!(facts[1].metadata.category, MemoryCategory::PersonalInfo);
    assert!(client.available());
}

#[tokio::test]
async fn search_applies_relevance_floor() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!([
        { "id": "m1", "memory": "weak match", "score": 0.2 },
        { "id": "m2", "memory": "strong match", "score": 0.95 }
    ]);

    server
        .mock("POST", "/v1/memories/search/")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let facts = client
        .search(
            "anything",
            "user-123",
            &SearchOptions {
                min_relevance: Some(0.7),
                ..SearchOptions::default()
            },
        )
        .await;

    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].content, "strong match");
}

#[tokio::test]
async fn server_error_degrades_to_empty_and_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/memories/search/")
        .with_status(500)
        .with_body("upstream exploded")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let facts = client
        .search("anything", "user-123", &SearchOptions::default())
        .await;

    mock.assert_async().await;
    assert!(facts.is_empty());
    assert!(!client.available());
}

#[tokio::test]
async fn malformed_body_degrades_to_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/memories/search/")
        .with_status(200)
        .with_body("this is not json")
        .create_async()
        .await;

    let client = client_for(&server);
    let facts = client
        .search("anything", "user-123", &SearchOptions::default())
        .await;

    assert!(facts.is_empty());
    assert!(!client.available());
}

#[tokio::test]
async fn successful_call_restores_availability() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/memories/search/")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .search("anything", "user-123", &SearchOptions::default())
        .await;
    assert!(!client.available());

    server
        .mock("POST", "/v1/memories/")
        .with_status(200)
        .with_body(serde_json::json!([{ "id": "new-id" }]).to_string())
        .create_async()
        .await;

    let fact = chat_context::MemoryFact::new(
        "I always review diffs twice",
        "user-123",
        chat_context::memory::MemoryMetadata::new(MemoryCategory::UserPreference),
    );
    let id = client.add(&fact).await;

    assert_eq!(id.as_deref(), Some("new-id"));
    assert!(client.available());
}

#[tokio::test]
async fn add_scopes_the_user_id() {
    let mut server = mockito::Server::new_async().await;
    let scoped = chat_context::memory::scoped_user_id("clerk_user_2aBcDeFgHiJkLmNoP");
    let mock = server
        .mock("POST", "/v1/memories/")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "user_id": scoped,
            "version": "v2"
        })))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = client_for(&server);
    let fact = chat_context::MemoryFact::new(
        "I prefer tabs over spaces",
        "clerk_user_2aBcDeFgHiJkLmNoP",
        chat_context::memory::MemoryMetadata::new(MemoryCategory::UserPreference),
    );
    let id = client.add(&fact).await;

    mock.assert_async().await;
    // Empty response array carries no id; the fact is still accepted.
    assert!(id.is_none());
}

#[tokio::test]
async fn get_all_handles_wrapped_payloads() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/memories/")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            serde_json::json!({
                "results": [
                    { "id": "m1", "memory": "fact one" },
                    { "id": "m2", "memory": "fact two" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let facts = client.get_all("user-123", 50).await;

    assert_eq!(facts.len(), 2);
    assert_eq!(facts[0].metadata.category, MemoryCategory::ConversationContext);
}

#[tokio::test]
async fn delete_maps_status_to_bool() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/v1/memories/m1/")
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("DELETE", "/v1/memories/m2/")
        .with_status(404)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.delete("m1").await);
    assert!(!client.delete("m2").await);
}
