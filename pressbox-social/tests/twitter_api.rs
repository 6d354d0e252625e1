use pressbox_social::twitter::{TimelineQuery, TwitterApi};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn api(server: &MockServer, user_token: Option<&str>) -> TwitterApi {
    TwitterApi::with_base_url(
        &server.uri(),
        "app-token".to_string(),
        user_token.map(str::to_string),
    )
    .expect("client builds")
}

#[tokio::test]
async fn resolves_username_to_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/David_Ornstein"))
        .and(header("authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "42", "username": "David_Ornstein", "name": "David Ornstein" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = api(&server, None)
        .await
        .user_by_username("@David_Ornstein")
        .await
        .unwrap();
    assert_eq!(user.id, "42");
    assert_eq!(user.username, "David_Ornstein");
}

#[tokio::test]
async fn unknown_username_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/nobody"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "title": "Not Found Error", "detail": "Could not find user with username: [nobody]." }]
        })))
        .mount(&server)
        .await;

    let err = api(&server, None)
        .await
        .user_by_username("nobody")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Could not find user"));
}

#[tokio::test]
async fn timeline_passes_since_id_and_exclusions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .and(query_param("since_id", "100"))
        .and(query_param("max_results", "5"))
        .and(query_param("exclude", "retweets,replies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "102", "text": "Arsenal close to a deal" },
                { "id": "101", "text": "Weather is nice" }
            ],
            "meta": { "result_count": 2, "newest_id": "102", "oldest_id": "101" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = api(&server, None)
        .await
        .user_tweets(
            "42",
            &TimelineQuery {
                since_id: Some("100"),
                max_results: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let tweets = resp.data.unwrap();
    assert_eq!(tweets.len(), 2);
    assert_eq!(tweets[0].id, "102");
    assert_eq!(resp.meta.unwrap().newest_id.as_deref(), Some("102"));
}

#[tokio::test]
async fn empty_timeline_has_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })),
        )
        .mount(&server)
        .await;

    let resp = api(&server, None)
        .await
        .user_tweets("42", &TimelineQuery::default())
        .await
        .unwrap();
    assert!(resp.data.is_none());
}

#[tokio::test]
async fn create_tweet_uses_user_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header("authorization", "Bearer user-token"))
        .and(body_json(json!({ "text": "hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "555", "text": "hello" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = api(&server, Some("user-token"))
        .await
        .create_tweet("hello")
        .await
        .unwrap();
    assert_eq!(created.id, "555");
}

#[tokio::test]
async fn create_tweet_without_user_token_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = api(&server, None).await;
    assert!(!client.can_publish());
    assert!(client.create_tweet("hello").await.is_err());
}

#[tokio::test]
async fn rejected_publish_reports_platform_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "detail": "You are not allowed to create a Tweet with duplicate content.",
            "title": "Forbidden"
        })))
        .mount(&server)
        .await;

    let err = api(&server, Some("user-token"))
        .await
        .create_tweet("dup")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("duplicate content"));
}
