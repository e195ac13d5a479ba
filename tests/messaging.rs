mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use vitrine::app::rate_limiter::MessageRateLimiter;
use vitrine::config::message_limits::MessageLimits;
use vitrine::domain::spam::RateLimitViolation;

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn opening_a_conversation_is_idempotent() {
    let app = common::app().await;
    let owner = app.create_user("conv_owner").await;
    let customer = app.create_user("conv_customer").await;
    let business_id = app.create_business(owner, "Conversational Cafe").await;
    let path = format!("/v1/businesses/{}/conversations", business_id);

    let first = app.post_json(&path, json!({}), Some(customer)).await;
    assert_eq!(first.status, StatusCode::OK);
    let first_id = first.json()["id"].as_str().unwrap().to_string();

    let second = app.post_json(&path, json!({}), Some(customer)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["id"].as_str().unwrap(), first_id);
}

#[tokio::test]
async fn opening_a_conversation_with_a_missing_business_is_not_found() {
    let app = common::app().await;
    let customer = app.create_user("conv_no_biz").await;

    let response = app
        .post_json(
            &format!("/v1/businesses/{}/conversations", Uuid::new_v4()),
            json!({}),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_message_is_sent_unflagged() {
    let app = common::app().await;
    let owner = app.create_user("send_owner").await;
    let customer = app.create_user("send_customer").await;
    let business_id = app.create_business(owner, "Send Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;

    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", conversation_id),
            json!({ "content": "Hi, are you open on Sundays?" }),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["message"]["is_spam_flagged"], json!(false));
    assert_eq!(body["spam"]["is_spam"], json!(false));
    assert_eq!(body["spam"]["score"], json!(0.0));

    // The owner can reply in the same conversation.
    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", conversation_id),
            json!({ "content": "Yes, 9 to 3." }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn flagged_message_is_persisted_with_its_verdict() {
    let app = common::app().await;
    let owner = app.create_user("flag_owner").await;
    let customer = app.create_user("flag_customer").await;
    let business_id = app.create_business(owner, "Flag Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;
    app.seed_keyword("freecryptogiveaway", "high").await;

    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", conversation_id),
            json!({ "content": "Visit FreeCryptoGiveaway dot com now" }),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["spam"]["is_spam"], json!(true));
    assert_eq!(body["spam"]["severity"], json!("high"));
    assert_eq!(body["spam"]["score"], json!(1.0));
    assert_eq!(
        body["spam"]["reason"],
        json!("Contains blocked keyword: freecryptogiveaway")
    );

    // Flagged, but still delivered and stored with the verdict on the row.
    let message_id: Uuid = body["message"]["id"].as_str().unwrap().parse().unwrap();
    let (is_flagged, score, flagged_at): (bool, Option<f64>, Option<time::OffsetDateTime>) =
        sqlx::query_as(
            "SELECT is_spam_flagged, spam_score, spam_flagged_at FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert!(is_flagged);
    assert_eq!(score, Some(1.0));
    assert!(flagged_at.is_some());
}

#[tokio::test]
async fn message_content_is_validated() {
    let app = common::app().await;
    let owner = app.create_user("content_owner").await;
    let customer = app.create_user("content_customer").await;
    let business_id = app.create_business(owner, "Content Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;
    let path = format!("/v1/conversations/{}/messages", conversation_id);

    let response = app
        .post_json(&path, json!({ "content": "   " }), Some(customer))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json(&path, json!({ "content": "a".repeat(5001) }), Some(customer))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_participants_can_use_a_conversation() {
    let app = common::app().await;
    let owner = app.create_user("part_owner").await;
    let customer = app.create_user("part_customer").await;
    let outsider = app.create_user("part_outsider").await;
    let business_id = app.create_business(owner, "Participants Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;
    let path = format!("/v1/conversations/{}/messages", conversation_id);

    let response = app
        .post_json(&path, json!({ "content": "let me in" }), Some(outsider))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.get(&path, Some(outsider)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", Uuid::new_v4()),
            json!({ "content": "hello?" }),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_returns_messages_newest_first() {
    let app = common::app().await;
    let owner = app.create_user("list_owner").await;
    let customer = app.create_user("list_customer").await;
    let business_id = app.create_business(owner, "List Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;

    for (i, seconds_ago) in [30i64, 20, 10].iter().enumerate() {
        app.insert_message_at(
            conversation_id,
            customer,
            &format!("message {}", i),
            *seconds_ago,
        )
        .await;
    }

    let response = app
        .get(
            &format!("/v1/conversations/{}/messages?limit=2", conversation_id),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], json!("message 2"));
    assert_eq!(items[1]["content"], json!("message 1"));
    assert!(body["next_cursor"].is_string());
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_rate_limit_blocks_the_eleventh_message() {
    let app = common::app().await;
    let owner = app.create_user("rate_owner").await;
    let customer = app.create_user("rate_customer").await;
    let business_id = app.create_business(owner, "Rate Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;

    for i in 0..10 {
        app.insert_message(conversation_id, customer, &format!("burst {}", i))
            .await;
    }

    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", conversation_id),
            json!({ "content": "one too many" }),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers.get("retry-after").unwrap().to_str().unwrap(),
        "60"
    );
    assert!(response.error_message().contains("too quickly"));

    // The blocked message was never persisted.
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(count, 10);
}

#[tokio::test]
async fn messages_outside_the_window_do_not_count() {
    let app = common::app().await;
    let owner = app.create_user("window_owner").await;
    let customer = app.create_user("window_customer").await;
    let business_id = app.create_business(owner, "Window Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;

    for i in 0..10 {
        app.insert_message_at(
            conversation_id,
            customer,
            &format!("stale {}", i),
            120,
        )
        .await;
    }

    let response = app
        .post_json(
            &format!("/v1/conversations/{}/messages", conversation_id),
            json!({ "content": "fresh window" }),
            Some(customer),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn per_conversation_limit_fires_independently_of_the_global_one() {
    let app = common::app().await;
    let owner = app.create_user("perconv_owner").await;
    let customer = app.create_user("perconv_customer").await;
    let business_id = app.create_business(owner, "PerConv Cafe").await;
    let conversation_id = app.create_conversation(business_id, customer).await;

    for i in 0..3 {
        app.insert_message(conversation_id, customer, &format!("dense {}", i))
            .await;
    }

    // A generous global cap isolates the per-conversation check.
    let limiter = MessageRateLimiter::new(
        app.state.db.clone(),
        MessageLimits {
            window_seconds: 60,
            global_per_window: 100,
            per_conversation_per_window: 3,
        },
    );
    let verdict = limiter.check(customer, conversation_id).await;
    assert!(!verdict.allowed);
    assert_eq!(verdict.violation, Some(RateLimitViolation::Conversation));
    assert_eq!(verdict.retry_after_seconds, Some(60));

    // A different conversation by the same sender is unaffected.
    let other_conversation = app
        .create_conversation(app.create_business(owner, "PerConv Annex").await, customer)
        .await;
    let verdict = limiter.check(customer, other_conversation).await;
    assert!(verdict.allowed);
}
