mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use vitrine::domain::business::{BusinessField, FieldKind};

// ---------------------------------------------------------------------------
// Field classification
// ---------------------------------------------------------------------------

#[test]
fn sensitive_and_instant_fields_classify_correctly() {
    for name in [
        "business_name",
        "address",
        "city",
        "state",
        "postal_code",
        "categories",
    ] {
        assert_eq!(FieldKind::classify(name), FieldKind::Sensitive, "{}", name);
    }
    for name in [
        "business_phone",
        "business_email",
        "operating_hours",
        "description",
        "logo_url",
        "cover_image_url",
        "website_url",
        "social_media",
    ] {
        assert_eq!(FieldKind::classify(name), FieldKind::Instant, "{}", name);
    }
    assert_eq!(FieldKind::classify("owner_id"), FieldKind::Unknown);
    assert_eq!(FieldKind::classify(""), FieldKind::Unknown);
    // Wire names, not column names.
    assert_eq!(FieldKind::classify("name"), FieldKind::Unknown);
    assert_eq!(FieldKind::classify("phone"), FieldKind::Unknown);
}

#[test]
fn field_wire_names_round_trip() {
    for field in vitrine::domain::business::SENSITIVE_FIELDS {
        assert_eq!(BusinessField::parse(field.as_str()), Some(field));
    }
    for field in vitrine::domain::business::INSTANT_UPDATE_FIELDS {
        assert_eq!(BusinessField::parse(field.as_str()), Some(field));
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submission_splits_instant_and_sensitive_fields() {
    let app = common::app().await;
    let owner = app.create_user("split_owner").await;
    let business_id = app.create_business(owner, "Split Cafe").await;

    let response = app
        .post_json(
            &format!("/v1/businesses/{}/edits", business_id),
            json!({
                "changes": {
                    "business_phone": "555-0199",
                    "business_name": "Split Cafe & Bakery"
                },
                "current_values": { "business_phone": "555-0100" }
            }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["applied_fields"], json!(["business_phone"]));
    assert_eq!(body["staged_fields"], json!(["business_name"]));

    // Instant field is live on the business row; the sensitive one is not.
    let (name, phone, has_pending): (String, Option<String>, bool) = sqlx::query_as(
        "SELECT name, phone, has_pending_edits FROM businesses WHERE id = $1",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(name, "Split Cafe");
    assert_eq!(phone.as_deref(), Some("555-0199"));
    assert!(has_pending);

    let staged_name: Option<String> =
        sqlx::query_scalar("SELECT name FROM pending_business_edits WHERE business_id = $1")
            .bind(business_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(staged_name.as_deref(), Some("Split Cafe & Bakery"));

    // One auto-approve entry per instant field, carrying the old/new diff,
    // plus one submission entry for the staged fields.
    let (changes,): (serde_json::Value,) = sqlx::query_as(
        "SELECT field_changes FROM business_activity_log \
         WHERE business_id = $1 AND action_type = 'edit_auto_approved'",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(changes["business_phone"]["old"], json!("555-0100"));
    assert_eq!(changes["business_phone"]["new"], json!("555-0199"));

    let (metadata,): (serde_json::Value,) = sqlx::query_as(
        "SELECT metadata FROM business_activity_log \
         WHERE business_id = $1 AND action_type = 'edit_submitted'",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(metadata["fields"], json!(["business_name"]));
}

#[tokio::test]
async fn instant_only_submission_leaves_no_pending_edit() {
    let app = common::app().await;
    let owner = app.create_user("instant_only").await;
    let business_id = app.create_business(owner, "Instant Only").await;

    let response = app
        .post_json(
            &format!("/v1/businesses/{}/edits", business_id),
            json!({ "changes": { "description": "Open late on weekends" } }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["staged_fields"], json!([]));

    let has_pending: bool =
        sqlx::query_scalar("SELECT has_pending_edits FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert!(!has_pending);

    let pending: Option<Uuid> = sqlx::query_scalar(
        "SELECT business_id FROM pending_business_edits WHERE business_id = $1",
    )
    .bind(business_id)
    .fetch_optional(app.pool())
    .await
    .unwrap();
    assert!(pending.is_none());
}

#[tokio::test]
async fn unknown_field_is_rejected() {
    let app = common::app().await;
    let owner = app.create_user("unknown_field").await;
    let business_id = app.create_business(owner, "Unknown Field").await;

    let response = app
        .post_json(
            &format!("/v1/businesses/{}/edits", business_id),
            json!({ "changes": { "owner_id": "someone-else" } }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error_message().contains("unknown field"));

    // Nothing was applied or staged.
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM business_activity_log WHERE business_id = $1",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn submission_validates_value_shapes() {
    let app = common::app().await;
    let owner = app.create_user("bad_shapes").await;
    let business_id = app.create_business(owner, "Bad Shapes").await;
    let path = format!("/v1/businesses/{}/edits", business_id);

    let response = app
        .post_json(&path, json!({ "changes": {} }), Some(owner))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &path,
            json!({ "changes": { "business_name": null } }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &path,
            json!({ "changes": { "categories": "restaurant" } }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &path,
            json!({ "changes": { "operating_hours": "9-5" } }),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submission_requires_the_owner() {
    let app = common::app().await;
    let owner = app.create_user("real_owner").await;
    let stranger = app.create_user("stranger").await;
    let business_id = app.create_business(owner, "Owned Business").await;
    let path = format!("/v1/businesses/{}/edits", business_id);
    let body = json!({ "changes": { "description": "hijacked" } });

    let response = app.post_json(&path, body.clone(), Some(stranger)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(axum::http::Method::POST, &path, Some(body), &[])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resubmission_merges_into_the_single_pending_edit() {
    let app = common::app().await;
    let owner = app.create_user("merge_owner").await;
    let business_id = app.create_business(owner, "Merge Cafe").await;
    let path = format!("/v1/businesses/{}/edits", business_id);

    app.post_json(
        &path,
        json!({ "changes": { "business_name": "First Name" } }),
        Some(owner),
    )
    .await;
    app.post_json(
        &path,
        json!({ "changes": { "city": "Springfield", "business_name": "Second Name" } }),
        Some(owner),
    )
    .await;

    // Still one row: resubmitted fields overwrite, untouched fields keep
    // their staged value.
    let (name, city): (Option<String>, Option<String>) =
        sqlx::query_as("SELECT name, city FROM pending_business_edits WHERE business_id = $1")
            .bind(business_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(name.as_deref(), Some("Second Name"));
    assert_eq!(city.as_deref(), Some("Springfield"));
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approve_all_applies_staged_fields_and_notifies_owner() {
    let app = common::app().await;
    let owner = app.create_user("approve_owner").await;
    let admin = app.create_user("approve_admin").await;
    let business_id = app.create_business(owner, "Approve Cafe").await;

    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "business_name": "Approved Cafe", "city": "Portland" } }),
        Some(owner),
    )
    .await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/approve", business_id),
            json!({}),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["action"], json!("edit_approved"));
    assert_eq!(body["rejected_fields"], json!([]));

    let (name, city, has_pending): (String, Option<String>, bool) = sqlx::query_as(
        "SELECT name, city, has_pending_edits FROM businesses WHERE id = $1",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(name, "Approved Cafe");
    assert_eq!(city.as_deref(), Some("Portland"));
    assert!(!has_pending);

    let pending: Option<Uuid> = sqlx::query_scalar(
        "SELECT business_id FROM pending_business_edits WHERE business_id = $1",
    )
    .bind(business_id)
    .fetch_optional(app.pool())
    .await
    .unwrap();
    assert!(pending.is_none());

    // The resolution entry carries old/new for every approved field.
    let (changes,): (serde_json::Value,) = sqlx::query_as(
        "SELECT field_changes FROM business_activity_log \
         WHERE business_id = $1 AND action_type = 'edit_approved'",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(changes["business_name"]["old"], json!("Approve Cafe"));
    assert_eq!(changes["business_name"]["new"], json!("Approved Cafe"));

    let (payload,): (serde_json::Value,) = sqlx::query_as(
        "SELECT payload FROM notifications \
         WHERE user_id = $1 AND notification_type = 'edit_decision'",
    )
    .bind(owner)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(payload["decision"], json!("approved"));
}

#[tokio::test]
async fn reject_all_discards_staged_fields() {
    let app = common::app().await;
    let owner = app.create_user("reject_owner").await;
    let admin = app.create_user("reject_admin").await;
    let business_id = app.create_business(owner, "Reject Cafe").await;

    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "business_name": "Sketchy Name" } }),
        Some(owner),
    )
    .await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/reject", business_id),
            json!({ "reason": "name violates naming policy" }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["action"], json!("edit_rejected"));

    let (name, has_pending): (String, bool) =
        sqlx::query_as("SELECT name, has_pending_edits FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(name, "Reject Cafe");
    assert!(!has_pending);

    let (metadata,): (serde_json::Value,) = sqlx::query_as(
        "SELECT metadata FROM business_activity_log \
         WHERE business_id = $1 AND action_type = 'edit_rejected'",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(metadata["reason"], json!("name violates naming policy"));
    assert_eq!(metadata["fields"], json!(["business_name"]));
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let app = common::app().await;
    let owner = app.create_user("no_reason_owner").await;
    let admin = app.create_user("no_reason_admin").await;
    let business_id = app.create_business(owner, "No Reason").await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/reject", business_id),
            json!({ "reason": "   " }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_resolution_applies_only_approved_fields() {
    let app = common::app().await;
    let owner = app.create_user("partial_owner").await;
    let admin = app.create_user("partial_admin").await;
    let business_id = app.create_business(owner, "Partial Cafe").await;

    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "business_name": "Partial Cafe 2", "city": "Gotham" } }),
        Some(owner),
    )
    .await;

    // city has no decision: undecided fields are rejected.
    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/resolve", business_id),
            json!({
                "decisions": [ { "field": "business_name", "approved": true } ],
                "reason": "city could not be verified"
            }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["action"], json!("edit_partial"));
    assert_eq!(body["approved_fields"], json!(["business_name"]));
    assert_eq!(body["rejected_fields"], json!(["city"]));

    let (name, city): (String, Option<String>) =
        sqlx::query_as("SELECT name, city FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(name, "Partial Cafe 2");
    assert_eq!(city, None);

    let (metadata,): (serde_json::Value,) = sqlx::query_as(
        "SELECT metadata FROM business_activity_log \
         WHERE business_id = $1 AND action_type = 'edit_partial'",
    )
    .bind(business_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(metadata["rejected_fields"], json!(["city"]));

    let (payload,): (serde_json::Value,) = sqlx::query_as(
        "SELECT payload FROM notifications \
         WHERE user_id = $1 AND notification_type = 'edit_decision'",
    )
    .bind(owner)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(payload["decision"], json!("partial"));
}

#[tokio::test]
async fn partial_resolution_approving_everything_degenerates_to_approve_all() {
    let app = common::app().await;
    let owner = app.create_user("degen_owner").await;
    let admin = app.create_user("degen_admin").await;
    let business_id = app.create_business(owner, "Degenerate Cafe").await;

    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "business_name": "All Approved", "state": "OR" } }),
        Some(owner),
    )
    .await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/resolve", business_id),
            json!({
                "decisions": [
                    { "field": "business_name", "approved": true },
                    { "field": "state", "approved": true }
                ]
            }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["action"], json!("edit_approved"));

    // Symmetric degenerate case: rejecting everything is a plain rejection.
    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "city": "Nowhere" } }),
        Some(owner),
    )
    .await;
    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/resolve", business_id),
            json!({
                "decisions": [ { "field": "city", "approved": false } ],
                "reason": "unverifiable"
            }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["action"], json!("edit_rejected"));
}

#[tokio::test]
async fn resolution_rejects_decisions_on_instant_fields() {
    let app = common::app().await;
    let owner = app.create_user("bad_decision_owner").await;
    let admin = app.create_user("bad_decision_admin").await;
    let business_id = app.create_business(owner, "Bad Decision").await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/resolve", business_id),
            json!({ "decisions": [ { "field": "description", "approved": true } ] }),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error_message().contains("not subject to review"));
}

#[tokio::test]
async fn resolving_without_a_pending_edit_is_not_found() {
    let app = common::app().await;
    let owner = app.create_user("nothing_owner").await;
    let admin = app.create_user("nothing_admin").await;
    let business_id = app.create_business(owner, "Nothing Pending").await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/approve", business_id),
            json!({}),
            Some(app.admin_token()),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_edit_endpoints_require_the_admin_token() {
    let app = common::app().await;
    let owner = app.create_user("token_owner").await;
    let admin = app.create_user("token_admin").await;
    let business_id = app.create_business(owner, "Token Cafe").await;

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/approve", business_id),
            json!({}),
            None,
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .admin_post(
            &format!("/v1/admin/businesses/{}/edits/approve", business_id),
            json!({}),
            Some("wrong-token"),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .admin_get("/v1/admin/pending-edits", None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_edit_is_visible_to_owner_and_admin() {
    let app = common::app().await;
    let owner = app.create_user("visible_owner").await;
    let business_id = app.create_business(owner, "Visible Cafe").await;

    app.post_json(
        &format!("/v1/businesses/{}/edits", business_id),
        json!({ "changes": { "postal_code": "97201" } }),
        Some(owner),
    )
    .await;

    let response = app
        .get(
            &format!("/v1/businesses/{}/pending-edits", business_id),
            Some(owner),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["postal_code"], json!("97201"));

    let response = app
        .admin_get(
            &format!("/v1/admin/pending-edits/{}", business_id),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["postal_code"], json!("97201"));

    let listed = app
        .admin_get("/v1/admin/pending-edits", Some(app.admin_token()))
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    let items = listed.json();
    assert!(items
        .as_array()
        .unwrap()
        .iter()
        .any(|edit| edit["business_id"] == json!(business_id.to_string())));
}
