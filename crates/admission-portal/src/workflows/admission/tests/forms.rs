use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::admission::repository::Clock;
use crate::workflows::forms::{FormError, SubmissionStatus, SEEDED_SHORT_CODE};

fn complete_submission() -> Value {
    json!({
        "_token": "csrf",
        "full_name": " Asha Kumari ",
        "dob": "2007-08-14",
        "gender": "Female",
        "category": "OBC",
        "email": "asha@example.com",
        "phone": "9876543210",
        "address": "12 MG Road, Kochi",
        "hs_percentage": 91.4,
        "inter_percentage": "88",
        "photo": {"storage_key": "2026/asha-photo.jpg", "original_name": "photo.jpg", "file_size": 180000},
        "signature": {"storage_key": "2026/asha-sign.png", "original_name": "sign.png", "file_size": 40000},
        "terms": true,
        "referral": "not a field of this form"
    })
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn form_is_returned_in_display_order() {
    let harness = harness();
    let form = harness
        .portal
        .forms
        .form(SEEDED_SHORT_CODE)
        .expect("seeded form");

    let titles: Vec<_> = form.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        ["Personal Details", "Contact Details", "Academic & Documents"]
    );
    let first: Vec<_> = form.sections[0].fields.iter().map(|f| f.order).collect();
    assert_eq!(first, [1, 2, 3, 4]);

    assert!(matches!(
        harness.portal.forms.form("gnm-2026"),
        Err(FormError::NotFound)
    ));
}

#[test]
fn valid_submission_is_stored_as_pending() {
    let harness = harness();
    let receipt = harness
        .portal
        .forms
        .submit(SEEDED_SHORT_CODE, as_object(complete_submission()))
        .expect("accepted");
    assert!(receipt.success);
    assert_eq!(receipt.message, "Form submitted successfully!");

    let submissions = harness.forms.submissions();
    assert_eq!(submissions.len(), 1);
    let stored = &submissions[0];
    assert_eq!(stored.id, receipt.submission_id);
    assert_eq!(stored.status, SubmissionStatus::Pending);
    assert_eq!(stored.submitted_at, harness.clock.now());
    assert_eq!(stored.data["full_name"], json!("Asha Kumari"));
    assert_eq!(stored.data["photo"], json!("admission_uploads/2026/asha-photo.jpg"));
    assert_eq!(stored.data["terms"], json!(true));
    assert!(!stored.data.contains_key("referral"));
    assert!(!stored.data.contains_key("_token"));
}

#[test]
fn invalid_submission_reports_every_field() {
    let harness = harness();
    let mut body = as_object(complete_submission());
    body.remove("dob");
    body.insert("gender".to_string(), json!("Unknown"));
    body.insert("email".to_string(), json!("asha-at-example"));
    body.insert("hs_percentage".to_string(), json!(104));
    body.insert("terms".to_string(), json!(false));
    body.insert(
        "photo".to_string(),
        json!({"storage_key": "2026/huge.jpg", "original_name": "huge.jpg", "file_size": 5_000_000}),
    );

    match harness.portal.forms.submit(SEEDED_SHORT_CODE, body) {
        Err(FormError::Validation(errors)) => {
            assert_eq!(errors.messages("dob"), ["The dob field is required.".to_string()]);
            assert_eq!(
                errors.messages("gender"),
                ["The selected gender is invalid.".to_string()]
            );
            assert!(errors.has("email"));
            assert_eq!(
                errors.messages("hs_percentage"),
                ["The hs percentage may not be greater than 100.".to_string()]
            );
            assert_eq!(errors.messages("terms"), ["The terms must be accepted.".to_string()]);
            assert_eq!(
                errors.messages("photo"),
                ["The photo may not be greater than 2048 kilobytes.".to_string()]
            );
            assert!(!errors.has("full_name"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
    assert!(harness.forms.submissions().is_empty());
}

#[test]
fn closed_forms_refuse_submissions() {
    let harness = harness();
    let mut form = harness
        .portal
        .forms
        .form(SEEDED_SHORT_CODE)
        .expect("seeded form");
    form.closes_at = Some(harness.clock.now() + Duration::days(1));
    let _ = harness.forms.clone().with_form(form);

    harness
        .portal
        .forms
        .submit(SEEDED_SHORT_CODE, as_object(complete_submission()))
        .expect("still open");

    harness.clock.advance(Duration::days(2));
    assert!(matches!(
        harness
            .portal
            .forms
            .submit(SEEDED_SHORT_CODE, as_object(complete_submission())),
        Err(FormError::Closed)
    ));
    assert_eq!(harness.forms.submissions().len(), 1);
}

#[tokio::test]
async fn form_routes_serve_and_accept_submissions() {
    let harness = harness();

    let response = harness
        .router()
        .oneshot(get_request("/api/forms/bsc-nursing-2026", None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let form = read_json_body(response).await;
    assert_eq!(form["title"], json!("B.Sc. Nursing Admission 2026"));
    assert_eq!(form["sections"][0]["fields"][2]["field_type"], json!("radio"));
    assert_eq!(
        form["sections"][0]["fields"][0]["validation_rules"],
        json!(["max:255"])
    );

    let response = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/api/forms/bsc-nursing-2026",
            None,
            complete_submission(),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["message"], json!("Form submitted successfully!"));

    let response = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/api/forms/bsc-nursing-2026",
            None,
            json!({ "full_name": "Asha" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert_eq!(payload["errors"]["phone"], json!(["The phone field is required."]));

    let response = harness
        .router()
        .oneshot(get_request("/api/forms/unknown", None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
