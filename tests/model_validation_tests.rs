use blog_portal::error::ApiError;
use blog_portal::models::{
    AvailabilityResponse, DeleteConfirmation, PostPayload, SignupRequest, validate_category_name,
};
use uuid::Uuid;

// --- Helpers ---

fn valid_payload() -> PostPayload {
    PostPayload {
        title: "A Fine Title".to_string(),
        content: "Long enough".to_string(),
        cover_image_url: "http://a.io/c.png".to_string(),
        category_ids: vec![],
    }
}

fn valid_signup() -> SignupRequest {
    SignupRequest {
        email: "writer@example.com".to_string(),
        name: "writer".to_string(),
        auth_id: Uuid::new_v4(),
    }
}

// --- Post payload validation ---

#[test]
fn test_post_payload_accepts_boundary_lengths() {
    let mut payload = valid_payload();
    payload.title = "ab".to_string(); // 2 chars, lower bound
    payload.content = "abc".to_string(); // 3 chars
    payload.cover_image_url = "a.b/cd".to_string(); // 6 chars
    assert!(payload.validate().is_ok());

    payload.title = "x".repeat(16);
    payload.content = "y".repeat(255);
    payload.cover_image_url = "z".repeat(255);
    assert!(payload.validate().is_ok());
}

#[test]
fn test_post_payload_rejects_out_of_range_fields() {
    let mut payload = valid_payload();
    payload.title = "x".to_string();
    assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));

    let mut payload = valid_payload();
    payload.title = "x".repeat(17);
    assert!(payload.validate().is_err());

    let mut payload = valid_payload();
    payload.content = "ab".to_string();
    assert!(payload.validate().is_err());

    let mut payload = valid_payload();
    payload.content = "y".repeat(256);
    assert!(payload.validate().is_err());

    let mut payload = valid_payload();
    payload.cover_image_url = "a.io".to_string();
    assert!(payload.validate().is_err());
}

#[test]
fn test_title_length_counts_characters_not_bytes() {
    let mut payload = valid_payload();
    // 16 multibyte characters must pass even though the byte length is larger.
    payload.title = "é".repeat(16);
    assert!(payload.validate().is_ok());
}

#[test]
fn test_category_ids_default_to_empty_when_omitted() {
    let payload: PostPayload = serde_json::from_str(
        r#"{"title":"A Fine Title","content":"Long enough","cover_image_url":"http://a.io/c.png"}"#,
    )
    .unwrap();
    assert!(payload.category_ids.is_empty());
    assert!(payload.validate().is_ok());
}

// --- Category name validation ---

#[test]
fn test_category_name_bounds() {
    assert!(validate_category_name("ab").is_ok());
    assert!(validate_category_name(&"c".repeat(16)).is_ok());

    assert!(validate_category_name("a").is_err());
    assert!(validate_category_name(&"c".repeat(17)).is_err());
    assert!(validate_category_name("").is_err());
}

// --- Signup validation ---

#[test]
fn test_signup_email_shapes() {
    for email in ["a@b.c", "first.last@sub.domain.org", "x+tag@host.io"] {
        let mut req = valid_signup();
        req.email = email.to_string();
        assert!(req.validate().is_ok(), "expected {email} to be accepted");
    }

    for email in ["", "plainaddress", "no@dot", "spaces in@host.com", "@host.com"] {
        let mut req = valid_signup();
        req.email = email.to_string();
        assert!(req.validate().is_err(), "expected {email} to be rejected");
    }
}

#[test]
fn test_signup_requires_a_name() {
    let mut req = valid_signup();
    req.name = "".to_string();
    assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
}

// --- Wire shapes ---

#[test]
fn test_availability_response_keys() {
    let body = AvailabilityResponse {
        name_available: true,
        email_available: false,
    };
    let json_output = serde_json::to_string(&body).unwrap();
    assert!(json_output.contains(r#""name_available":true"#));
    assert!(json_output.contains(r#""email_available":false"#));
}

#[test]
fn test_delete_confirmation_message_key() {
    let body = DeleteConfirmation {
        msg: "deleted post \"Hello\"".to_string(),
    };
    let json_output = serde_json::to_string(&body).unwrap();
    assert!(json_output.contains(r#""msg":"deleted post \"Hello\"""#));
}

#[test]
fn test_error_body_uses_single_error_key() {
    // The wire contract for every failure is {"error": message}.
    let err = ApiError::UnknownCategory;
    let body = serde_json::json!({ "error": err.to_string() });
    let json_output = serde_json::to_string(&body).unwrap();
    assert!(json_output.starts_with(r#"{"error":"#));
}
