use serde_json::{json, Value};
use std::collections::BTreeMap;
use valeapp_api::{
    justification_kinds, map_error, openapi_v1_spec, parse_export_dataset, parse_voucher_key,
    parse_voucher_list_params, ApiError, ApiErrorCode, LoginResponseDto,
};
use valeapp_lifecycle::{ExportDataset, LifecycleError};
use valeapp_model::{SearchScope, StatusFilter};

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn voucher_list_params_default_and_validate() {
    let parsed = parse_voucher_list_params(&BTreeMap::new()).expect("empty query");
    assert_eq!(parsed.status, StatusFilter::All);
    assert!(parsed.search.is_empty());

    let parsed = parse_voucher_list_params(&query(&[("search", " 500 "), ("status", "pending")]))
        .expect("query");
    assert_eq!(parsed.search, "500");
    let filter = parsed.into_filter(SearchScope::Employee);
    assert_eq!(filter.status, StatusFilter::Pending);
    assert_eq!(filter.scope, SearchScope::Employee);

    let err = parse_voucher_list_params(&query(&[("status", "open")])).expect_err("bad status");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);
    assert_eq!(err.details["parameter"], "status");

    let err = parse_voucher_list_params(&query(&[("limit", "5")])).expect_err("unknown key");
    assert_eq!(err.details["parameter"], "limit");

    let long = "x".repeat(201);
    assert!(parse_voucher_list_params(&query(&[("search", &long)])).is_err());
}

#[test]
fn path_params_are_strict() {
    assert_eq!(parse_voucher_key(" 10_500 ").expect("key").as_str(), "10_500");
    assert!(parse_voucher_key("   ").is_err());
    assert_eq!(
        parse_export_dataset("archive").expect("dataset"),
        ExportDataset::Archive
    );
    assert_eq!(
        parse_export_dataset("senhas").expect_err("unknown").code,
        ApiErrorCode::InvalidQueryParameter
    );
}

#[test]
fn every_error_code_maps_to_a_stable_status() {
    let expected = [
        (ApiErrorCode::InvalidQueryParameter, 400),
        (ApiErrorCode::InvalidRequestBody, 400),
        (ApiErrorCode::ConfirmationRequired, 400),
        (ApiErrorCode::Unauthenticated, 401),
        (ApiErrorCode::InvalidCredentials, 401),
        (ApiErrorCode::Forbidden, 403),
        (ApiErrorCode::NotFound, 404),
        (ApiErrorCode::Conflict, 409),
        (ApiErrorCode::PayloadTooLarge, 413),
        (ApiErrorCode::ValidationFailed, 422),
        (ApiErrorCode::UpstreamStoreUnavailable, 503),
        (ApiErrorCode::NotReady, 503),
        (ApiErrorCode::Internal, 500),
    ];
    for (code, status) in expected {
        let err = ApiError::new(code, "x", json!({}));
        assert_eq!(map_error(&err).status_code, status, "{code:?}");
    }
}

#[test]
fn lifecycle_errors_keep_their_messages() {
    let err: ApiError = LifecycleError::Conflict("Este vale já foi justificado.".to_string()).into();
    assert_eq!(err.code, ApiErrorCode::Conflict);
    assert_eq!(err.message, "Este vale já foi justificado.");
    let wire = serde_json::to_value(&err).expect("json");
    assert_eq!(wire["code"], "Conflict");
}

#[test]
fn login_response_is_tagged_by_status() {
    let body = json!({
        "status": "password_setup_required",
        "ticket": "abc",
        "user": {
            "id": "12345678900",
            "name": "Ana",
            "department": null,
            "promax": "P100",
            "role": "employee"
        }
    });
    let parsed: LoginResponseDto = serde_json::from_value(body).expect("dto");
    assert!(matches!(parsed, LoginResponseDto::PasswordSetupRequired { .. }));
}

#[test]
fn justification_kinds_flag_the_four_that_need_observations() {
    let kinds = justification_kinds();
    assert_eq!(kinds.len(), 11);
    let flagged: Vec<&str> = kinds
        .iter()
        .filter(|k| k.requires_observation)
        .map(|k| k.label.as_str())
        .collect();
    assert_eq!(flagged, ["Troca", "Inversão", "Comodato/Empréstimo", "Apoio"]);
}

#[test]
fn openapi_lists_every_error_code() {
    let spec = openapi_v1_spec();
    let codes = spec["components"]["schemas"]["ApiErrorCode"]["enum"]
        .as_array()
        .expect("enum");
    assert_eq!(codes.len(), ApiErrorCode::ALL.len());
    assert!(codes.contains(&Value::String("Conflict".to_string())));
    assert!(spec["paths"]["/v1/vouchers/{key}/justify"]["post"]["responses"]["409"].is_object());
    assert!(spec["paths"]["/v1/admin/cleanup"]["post"]["responses"]["403"].is_object());
}
