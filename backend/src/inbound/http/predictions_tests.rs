//! Regression coverage for the prediction handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, test as actix_test, web};
use chrono::Utc;
use pagination::Paginated;
use serde_json::{Value, json};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    MockPredictionCommand, MockPredictionQuery, PredictionCommand, PredictionQuery, UserPayload,
};
use crate::domain::prediction::{RiskLevel, Severity, Sex};
use crate::domain::{Error, UserId};
use crate::inbound::http::state::HttpState;

const PATIENT_ID: Uuid = Uuid::from_u128(0x11);

fn session_payload(role: &str) -> UserPayload {
    UserPayload {
        id: UserId::from_uuid(PATIENT_ID),
        username: "ada".into(),
        email: "ada@example.com".into(),
        full_name: "Ada Lovelace".into(),
        role: role.into(),
        doctor_profile: None,
        verified: true,
        created_at: Utc::now(),
    }
}

fn prediction_payload() -> PredictionPayload {
    PredictionPayload {
        id: PredictionId::random(),
        inputs: ClinicalInputsPayload {
            symptoms: vec!["cough".into(), "fever".into()],
            age: 41,
            sex: Sex::Female,
            systolic_bp: 124,
            duration_days: 4,
            severity: Severity::Moderate,
        },
        result: PredictionResultPayload {
            condition: "influenza".into(),
            confidence: 0.87,
            risk_level: RiskLevel::Medium,
            recommendations: vec!["rest".into(), "fluids".into()],
            notes: None,
        },
        created_at: Utc::now(),
    }
}

fn test_app(
    commands: impl PredictionCommand + 'static,
    queries: impl PredictionQuery + 'static,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState {
        predictions: Arc::new(commands),
        predictions_query: Arc::new(queries),
        ..HttpState::default()
    };
    App::new()
        .app_data(web::Data::new(state))
        .wrap(crate::inbound::http::test_utils::test_session_middleware())
        .route(
            "/test-login/{role}",
            web::get().to(
                |session: crate::inbound::http::session::SessionContext,
                 role: web::Path<String>| async move {
                    session.persist_identity(&session_payload(&role))?;
                    Ok::<_, Error>(HttpResponse::Ok())
                },
            ),
        )
        .service(
            web::scope("/api/v1")
                .service(create_prediction)
                .service(list_predictions)
                .service(prediction_stats)
                .service(get_prediction)
                .service(delete_prediction),
        )
}

async fn login_as(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    role: &str,
) -> actix_web::cookie::Cookie<'static> {
    let response = actix_test::call_service(
        app,
        actix_test::TestRequest::get()
            .uri(&format!("/test-login/{role}"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

fn create_body() -> Value {
    json!({
        "inputs": {
            "symptoms": ["cough", "fever"],
            "age": 41,
            "sex": "female",
            "systolicBp": 124,
            "durationDays": 4,
            "severity": "moderate",
        },
        "result": {
            "condition": "influenza",
            "confidence": 0.87,
            "riskLevel": "medium",
            "recommendations": ["rest", "fluids"],
        },
    })
}

#[actix_web::test]
async fn creating_without_a_session_is_unauthorised() {
    let app = actix_test::init_service(test_app(
        MockPredictionCommand::new(),
        MockPredictionQuery::new(),
    ))
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/predictions")
            .set_json(create_body())
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn doctors_cannot_record_predictions() {
    let mut commands = MockPredictionCommand::new();
    commands.expect_create_prediction().never();
    let app = actix_test::init_service(test_app(commands, MockPredictionQuery::new())).await;
    let cookie = login_as(&app, "doctor").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/predictions")
            .cookie(cookie)
            .set_json(create_body())
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn creating_passes_the_session_identity_through() {
    let mut commands = MockPredictionCommand::new();
    commands
        .expect_create_prediction()
        .withf(|request| request.patient_id == UserId::from_uuid(PATIENT_ID))
        .times(1)
        .returning(|_| {
            Ok(crate::domain::ports::CreatePredictionResponse {
                prediction: prediction_payload(),
            })
        });
    let app = actix_test::init_service(test_app(commands, MockPredictionQuery::new())).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/predictions")
            .cookie(cookie)
            .set_json(create_body())
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["result"]["condition"], "influenza");
}

#[actix_web::test]
async fn listing_rejects_a_zero_page() {
    let mut queries = MockPredictionQuery::new();
    queries.expect_list_predictions().never();
    let app = actix_test::init_service(test_app(MockPredictionCommand::new(), queries)).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/predictions?page=0")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn listing_returns_page_metadata() {
    let mut queries = MockPredictionQuery::new();
    queries.expect_list_predictions().times(1).returning(|request| {
        Ok(Paginated::assemble(
            vec![prediction_payload()],
            request.params,
            11,
        ))
    });
    let app = actix_test::init_service(test_app(MockPredictionCommand::new(), queries)).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/predictions?page=1&limit=10")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["pagination"]["totalItems"], 11);
    assert_eq!(body["pagination"]["hasNextPage"], true);
}

#[actix_web::test]
async fn fetching_with_a_malformed_id_is_a_bad_request() {
    let mut queries = MockPredictionQuery::new();
    queries.expect_get_prediction().never();
    let app = actix_test::init_service(test_app(MockPredictionCommand::new(), queries)).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/predictions/not-a-uuid")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn stats_are_returned_for_patients() {
    let mut queries = MockPredictionQuery::new();
    queries
        .expect_prediction_stats()
        .times(1)
        .returning(|_| {
            Ok(crate::domain::ports::PredictionStatsPayload {
                total: 4,
                this_month: 2,
                average_confidence: Some(0.8),
                risk_levels: crate::domain::ports::RiskBreakdownPayload {
                    low: 1,
                    medium: 2,
                    high: 1,
                },
            })
        });
    let app = actix_test::init_service(test_app(MockPredictionCommand::new(), queries)).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/predictions/stats")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["riskLevels"]["medium"], 2);
}

#[actix_web::test]
async fn deleting_reports_revoked_shares() {
    let prediction_id = PredictionId::random();
    let mut commands = MockPredictionCommand::new();
    commands
        .expect_delete_prediction()
        .withf(move |request| request.prediction_id == prediction_id)
        .times(1)
        .returning(move |_| {
            Ok(DeletePredictionResponse {
                prediction_id,
                revoked_shares: 2,
            })
        });
    let app = actix_test::init_service(test_app(commands, MockPredictionQuery::new())).await;
    let cookie = login_as(&app, "patient").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/predictions/{prediction_id}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["revokedShares"], 2);
}
