//! Regression coverage for the share workflow service.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    FixedClock, FixtureMailer, MailerError, MockMailer, MockPredictionRepository,
    MockShareRepository, MockUserRepository,
};
use crate::domain::prediction::{
    ClinicalInputs, ClinicalInputsDraft, Prediction, PredictionDraft, PredictionId,
    PredictionResult, RiskLevel, Severity, Sex,
};
use crate::domain::user::{DoctorProfile, FullName, PasswordHash, Profile, UserDraft, Username};

const FRONTEND_URL: &str = "https://app.test";

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp")
}

fn make_user(email: &str, profile: Profile, verified: bool) -> User {
    User::new(UserDraft {
        id: UserId::random(),
        username: Username::new(email.split('@').next().expect("local part"))
            .expect("valid username"),
        email: Email::new(email).expect("valid email"),
        full_name: FullName::new("Test Person").expect("valid name"),
        password_hash: PasswordHash::new("$argon2id$stub".to_owned()),
        profile,
        verified,
        otp: None,
        reset: None,
        created_at: fixed_now(),
    })
}

fn make_patient() -> User {
    make_user("ada@example.com", Profile::Patient, true)
}

fn make_doctor(verified: bool) -> User {
    make_user(
        "grey@clinic.org",
        Profile::Doctor(DoctorProfile::new("cardiology", "GMC-1", 10).expect("valid profile")),
        verified,
    )
}

fn make_prediction(patient_id: UserId) -> Prediction {
    Prediction::new(PredictionDraft {
        id: PredictionId::random(),
        patient_id,
        inputs: ClinicalInputs::new(ClinicalInputsDraft {
            symptoms: vec!["headache".into()],
            age: 34,
            sex: Sex::Female,
            systolic_bp: 118,
            duration_days: 3,
            severity: Severity::Moderate,
        })
        .expect("valid inputs"),
        result: PredictionResult::new("migraine", 0.82, RiskLevel::Low, vec!["rest".into()], None)
            .expect("valid result"),
        deleted: false,
        created_at: fixed_now(),
    })
}

fn make_share(
    prediction: &Prediction,
    patient: &User,
    doctor: &User,
    status: ShareStatus,
) -> SharedPrediction {
    SharedPrediction::new(SharedPredictionDraft {
        id: ShareId::random(),
        prediction_id: prediction.id(),
        patient_id: patient.id(),
        doctor_id: doctor.id(),
        share_code: ShareCode::generate(&mut SmallRng::seed_from_u64(11)),
        message: None,
        status,
        viewed_at: matches!(status, ShareStatus::Viewed | ShareStatus::Responded)
            .then(fixed_now),
        response: None,
        revoked_at: (status == ShareStatus::Revoked).then(fixed_now),
        expires_at: fixed_now() + share_ttl(),
        created_at: fixed_now(),
    })
}

fn make_record(share: SharedPrediction, patient: &User, doctor: &User) -> ShareRecord {
    ShareRecord {
        patient: participant_summary(patient),
        doctor: participant_summary(doctor),
        prediction: PredictionSummary {
            id: share.prediction_id(),
            condition: "migraine".to_owned(),
            risk_level: RiskLevel::Low,
            confidence: 0.82,
            created_at: fixed_now(),
        },
        share,
    }
}

fn service<M: Mailer>(
    shares: MockShareRepository,
    predictions: MockPredictionRepository,
    users: MockUserRepository,
    mailer: M,
) -> ShareService<MockShareRepository, MockPredictionRepository, MockUserRepository, M, FixedClock>
{
    ShareService::new(
        Arc::new(shares),
        Arc::new(predictions),
        Arc::new(users),
        Arc::new(mailer),
        Arc::new(FixedClock(fixed_now())),
        FRONTEND_URL,
    )
}

#[rstest]
#[tokio::test]
async fn create_share_rejects_unknown_prediction() {
    let mut predictions = MockPredictionRepository::new();
    predictions.expect_find_active().returning(|_, _| Ok(None));
    let service = service(
        MockShareRepository::new(),
        predictions,
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .create_share(CreateShareRequest {
            patient_id: UserId::random(),
            prediction_id: PredictionId::random(),
            doctor_email: "grey@clinic.org".into(),
            message: None,
        })
        .await
        .expect_err("unknown prediction");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn create_share_rejects_unverified_doctor() {
    let patient = make_patient();
    let prediction = make_prediction(patient.id());
    let doctor = make_doctor(false);

    let mut predictions = MockPredictionRepository::new();
    let found = prediction.clone();
    predictions
        .expect_find_active()
        .returning(move |_, _| Ok(Some(found.clone())));
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_email()
        .returning(move |_| Ok(Some(doctor.clone())));
    let service = service(MockShareRepository::new(), predictions, users, FixtureMailer);

    let error = service
        .create_share(CreateShareRequest {
            patient_id: patient.id(),
            prediction_id: prediction.id(),
            doctor_email: "grey@clinic.org".into(),
            message: None,
        })
        .await
        .expect_err("unverified doctor");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn create_share_conflicts_on_duplicate_pair() {
    let patient = make_patient();
    let prediction = make_prediction(patient.id());
    let doctor = make_doctor(true);

    let mut predictions = MockPredictionRepository::new();
    let found = prediction.clone();
    predictions
        .expect_find_active()
        .returning(move |_, _| Ok(Some(found.clone())));
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_email()
        .returning(move |_| Ok(Some(doctor.clone())));
    let mut shares = MockShareRepository::new();
    shares.expect_active_share_exists().returning(|_, _| Ok(true));
    let service = service(shares, predictions, users, FixtureMailer);

    let error = service
        .create_share(CreateShareRequest {
            patient_id: patient.id(),
            prediction_id: prediction.id(),
            doctor_email: "grey@clinic.org".into(),
            message: None,
        })
        .await
        .expect_err("duplicate pair");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn create_share_succeeds_even_when_mail_fails() {
    let patient = make_patient();
    let prediction = make_prediction(patient.id());
    let doctor = make_doctor(true);

    let mut predictions = MockPredictionRepository::new();
    let found = prediction.clone();
    predictions
        .expect_find_active()
        .returning(move |_, _| Ok(Some(found.clone())));
    let mut users = MockUserRepository::new();
    let by_email = doctor.clone();
    users
        .expect_find_by_email()
        .returning(move |_| Ok(Some(by_email.clone())));
    let by_id = patient.clone();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(by_id.clone())));
    let mut shares = MockShareRepository::new();
    shares
        .expect_active_share_exists()
        .returning(|_, _| Ok(false));
    shares.expect_insert().times(1).returning(|_| Ok(()));
    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .times(1)
        .returning(|_| Err(MailerError::transport("relay down")));
    let service = service(shares, predictions, users, mailer);

    let response = service
        .create_share(CreateShareRequest {
            patient_id: patient.id(),
            prediction_id: prediction.id(),
            doctor_email: "grey@clinic.org".into(),
            message: Some("please take a look".into()),
        })
        .await
        .expect("share is created despite mail failure");

    assert_eq!(response.share.status, ShareStatus::Pending);
    assert_eq!(response.share.share_code.len(), 32);
    assert_eq!(response.share.expires_at, fixed_now() + share_ttl());
}

#[rstest]
#[tokio::test]
async fn create_share_retries_code_collisions() {
    let patient = make_patient();
    let prediction = make_prediction(patient.id());
    let doctor = make_doctor(true);

    let mut predictions = MockPredictionRepository::new();
    let found = prediction.clone();
    predictions
        .expect_find_active()
        .returning(move |_, _| Ok(Some(found.clone())));
    let mut users = MockUserRepository::new();
    let by_email = doctor.clone();
    users
        .expect_find_by_email()
        .returning(move |_| Ok(Some(by_email.clone())));
    let by_id = patient.clone();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(by_id.clone())));
    let mut shares = MockShareRepository::new();
    shares
        .expect_active_share_exists()
        .returning(|_, _| Ok(false));
    shares
        .expect_insert()
        .times(1)
        .returning(|_| Err(ShareRepositoryError::DuplicateCode));
    shares.expect_insert().times(1).returning(|_| Ok(()));
    let service = service(shares, predictions, users, FixtureMailer);

    let response = service
        .create_share(CreateShareRequest {
            patient_id: patient.id(),
            prediction_id: prediction.id(),
            doctor_email: "grey@clinic.org".into(),
            message: None,
        })
        .await
        .expect("second attempt succeeds");

    assert_eq!(response.share.status, ShareStatus::Pending);
}

#[rstest]
#[tokio::test]
async fn view_share_rejects_substitute_doctor() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let record = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Pending),
        &patient,
        &doctor,
    );

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_code()
        .returning(move |_| Ok(Some(record.clone())));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .view_share(ViewShareRequest {
            doctor_id: UserId::random(),
            code: "0".repeat(32),
        })
        .await
        .expect_err("wrong doctor");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn first_view_stamps_the_share() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let pending = make_share(&prediction, &patient, &doctor, ShareStatus::Pending);
    let viewed = make_share(&prediction, &patient, &doctor, ShareStatus::Viewed);
    let doctor_id = doctor.id();

    let mut shares = MockShareRepository::new();
    let first = make_record(pending, &patient, &doctor);
    shares
        .expect_find_by_code()
        .times(1)
        .returning(move |_| Ok(Some(first.clone())));
    shares.expect_mark_viewed().times(1).returning(|_, _| Ok(true));
    let second = make_record(viewed, &patient, &doctor);
    shares
        .expect_find_by_code()
        .times(1)
        .returning(move |_| Ok(Some(second.clone())));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let response = service
        .view_share(ViewShareRequest {
            doctor_id,
            code: "0".repeat(32),
        })
        .await
        .expect("first view succeeds");

    assert_eq!(response.share.status, ShareStatus::Viewed);
}

#[rstest]
#[tokio::test]
async fn repeat_views_do_not_restamp() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let record = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Viewed),
        &patient,
        &doctor,
    );
    let doctor_id = doctor.id();
    let viewed_at = record.share.viewed_at();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_code()
        .returning(move |_| Ok(Some(record.clone())));
    shares.expect_mark_viewed().never();
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let response = service
        .view_share(ViewShareRequest {
            doctor_id,
            code: "0".repeat(32),
        })
        .await
        .expect("repeat view succeeds");

    assert_eq!(response.share.status, ShareStatus::Viewed);
    assert_eq!(response.share.viewed_at, viewed_at);
}

#[rstest]
#[tokio::test]
async fn expired_shares_are_not_found() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let mut share = make_share(&prediction, &patient, &doctor, ShareStatus::Pending);
    share = SharedPrediction::new(SharedPredictionDraft {
        id: share.id(),
        prediction_id: share.prediction_id(),
        patient_id: share.patient_id(),
        doctor_id: share.doctor_id(),
        share_code: share.share_code().clone(),
        message: None,
        status: ShareStatus::Pending,
        viewed_at: None,
        response: None,
        revoked_at: None,
        expires_at: fixed_now() - Duration::seconds(1),
        created_at: fixed_now() - Duration::days(31),
    });
    let doctor_id = doctor.id();
    let record = make_record(share, &patient, &doctor);

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_code()
        .returning(move |_| Ok(Some(record.clone())));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .view_share(ViewShareRequest {
            doctor_id,
            code: "0".repeat(32),
        })
        .await
        .expect_err("expired share");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn responding_with_an_empty_message_is_invalid() {
    let service = service(
        MockShareRepository::new(),
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .respond_to_share(RespondToShareRequest {
            doctor_id: UserId::random(),
            code: "0".repeat(32),
            message: "   ".into(),
            recommendations: vec![],
            follow_up_required: false,
        })
        .await
        .expect_err("empty message");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn responding_to_a_revoked_share_is_not_found() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let record = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Revoked),
        &patient,
        &doctor,
    );
    let doctor_id = doctor.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_code()
        .returning(move |_| Ok(Some(record.clone())));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .respond_to_share(RespondToShareRequest {
            doctor_id,
            code: "0".repeat(32),
            message: "looks fine".into(),
            recommendations: vec![],
            follow_up_required: false,
        })
        .await
        .expect_err("revoked share");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn losing_the_respond_race_is_not_found() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let record = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Viewed),
        &patient,
        &doctor,
    );
    let doctor_id = doctor.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_code()
        .returning(move |_| Ok(Some(record.clone())));
    shares
        .expect_record_response()
        .times(1)
        .returning(|_, _| Ok(false));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .respond_to_share(RespondToShareRequest {
            doctor_id,
            code: "0".repeat(32),
            message: "looks fine".into(),
            recommendations: vec![],
            follow_up_required: false,
        })
        .await
        .expect_err("conditional update missed");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn responding_notifies_the_patient() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let viewed = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Viewed),
        &patient,
        &doctor,
    );
    let responded = {
        let mut record = viewed.clone();
        record.share = SharedPrediction::new(SharedPredictionDraft {
            id: record.share.id(),
            prediction_id: record.share.prediction_id(),
            patient_id: record.share.patient_id(),
            doctor_id: record.share.doctor_id(),
            share_code: record.share.share_code().clone(),
            message: None,
            status: ShareStatus::Responded,
            viewed_at: record.share.viewed_at(),
            response: Some(
                DoctorResponse::new("rest and hydrate", vec![], false, fixed_now())
                    .expect("valid response"),
            ),
            revoked_at: None,
            expires_at: record.share.expires_at(),
            created_at: record.share.created_at(),
        });
        record
    };
    let doctor_id = doctor.id();
    let patient_email = patient.email().clone();

    let mut shares = MockShareRepository::new();
    let first = viewed.clone();
    shares
        .expect_find_by_code()
        .times(1)
        .returning(move |_| Ok(Some(first.clone())));
    shares
        .expect_record_response()
        .times(1)
        .returning(|_, _| Ok(true));
    let second = responded;
    shares
        .expect_find_by_code()
        .times(1)
        .returning(move |_| Ok(Some(second.clone())));
    let mut users = MockUserRepository::new();
    let by_id = patient.clone();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(by_id.clone())));
    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .withf(move |message| message.to == patient_email)
        .times(1)
        .returning(|_| Ok(()));
    let service = service(shares, MockPredictionRepository::new(), users, mailer);

    let response = service
        .respond_to_share(RespondToShareRequest {
            doctor_id,
            code: "0".repeat(32),
            message: "rest and hydrate".into(),
            recommendations: vec![],
            follow_up_required: false,
        })
        .await
        .expect("respond succeeds");

    assert_eq!(response.share.status, ShareStatus::Responded);
    assert!(response.share.response.is_some());
}

#[rstest]
#[tokio::test]
async fn revoking_a_foreign_share_is_not_found() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let share = make_share(&prediction, &patient, &doctor, ShareStatus::Pending);
    let share_id = share.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_id()
        .returning(move |_| Ok(Some(share.clone())));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .revoke_share(RevokeShareRequest {
            patient_id: UserId::random(),
            share_id,
        })
        .await
        .expect_err("foreign share");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn revoking_twice_is_not_found() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let share = make_share(&prediction, &patient, &doctor, ShareStatus::Revoked);
    let share_id = share.id();
    let patient_id = patient.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_id()
        .returning(move |_| Ok(Some(share.clone())));
    shares.expect_revoke().never();
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let error = service
        .revoke_share(RevokeShareRequest {
            patient_id,
            share_id,
        })
        .await
        .expect_err("already revoked");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn revoking_an_active_share_succeeds() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let share = make_share(&prediction, &patient, &doctor, ShareStatus::Viewed);
    let share_id = share.id();
    let patient_id = patient.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_id()
        .returning(move |_| Ok(Some(share.clone())));
    shares.expect_revoke().times(1).returning(|_, _, _| Ok(true));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let response = service
        .revoke_share(RevokeShareRequest {
            patient_id,
            share_id,
        })
        .await
        .expect("revoke succeeds");

    assert_eq!(response.status, ShareStatus::Revoked);
    assert_eq!(response.revoked_at, fixed_now());
}

#[rstest]
#[tokio::test]
async fn revoking_a_responded_share_succeeds() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let share = make_share(&prediction, &patient, &doctor, ShareStatus::Responded);
    let share_id = share.id();
    let patient_id = patient.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_find_by_id()
        .returning(move |_| Ok(Some(share.clone())));
    shares.expect_revoke().times(1).returning(|_, _, _| Ok(true));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let response = service
        .revoke_share(RevokeShareRequest {
            patient_id,
            share_id,
        })
        .await
        .expect("answered shares remain revocable");

    assert_eq!(response.status, ShareStatus::Revoked);
}

#[rstest]
#[tokio::test]
async fn patient_listing_carries_pagination_metadata() {
    let patient = make_patient();
    let doctor = make_doctor(true);
    let prediction = make_prediction(patient.id());
    let record = make_record(
        make_share(&prediction, &patient, &doctor, ShareStatus::Pending),
        &patient,
        &doctor,
    );
    let patient_id = patient.id();

    let mut shares = MockShareRepository::new();
    shares
        .expect_list_for_patient()
        .returning(move |_, _| Ok((vec![record.clone()], 11)));
    let service = service(
        shares,
        MockPredictionRepository::new(),
        MockUserRepository::new(),
        FixtureMailer,
    );

    let page = service
        .list_for_patient(ListPatientSharesRequest {
            patient_id,
            params: pagination::PageParams::new(2, 10).expect("valid params"),
        })
        .await
        .expect("list succeeds");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total_items, 11);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(page.pagination.has_prev_page);
    assert!(!page.pagination.has_next_page);
}
