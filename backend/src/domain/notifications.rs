//! Pure rendering of outbound email notifications.
//!
//! Rendering is separated from delivery so the templates stay unit-testable
//! without a transport. Greetings dispatch on the recipient's profile.

use crate::domain::share::ShareCode;
use crate::domain::user::{Email, User};

/// A rendered email ready for the mailer port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: Email,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

fn greeting(user: &User) -> String {
    if user.profile().is_doctor() {
        format!("Dr. {}", user.full_name())
    } else {
        user.full_name().to_string()
    }
}

/// Account-verification email carrying a one-time code.
#[must_use]
pub fn verification_email(user: &User, code: &str) -> EmailMessage {
    EmailMessage {
        to: user.email().clone(),
        subject: "Verify your MediShare account".to_owned(),
        html: format!(
            "<p>Hello {greeting},</p>\
             <p>Your verification code is <strong>{code}</strong>. \
             It expires in 10 minutes.</p>\
             <p>If you did not create an account, you can ignore this email.</p>",
            greeting = greeting(user),
        ),
    }
}

/// Welcome email sent once the account is verified.
///
/// Doctors get an onboarding note about responding to shared predictions;
/// patients get one about creating and sharing them.
#[must_use]
pub fn welcome_email(user: &User, frontend_url: &str) -> EmailMessage {
    let link = format!("{frontend_url}/dashboard");
    let onboarding = if user.profile().is_doctor() {
        "Patients can now share their symptom predictions with you, \
         and you can review and respond to them from your dashboard."
    } else {
        "You can now create symptom predictions and share them with \
         your doctor from your dashboard."
    };
    EmailMessage {
        to: user.email().clone(),
        subject: "Welcome to MediShare".to_owned(),
        html: format!(
            "<p>Hello {greeting},</p>\
             <p>Your account has been verified. {onboarding}</p>\
             <p><a href=\"{link}\">Go to your dashboard</a>.</p>",
            greeting = greeting(user),
        ),
    }
}

/// Password-reset email carrying a single-use link.
#[must_use]
pub fn password_reset_email(user: &User, frontend_url: &str, token: &str) -> EmailMessage {
    let link = format!("{frontend_url}/reset-password?token={token}");
    EmailMessage {
        to: user.email().clone(),
        subject: "Reset your MediShare password".to_owned(),
        html: format!(
            "<p>Hello {greeting},</p>\
             <p><a href=\"{link}\">Reset your password</a>. \
             The link expires in 15 minutes.</p>\
             <p>If you did not request a reset, you can ignore this email.</p>",
            greeting = greeting(user),
        ),
    }
}

/// Notification to a doctor that a patient shared a prediction with them.
#[must_use]
pub fn share_created_email(
    doctor: &User,
    patient_name: &str,
    condition: &str,
    frontend_url: &str,
    code: &ShareCode,
) -> EmailMessage {
    let link = format!("{frontend_url}/shared/{code}");
    EmailMessage {
        to: doctor.email().clone(),
        subject: format!("{patient_name} shared a prediction with you"),
        html: format!(
            "<p>Hello {greeting},</p>\
             <p>{patient_name} has shared a symptom prediction \
             ({condition}) with you.</p>\
             <p><a href=\"{link}\">Open the shared prediction</a>. \
             The share expires 30 days after it was created.</p>",
            greeting = greeting(doctor),
        ),
    }
}

/// Notification to a patient that their doctor responded.
#[must_use]
pub fn share_responded_email(
    patient: &User,
    doctor_name: &str,
    condition: &str,
    frontend_url: &str,
) -> EmailMessage {
    let link = format!("{frontend_url}/shares");
    EmailMessage {
        to: patient.email().clone(),
        subject: format!("Dr. {doctor_name} responded to your shared prediction"),
        html: format!(
            "<p>Hello {greeting},</p>\
             <p>Dr. {doctor_name} has responded to the prediction \
             ({condition}) you shared.</p>\
             <p><a href=\"{link}\">Read the response</a>.</p>",
            greeting = greeting(patient),
        ),
    }
}
