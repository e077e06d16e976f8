//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Wraps the Actix cookie session so handlers only deal with the
//! authenticated identity: who the caller is and which role they hold.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::ports::UserPayload;
use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Role stored alongside the user id in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Patient account.
    Patient,
    /// Doctor account.
    Doctor,
    /// Administrative account.
    Admin,
}

impl SessionRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Authenticated identity read back from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    /// Account id.
    pub id: UserId,
    /// Role recorded at login.
    pub role: SessionRole,
}

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated identity in the session cookie.
    pub fn persist_identity(&self, user: &UserPayload) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user.id.to_string())
            .and_then(|()| self.0.insert(ROLE_KEY, user.role.clone()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Drop everything stored in the session.
    pub fn purge(&self) {
        self.0.purge();
    }

    /// Fetch the current identity from the session, if present and intact.
    pub fn current(&self) -> Result<Option<SessionUser>, Error> {
        let read = |key: &str| {
            self.0
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_id), Some(raw_role)) = (read(USER_ID_KEY)?, read(ROLE_KEY)?) else {
            return Ok(None);
        };
        let Ok(id) = raw_id.parse::<UserId>() else {
            tracing::warn!("invalid user id in session cookie");
            return Ok(None);
        };
        let Some(role) = SessionRole::parse(&raw_role) else {
            tracing::warn!("invalid role in session cookie");
            return Ok(None);
        };
        Ok(Some(SessionUser { id, role }))
    }

    /// Require an authenticated identity or return `401 Unauthorized`.
    pub fn require(&self) -> Result<SessionUser, Error> {
        self.current()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Require a caller holding `role` or return `403 Forbidden`.
    pub fn require_role(&self, role: SessionRole) -> Result<UserId, Error> {
        let user = self.require()?;
        if user.role != role {
            return Err(Error::forbidden(format!(
                "this action requires a {} account",
                role.as_str()
            )));
        }
        Ok(user.id)
    }

    /// Require an authenticated patient.
    pub fn require_patient(&self) -> Result<UserId, Error> {
        self.require_role(SessionRole::Patient)
    }

    /// Require an authenticated doctor.
    pub fn require_doctor(&self) -> Result<UserId, Error> {
        self.require_role(SessionRole::Doctor)
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
