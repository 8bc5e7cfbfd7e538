use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};

pub(crate) use crate::auth::dto::{JwtKeys, SessionUser};
use crate::{
    auth::{claims::Claims, password::verify_password, repo_types::User},
    config::JwtConfig,
    db::Database,
    error::{AppError, AppResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

/// One year. Longer lifetimes are cut down to this.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(1, MAX_TTL_MINUTES) as u64 * 60),
        }
    }

    pub fn sign(&self, user: &SessionUser) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt sign: {e}")))?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    /// Signature, expiry, issuer and audience check. No store round-trip.
    pub fn verify(&self, token: &str) -> AppResult<SessionUser> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AppError::Auth("invalid or expired session".into()))?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(SessionUser {
            id: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredentials,
    StoreUnavailable,
    UnknownEmail,
    WrongPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(SessionUser),
    Rejected(RejectReason),
}

/// Credentials check of a single login attempt.
pub async fn authorize(db: &Database, email: Option<&str>, password: Option<&str>) -> LoginOutcome {
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return LoginOutcome::Rejected(RejectReason::MissingCredentials);
    };

    if !db.is_configured() {
        warn!("login attempted without a configured database");
        return LoginOutcome::Rejected(RejectReason::StoreUnavailable);
    }

    let Some(user) = db.get_user_by_email(email).await else {
        return LoginOutcome::Rejected(RejectReason::UnknownEmail);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {
            info!(user_id = %user.id, "user logged in");
            LoginOutcome::Authenticated(SessionUser::from(&user))
        }
        Ok(false) => LoginOutcome::Rejected(RejectReason::WrongPassword),
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "stored password hash is unreadable");
            LoginOutcome::Rejected(RejectReason::WrongPassword)
        }
    }
}
