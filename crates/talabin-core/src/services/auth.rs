// Auth endpoints: login, registration, OTP, profile, logout

use secrecy::ExposeSecret;
use serde_json::json;
use talabin_api::endpoints::auth as ep;
use talabin_api::models::{
    LoginRequest, LoginResponse, OtpIssued, OtpPurpose, OtpRequest, PasswordChange,
    ProfileUpdate, RefreshRequest, RegisterRequest, User,
};
use talabin_api::{ApiError, ApiRequest, ErrorKind, ResponseEnvelope};
use tracing::{debug, info, warn};

use super::TalabinClient;
use crate::error::CoreError;
use crate::session::Credential;

impl TalabinClient {
    /// Log in with phone number and password and persist the session.
    ///
    /// `POST /auth/login/` (public). On success the store holds the new
    /// credential and identity before this returns.
    pub async fn login(&self, phone_number: &str, password: &str) -> ResponseEnvelope<User> {
        let request = ApiRequest::post(ep::LOGIN).json(&LoginRequest {
            phone_number,
            password,
        });
        let envelope = self
            .auth_client()
            .execute_public::<LoginResponse>(&request)
            .await;

        let (data, message) = match envelope {
            ResponseEnvelope::Success { data, message } => (data, message),
            ResponseEnvelope::Failure { error, message } => {
                debug!(kind = ?error.kind, "login rejected");
                return ResponseEnvelope::Failure { error, message };
            }
        };

        let credential = Credential::new(data.tokens.access, data.tokens.refresh);
        if let Err(e) = self.store().set_session(credential, data.user.clone()) {
            warn!("login succeeded but session could not be saved: {e}");
            return ResponseEnvelope::failure(
                ApiError::from_kind(ErrorKind::Unknown).with_details(json!({
                    "reason": e.to_string(),
                })),
            );
        }
        info!(user_id = data.user.id, "logged in");
        ResponseEnvelope::Success {
            data: data.user,
            message,
        }
    }

    /// `POST /auth/register/` (public).
    pub async fn register(&self, registration: &RegisterRequest<'_>) -> ResponseEnvelope<OtpIssued> {
        let request = ApiRequest::post(ep::REGISTER).json(registration);
        self.auth_client().execute_public(&request).await
    }

    /// `POST /auth/send-otp/` (public).
    pub async fn send_otp(
        &self,
        phone_number: &str,
        purpose: OtpPurpose,
    ) -> ResponseEnvelope<OtpIssued> {
        let request = ApiRequest::post(ep::SEND_OTP).json(&OtpRequest {
            phone_number,
            otp_type: purpose,
            code: None,
        });
        self.auth_client().execute_public(&request).await
    }

    /// `POST /auth/verify-otp/` (public).
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> ResponseEnvelope<()> {
        let request = ApiRequest::post(ep::VERIFY_OTP).json(&OtpRequest {
            phone_number,
            otp_type: purpose,
            code: Some(code),
        });
        self.auth_client().execute_public(&request).await
    }

    /// `GET /auth/me/`. A successful answer also refreshes the cached
    /// identity.
    pub async fn me(&self) -> ResponseEnvelope<User> {
        let envelope = self
            .auth_client()
            .execute::<User>(&ApiRequest::get(ep::ME))
            .await;
        self.remember_identity(&envelope);
        envelope
    }

    /// `PUT /auth/profile/update/`. The updated user replaces the cached
    /// identity.
    pub async fn update_profile(&self, update: &ProfileUpdate<'_>) -> ResponseEnvelope<User> {
        let request = ApiRequest::put(ep::PROFILE_UPDATE).json(update);
        let envelope = self.auth_client().execute::<User>(&request).await;
        self.remember_identity(&envelope);
        envelope
    }

    /// `POST /auth/profile/change-password/`
    pub async fn change_password(&self, change: &PasswordChange<'_>) -> ResponseEnvelope<()> {
        let request = ApiRequest::post(ep::CHANGE_PASSWORD).json(change);
        self.auth_client().execute(&request).await
    }

    fn remember_identity(&self, envelope: &ResponseEnvelope<User>) {
        let Some(user) = envelope.data() else {
            return;
        };
        if self.store().identity().as_ref() != Some(user) {
            if let Err(e) = self.store().set_identity(user.clone()) {
                warn!("could not cache identity: {e}");
            }
        }
    }

    /// End the session.
    ///
    /// The refresh token is revoked server-side on a best-effort basis
    /// (`POST /auth/logout/`); the local session is cleared regardless.
    pub async fn logout(&self) -> Result<(), CoreError> {
        if let Some(credential) = self.store().credential() {
            let request = ApiRequest::post(ep::LOGOUT).json(&RefreshRequest {
                refresh: credential.refresh_token().expose_secret(),
            });
            let envelope = self.auth_client().execute::<()>(&request).await;
            match envelope.error() {
                None => debug!("refresh token revoked"),
                Some(error) => warn!(kind = ?error.kind, "server-side logout failed: {}", error.message),
            }
        }
        self.store().clear()?;
        info!("logged out");
        Ok(())
    }
}
