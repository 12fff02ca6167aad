//! Google sign-in: an ID token assertion verified against the tokeninfo
//! endpoint, or an OAuth access token introspected against the userinfo
//! endpoint. Both paths end in the same account linking.

use serde::Deserialize;
use sqlx::PgPool;

use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::identity;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// A verified Google identity, however it was obtained.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Shape of the tokeninfo response. `email_verified` arrives as the
/// string "true", not a boolean.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenInfo {
    pub aud: String,
    pub sub: String,
    pub email: String,
    pub email_verified: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Shape of the v3 userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

fn ensure_configured(client_id: &str) -> Result<()> {
    if client_id.is_empty() {
        return Err(AppError::Internal(
            "Google OAuth is not configured".to_string(),
        ));
    }
    Ok(())
}

/// Check a tokeninfo payload was issued for us and carries a verified
/// email, then reduce it to a profile.
pub fn profile_from_tokeninfo(info: GoogleTokenInfo, client_id: &str) -> Result<GoogleProfile> {
    if info.aud != client_id {
        tracing::warn!("Google token audience mismatch");
        return Err(AppError::Authentication(
            "Token was not issued for this application".to_string(),
        ));
    }

    if info.email_verified.as_deref() != Some("true") {
        return Err(AppError::Authentication(
            "Google account email is not verified".to_string(),
        ));
    }

    Ok(GoogleProfile {
        sub: info.sub,
        email: info.email,
        name: info.name,
        picture: info.picture,
    })
}

/// Reduce a userinfo payload to a profile. The userinfo endpoint only
/// answers for the token's own account, so there is no audience to
/// check, but the email still has to be verified.
pub fn profile_from_userinfo(info: GoogleUserInfo) -> Result<GoogleProfile> {
    if info.email_verified != Some(true) {
        return Err(AppError::Authentication(
            "Google account email is not verified".to_string(),
        ));
    }

    Ok(GoogleProfile {
        sub: info.sub,
        email: info.email,
        name: info.name,
        picture: info.picture,
    })
}

/// Verify an ID token with Google's tokeninfo endpoint.
pub async fn verify_google_token(id_token: &str, client_id: &str) -> Result<GoogleProfile> {
    ensure_configured(client_id)?;

    let response = reqwest::Client::new()
        .get(TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reach Google: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Authentication(
            "Invalid Google token".to_string(),
        ));
    }

    let info: GoogleTokenInfo = response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Unexpected tokeninfo response: {}", e)))?;

    profile_from_tokeninfo(info, client_id)
}

/// Resolve an OAuth access token to its account via the userinfo
/// endpoint.
pub async fn verify_google_access_token(
    access_token: &str,
    client_id: &str,
) -> Result<GoogleProfile> {
    ensure_configured(client_id)?;

    let response = reqwest::Client::new()
        .get(USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reach Google: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Authentication(
            "Invalid Google access token".to_string(),
        ));
    }

    let info: GoogleUserInfo = response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Unexpected userinfo response: {}", e)))?;

    profile_from_userinfo(info)
}

/// Find or create the local account for a verified Google identity.
/// Existing accounts only get missing fields filled in; an already-set
/// google_id or profile picture is never overwritten.
pub async fn link_or_create_user(
    db: &PgPool,
    profile: &GoogleProfile,
    allowed_domain: &str,
) -> Result<User> {
    identity::validate_email_domain(&profile.email, allowed_domain)?;

    let email = profile.email.to_lowercase();

    if let Some(user) = user_repo::find_by_email(db, &email).await? {
        let google_id = user
            .google_id
            .clone()
            .or_else(|| Some(profile.sub.clone()));
        let profile_picture = user
            .profile_picture
            .clone()
            .or_else(|| profile.picture.clone());

        let updated =
            user_repo::link_google_identity(db, user.id, google_id, profile_picture).await?;
        return Ok(updated);
    }

    let name = profile
        .name
        .clone()
        .unwrap_or_else(|| email.split('@').next().unwrap_or("Student").to_string());

    let user = user_repo::create_google_user(
        db,
        &email,
        &name,
        &profile.sub,
        profile.picture.as_deref(),
    )
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokeninfo(aud: &str, verified: Option<&str>) -> GoogleTokenInfo {
        GoogleTokenInfo {
            aud: aud.to_string(),
            sub: "google-sub-1".to_string(),
            email: "student@apsit.edu.in".to_string(),
            email_verified: verified.map(str::to_string),
            name: Some("Student".to_string()),
            picture: None,
        }
    }

    #[test]
    fn test_tokeninfo_for_us_with_verified_email_passes() {
        let profile = profile_from_tokeninfo(tokeninfo("our-client", Some("true")), "our-client")
            .expect("profile");
        assert_eq!(profile.sub, "google-sub-1");
        assert_eq!(profile.email, "student@apsit.edu.in");
    }

    #[test]
    fn test_tokeninfo_audience_mismatch_rejected() {
        let result = profile_from_tokeninfo(tokeninfo("other-app", Some("true")), "our-client");
        assert!(result.is_err());
    }

    #[test]
    fn test_tokeninfo_unverified_email_rejected() {
        assert!(profile_from_tokeninfo(tokeninfo("our-client", Some("false")), "our-client").is_err());
        assert!(profile_from_tokeninfo(tokeninfo("our-client", None), "our-client").is_err());
    }

    #[test]
    fn test_userinfo_requires_verified_email() {
        let info = GoogleUserInfo {
            sub: "google-sub-2".to_string(),
            email: "student@apsit.edu.in".to_string(),
            email_verified: Some(false),
            name: None,
            picture: None,
        };
        assert!(profile_from_userinfo(info.clone()).is_err());

        let verified = GoogleUserInfo {
            email_verified: Some(true),
            ..info
        };
        let profile = profile_from_userinfo(verified).expect("profile");
        assert_eq!(profile.sub, "google-sub-2");
    }
}
