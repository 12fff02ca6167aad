//! Turning an authenticated token subject into a live user row, and the
//! institutional email policy applied at registration.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::models::User;

/// Reject email addresses outside the institution's domain.
/// Matching is case-insensitive on the whole address.
pub fn validate_email_domain(email: &str, allowed_domain: &str) -> Result<()> {
    let suffix = format!("@{}", allowed_domain.to_lowercase());
    if email.to_lowercase().ends_with(&suffix) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Only {} email addresses are allowed",
            allowed_domain
        )))
    }
}

/// Load the user behind a validated token. A token whose subject no
/// longer exists is treated as unauthenticated, not as a missing
/// resource. Expired bans restore access at read time but the stored
/// ban fields stay until an explicit unban.
pub async fn resolve_user(db: &PgPool, user_id: Uuid) -> Result<User> {
    user_repo::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_domain_accepted() {
        assert!(validate_email_domain("student@apsit.edu.in", "apsit.edu.in").is_ok());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(validate_email_domain("Student@APSIT.EDU.IN", "apsit.edu.in").is_ok());
        assert!(validate_email_domain("student@apsit.edu.in", "APSIT.EDU.IN").is_ok());
    }

    #[test]
    fn test_foreign_domain_rejected() {
        assert!(validate_email_domain("someone@gmail.com", "apsit.edu.in").is_err());
    }

    #[test]
    fn test_embedded_domain_rejected() {
        // The domain must be the suffix, not merely contained
        assert!(validate_email_domain("x@apsit.edu.in.evil.com", "apsit.edu.in").is_err());
    }
}
