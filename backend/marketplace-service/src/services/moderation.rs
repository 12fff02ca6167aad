//! Report lifecycle rules, content auto-flagging, and the admin activity
//! log side effect every admin mutation carries.

use actix_web::HttpRequest;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::activity_log_repo;
use crate::error::{AppError, Result};
use crate::models::ReportStatus;

// ============================================
// Report state machine
// ============================================

/// Permitted transitions. Resolved and dismissed are terminal; a
/// reviewed report may still be closed either way.
pub fn transition_permitted(from: ReportStatus, to: ReportStatus) -> bool {
    use ReportStatus::*;
    matches!(
        (from, to),
        (Pending, Reviewed)
            | (Pending, Resolved)
            | (Pending, Dismissed)
            | (Reviewed, Resolved)
            | (Reviewed, Dismissed)
    )
}

pub fn check_transition(from: ReportStatus, to: ReportStatus) -> Result<()> {
    if transition_permitted(from, to) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Cannot move report from {} to {}",
            from.as_str(),
            to.as_str()
        )))
    }
}

/// resolved_at is set exactly when a report enters a terminal state.
pub fn resolution_timestamp(to: ReportStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if to.is_terminal() {
        Some(now)
    } else {
        None
    }
}

// ============================================
// Auto-flag heuristics (advisory, never blocking)
// ============================================

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "free iphone",
    "guaranteed money",
    "easy cash",
    "quick money",
    "whatsapp",
    "telegram",
    "pay first",
    "advance payment",
    "western union",
    "bitcoin",
    "crypto",
];

static SPAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"https?://[^\s]+", // external URLs
        r"\b\d{10}\b",      // 10-digit phone numbers
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spam pattern must compile"))
    .collect()
});

/// Check free text for suspicious keywords or spam patterns.
pub fn check_content_for_flags(content: &str) -> Option<String> {
    let lower = content.to_lowercase();

    for keyword in SUSPICIOUS_KEYWORDS {
        if lower.contains(keyword) {
            return Some(format!("Contains suspicious keyword: {}", keyword));
        }
    }

    for pattern in SPAM_PATTERNS.iter() {
        if pattern.is_match(content) {
            return Some("Contains suspicious pattern".to_string());
        }
    }

    None
}

pub fn should_auto_flag_listing(title: &str, description: &str, price: f64) -> Option<String> {
    if price <= 0.0 {
        return Some("Price is zero or negative".to_string());
    }
    if price < 10.0 {
        return Some("Suspiciously low price".to_string());
    }

    let combined = format!("{} {}", title, description);
    check_content_for_flags(&combined)
}

pub fn should_auto_flag_message(content: &str) -> Option<String> {
    check_content_for_flags(content)
}

// ============================================
// Admin activity log
// ============================================

/// Append an activity log entry. Mandatory for every admin mutation;
/// callers invoke this after the mutation commits.
pub async fn log_admin_activity(
    db: &PgPool,
    admin_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    details: serde_json::Value,
    ip_address: Option<String>,
) -> Result<()> {
    activity_log_repo::insert(db, admin_id, action, target_type, target_id, details, ip_address)
        .await?;
    Ok(())
}

/// Client address for the activity log: first hop of X-Forwarded-For
/// when present, otherwise the peer address.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    req.peer_addr().map(|a| a.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_may_go_anywhere_forward() {
        assert!(transition_permitted(ReportStatus::Pending, ReportStatus::Reviewed));
        assert!(transition_permitted(ReportStatus::Pending, ReportStatus::Resolved));
        assert!(transition_permitted(ReportStatus::Pending, ReportStatus::Dismissed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in [
            ReportStatus::Pending,
            ReportStatus::Reviewed,
            ReportStatus::Resolved,
            ReportStatus::Dismissed,
        ] {
            assert!(!transition_permitted(ReportStatus::Resolved, to));
            assert!(!transition_permitted(ReportStatus::Dismissed, to));
        }
    }

    #[test]
    fn test_no_backward_transition_to_pending() {
        assert!(!transition_permitted(ReportStatus::Reviewed, ReportStatus::Pending));
        assert!(check_transition(ReportStatus::Resolved, ReportStatus::Pending).is_err());
    }

    #[test]
    fn test_resolution_timestamp_only_for_terminal() {
        let now = Utc::now();
        assert!(resolution_timestamp(ReportStatus::Reviewed, now).is_none());
        assert_eq!(resolution_timestamp(ReportStatus::Resolved, now), Some(now));
        assert_eq!(resolution_timestamp(ReportStatus::Dismissed, now), Some(now));
    }

    #[test]
    fn test_zero_price_flags() {
        let reason = should_auto_flag_listing("Calculus textbook", "Barely used", 0.0);
        assert_eq!(reason.as_deref(), Some("Price is zero or negative"));
    }

    #[test]
    fn test_low_price_flags() {
        let reason = should_auto_flag_listing("Calculus textbook", "Barely used", 5.0);
        assert_eq!(reason.as_deref(), Some("Suspiciously low price"));
    }

    #[test]
    fn test_phone_number_pattern_flags() {
        let reason = should_auto_flag_listing(
            "Cycle for sale",
            "Contact me directly on 9876543210 for a deal",
            1500.0,
        );
        assert_eq!(reason.as_deref(), Some("Contains suspicious pattern"));
    }

    #[test]
    fn test_keyword_flags_case_insensitively() {
        let reason = should_auto_flag_message("Message me on WhatsApp");
        assert_eq!(
            reason.as_deref(),
            Some("Contains suspicious keyword: whatsapp")
        );
    }

    #[test]
    fn test_url_flags_message() {
        assert!(should_auto_flag_message("pay here https://sketchy.example/x").is_some());
    }

    #[test]
    fn test_clean_listing_not_flagged() {
        assert!(should_auto_flag_listing(
            "Engineering drawing kit",
            "Full set, lightly used for one semester",
            450.0
        )
        .is_none());
    }

    #[test]
    fn test_nine_digit_number_not_flagged() {
        assert!(should_auto_flag_message("roll number 123456789").is_none());
    }
}
