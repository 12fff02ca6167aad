//! Role and ban gating.
//!
//! Authorization is an ordered chain of predicates per access level; the
//! first predicate that denies decides the outcome. Keeping the chain as
//! data makes the ordering explicit and testable on its own.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{User, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Authenticated,
    Admin,
    SuperAdmin,
}

type Predicate = fn(&User, DateTime<Utc>) -> std::result::Result<(), String>;

fn not_banned(user: &User, now: DateTime<Utc>) -> std::result::Result<(), String> {
    if ban_is_active(user, now) {
        Err(match &user.ban_reason {
            Some(reason) => format!("Account is banned: {}", reason),
            None => "Account is banned".to_string(),
        })
    } else {
        Ok(())
    }
}

fn is_admin(user: &User, _now: DateTime<Utc>) -> std::result::Result<(), String> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err("Admin access required".to_string())
    }
}

fn is_super_admin(user: &User, _now: DateTime<Utc>) -> std::result::Result<(), String> {
    if user.role == UserRole::SuperAdmin {
        Ok(())
    } else {
        Err("Super admin access required".to_string())
    }
}

fn predicates(level: AccessLevel) -> &'static [Predicate] {
    match level {
        AccessLevel::Authenticated => &[not_banned],
        AccessLevel::Admin => &[not_banned, is_admin],
        AccessLevel::SuperAdmin => &[not_banned, is_admin, is_super_admin],
    }
}

/// Run the predicate chain for `level`. The first deny wins and becomes
/// a 403.
pub fn authorize(user: &User, level: AccessLevel, now: DateTime<Utc>) -> Result<()> {
    for predicate in predicates(level) {
        if let Err(reason) = predicate(user, now) {
            return Err(AppError::Authorization(reason));
        }
    }
    Ok(())
}

/// A ban is active while the flag is set and the expiry, if any, is in
/// the future. Bans without an expiry are indefinite.
pub fn ban_is_active(user: &User, now: DateTime<Utc>) -> bool {
    user.is_banned
        && match user.banned_until {
            Some(until) => until > now,
            None => true,
        }
}

/// Who may ban whom: super admins are untouchable, nobody bans
/// themselves, and banning another admin takes a super admin.
pub fn can_ban(actor: &User, target: &User) -> Result<()> {
    if target.role == UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Super admin accounts cannot be banned".to_string(),
        ));
    }
    if actor.id == target.id {
        return Err(AppError::Authorization(
            "You cannot ban your own account".to_string(),
        ));
    }
    if target.role == UserRole::Admin && actor.role != UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Only a super admin can ban an admin".to_string(),
        ));
    }
    Ok(())
}

pub fn can_delete_user(actor: &User, target: &User) -> Result<()> {
    if target.role == UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Super admin accounts cannot be deleted".to_string(),
        ));
    }
    if actor.id == target.id {
        return Err(AppError::Authorization(
            "You cannot delete your own account".to_string(),
        ));
    }
    Ok(())
}

pub fn can_change_role(actor: &User, target: &User) -> Result<()> {
    if target.role == UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Super admin roles cannot be changed".to_string(),
        ));
    }
    if actor.id == target.id {
        return Err(AppError::Authorization(
            "You cannot change your own role".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn user_with(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "t@apsit.edu.in".to_string(),
            name: "Test".to_string(),
            phone: None,
            hashed_password: None,
            google_id: None,
            profile_picture: None,
            role,
            is_banned: false,
            ban_reason: None,
            banned_at: None,
            banned_until: None,
            banned_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_plain_user_passes_authenticated_gate() {
        let user = user_with(UserRole::User);
        assert!(authorize(&user, AccessLevel::Authenticated, Utc::now()).is_ok());
    }

    #[test]
    fn test_plain_user_fails_admin_gate() {
        let user = user_with(UserRole::User);
        assert!(authorize(&user, AccessLevel::Admin, Utc::now()).is_err());
    }

    #[test]
    fn test_admin_passes_admin_gate_but_not_super() {
        let user = user_with(UserRole::Admin);
        assert!(authorize(&user, AccessLevel::Admin, Utc::now()).is_ok());
        assert!(authorize(&user, AccessLevel::SuperAdmin, Utc::now()).is_err());
    }

    #[test]
    fn test_banned_admin_fails_admin_gate() {
        let mut user = user_with(UserRole::Admin);
        user.is_banned = true;
        assert!(authorize(&user, AccessLevel::Admin, Utc::now()).is_err());
    }

    #[test]
    fn test_indefinite_ban_is_active() {
        let mut user = user_with(UserRole::User);
        user.is_banned = true;
        user.banned_until = None;
        assert!(ban_is_active(&user, Utc::now()));
    }

    #[test]
    fn test_expired_ban_admits() {
        let now = Utc::now();
        let mut user = user_with(UserRole::User);
        user.is_banned = true;
        user.banned_until = Some(now - Duration::hours(1));
        assert!(!ban_is_active(&user, now));
        assert!(authorize(&user, AccessLevel::Authenticated, now).is_ok());
    }

    #[test]
    fn test_future_ban_denies() {
        let now = Utc::now();
        let mut user = user_with(UserRole::User);
        user.is_banned = true;
        user.banned_until = Some(now + Duration::hours(1));
        assert!(ban_is_active(&user, now));
        assert!(authorize(&user, AccessLevel::Authenticated, now).is_err());
    }

    #[test]
    fn test_super_admin_cannot_be_banned() {
        let actor = user_with(UserRole::SuperAdmin);
        let target = user_with(UserRole::SuperAdmin);
        assert!(can_ban(&actor, &target).is_err());
    }

    #[test]
    fn test_admin_cannot_ban_admin() {
        let actor = user_with(UserRole::Admin);
        let target = user_with(UserRole::Admin);
        assert!(can_ban(&actor, &target).is_err());
    }

    #[test]
    fn test_super_admin_can_ban_admin() {
        let actor = user_with(UserRole::SuperAdmin);
        let target = user_with(UserRole::Admin);
        assert!(can_ban(&actor, &target).is_ok());
    }

    #[test]
    fn test_no_self_ban_or_delete() {
        let actor = user_with(UserRole::Admin);
        assert!(can_ban(&actor, &actor).is_err());
        assert!(can_delete_user(&actor, &actor).is_err());
        assert!(can_change_role(&actor, &actor).is_err());
    }
}
