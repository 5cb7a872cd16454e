//! Request- and object-level permission checks.
//!
//! Each endpoint lists the permissions it needs. `check_permissions` runs the
//! request-level half before any lookup; `check_object_permissions` runs the
//! object-level half once the target record is loaded.

use axum::http::Method;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::User;

/// The record a caller is acting on, reduced to what permissions inspect.
#[derive(Debug, Clone, Copy)]
pub enum AccessTarget<'a> {
    Conversation {
        participants: &'a [Uuid],
    },
    Message {
        sender_id: Uuid,
        conversation_participants: &'a [Uuid],
    },
}

impl AccessTarget<'_> {
    /// The user owning the record, if the record has one.
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            AccessTarget::Message { sender_id, .. } => Some(*sender_id),
            AccessTarget::Conversation { .. } => None,
        }
    }

    /// The record's own participant list, if it has one.
    pub fn participants(&self) -> Option<&[Uuid]> {
        match self {
            AccessTarget::Conversation { participants } => Some(*participants),
            AccessTarget::Message { .. } => None,
        }
    }
}

pub trait Permission: Send + Sync {
    fn has_permission(&self, caller: Option<&User>, method: &Method) -> bool;

    fn has_object_permission(&self, _caller: &User, _method: &Method, _target: &AccessTarget<'_>) -> bool {
        true
    }
}

pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, caller: Option<&User>, _method: &Method) -> bool {
        caller.is_some()
    }
}

/// Only participants of a conversation may touch it or its messages.
pub struct IsParticipantOfConversation;

impl Permission for IsParticipantOfConversation {
    fn has_permission(&self, caller: Option<&User>, method: &Method) -> bool {
        if caller.is_none() {
            return false;
        }
        [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
    }

    fn has_object_permission(&self, caller: &User, _method: &Method, target: &AccessTarget<'_>) -> bool {
        if caller.is_staff() {
            return true;
        }
        match target {
            AccessTarget::Message {
                conversation_participants,
                ..
            } => conversation_participants.contains(&caller.user_id),
            AccessTarget::Conversation { participants } => participants.contains(&caller.user_id),
        }
    }
}

/// Owners (or participants, for records without an owner) and staff only.
pub struct IsOwnerOrAdmin;

impl Permission for IsOwnerOrAdmin {
    fn has_permission(&self, caller: Option<&User>, _method: &Method) -> bool {
        caller.is_some()
    }

    fn has_object_permission(&self, caller: &User, _method: &Method, target: &AccessTarget<'_>) -> bool {
        if caller.is_staff() {
            return true;
        }
        if let Some(owner) = target.owner() {
            return owner == caller.user_id;
        }
        if let Some(participants) = target.participants() {
            return participants.contains(&caller.user_id);
        }
        false
    }
}

/// Run the request-level checks and return the authenticated caller.
pub fn check_permissions<'u>(
    permissions: &[&dyn Permission],
    caller: Option<&'u User>,
    method: &Method,
) -> Result<&'u User, ApiError> {
    for permission in permissions {
        if !permission.has_permission(caller, method) {
            return Err(denied(caller.is_some()));
        }
    }
    caller.ok_or_else(ApiError::not_authenticated)
}

pub fn check_object_permissions(
    permissions: &[&dyn Permission],
    caller: &User,
    method: &Method,
    target: &AccessTarget<'_>,
) -> Result<(), ApiError> {
    for permission in permissions {
        if !permission.has_object_permission(caller, method, target) {
            return Err(denied(true));
        }
    }
    Ok(())
}

fn denied(authenticated: bool) -> ApiError {
    if authenticated {
        ApiError::permission_denied()
    } else {
        ApiError::not_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            user_id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            phone_number: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_participant_request_level() {
        let guest = user(Role::Guest);
        let p = IsParticipantOfConversation;

        assert!(!p.has_permission(None, &Method::GET));
        for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(p.has_permission(Some(&guest), &method));
        }
        assert!(!p.has_permission(Some(&guest), &Method::OPTIONS));
        assert!(!p.has_permission(Some(&guest), &Method::HEAD));
    }

    #[test]
    fn test_participant_object_level() {
        let member = user(Role::Guest);
        let outsider = user(Role::Host);
        let admin = user(Role::Admin);
        let participants = [member.user_id];
        let p = IsParticipantOfConversation;

        let conversation = AccessTarget::Conversation { participants: &participants };
        assert!(p.has_object_permission(&member, &Method::GET, &conversation));
        assert!(!p.has_object_permission(&outsider, &Method::GET, &conversation));
        assert!(p.has_object_permission(&admin, &Method::DELETE, &conversation));

        let message = AccessTarget::Message {
            sender_id: outsider.user_id,
            conversation_participants: &participants,
        };
        assert!(p.has_object_permission(&member, &Method::GET, &message));
        assert!(!p.has_object_permission(&outsider, &Method::GET, &message));
    }

    #[test]
    fn test_owner_or_admin() {
        let sender = user(Role::Guest);
        let other = user(Role::Guest);
        let moderator = user(Role::Moderator);
        let admin = user(Role::Admin);
        let participants = [sender.user_id, other.user_id];
        let p = IsOwnerOrAdmin;

        assert!(!p.has_permission(None, &Method::GET));
        assert!(p.has_permission(Some(&other), &Method::GET));

        let message = AccessTarget::Message {
            sender_id: sender.user_id,
            conversation_participants: &participants,
        };
        assert!(p.has_object_permission(&sender, &Method::PATCH, &message));
        assert!(!p.has_object_permission(&other, &Method::PATCH, &message));
        assert!(!p.has_object_permission(&moderator, &Method::PATCH, &message));
        assert!(p.has_object_permission(&admin, &Method::PATCH, &message));

        let conversation = AccessTarget::Conversation { participants: &participants };
        assert!(p.has_object_permission(&other, &Method::GET, &conversation));
        assert!(!p.has_object_permission(&moderator, &Method::GET, &conversation));
    }

    #[test]
    fn test_check_permissions_status() {
        let guest = user(Role::Guest);
        let perms: &[&dyn Permission] = &[&IsAuthenticated, &IsParticipantOfConversation];

        assert!(matches!(
            check_permissions(perms, None, &Method::GET),
            Err(ApiError::NotAuthenticated(_))
        ));
        assert!(matches!(
            check_permissions(perms, Some(&guest), &Method::OPTIONS),
            Err(ApiError::PermissionDenied(_))
        ));
        assert_eq!(
            check_permissions(perms, Some(&guest), &Method::GET).unwrap().user_id,
            guest.user_id
        );
    }
}
