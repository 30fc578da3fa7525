//! # Document Permissions
//!
//! Who may submit which operation types to which document.
//!
//! Owners and editors may submit anything; viewers may only move their
//! cursor. Users with no membership may submit nothing.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::ot::OperationType;

/// Membership role on a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// Whether this role may submit `operation_type`
    pub fn allows(&self, operation_type: OperationType) -> bool {
        match self {
            Role::Owner | Role::Editor => true,
            Role::Viewer => operation_type == OperationType::CursorMove,
        }
    }
}

/// Permission lookup consumed by the orchestrator
pub trait PermissionChecker: Send + Sync {
    fn has_permission(
        &self,
        user_id: &str,
        document_id: &str,
        operation_type: OperationType,
    ) -> StoreResult<bool>;
}

/// Role grants per (document, user)
#[derive(Debug, Default)]
pub struct MembershipPermissions {
    roles: RwLock<HashMap<(String, String), Role>>,
}

impl MembershipPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` on `document_id` to `user_id`, replacing any prior grant
    pub fn grant(
        &self,
        document_id: impl Into<String>,
        user_id: impl Into<String>,
        role: Role,
    ) -> StoreResult<()> {
        let mut roles = self
            .roles
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        roles.insert((document_id.into(), user_id.into()), role);
        Ok(())
    }

    /// Remove any grant, returning the role that was held
    pub fn revoke(&self, document_id: &str, user_id: &str) -> StoreResult<Option<Role>> {
        let mut roles = self
            .roles
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(roles.remove(&(document_id.to_string(), user_id.to_string())))
    }

    pub fn role_of(&self, document_id: &str, user_id: &str) -> StoreResult<Option<Role>> {
        let roles = self
            .roles
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(roles
            .get(&(document_id.to_string(), user_id.to_string()))
            .copied())
    }
}

impl PermissionChecker for MembershipPermissions {
    fn has_permission(
        &self,
        user_id: &str,
        document_id: &str,
        operation_type: OperationType,
    ) -> StoreResult<bool> {
        Ok(self
            .role_of(document_id, user_id)?
            .is_some_and(|role| role.allows(operation_type)))
    }
}

/// Allows everything. Used by the replay CLI and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl PermissionChecker for OpenAccess {
    fn has_permission(&self, _: &str, _: &str, _: OperationType) -> StoreResult<bool> {
        Ok(true)
    }
}
