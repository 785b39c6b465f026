//! Canonical roles and the role → permission table.
//!
//! Role names and permission strings are part of the wire contract: they are
//! embedded in access tokens and returned by `/auth/me`, so existing clients
//! depend on the exact spelling below. These must also match the seed data in
//! `20261001000002_create_roles.sql`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission strings granted by roles.
pub mod permissions {
    pub const NOTES_CREATE: &str = "notes:create";
    pub const NOTES_READ: &str = "notes:read";
    pub const NOTES_UPDATE: &str = "notes:update";
    pub const NOTES_SUBMIT: &str = "notes:submit";
    pub const NOTES_VALIDATE_FIRST: &str = "notes:validate:first";
    pub const NOTES_VALIDATE_FINAL: &str = "notes:validate:final";
    pub const NOTES_ARCHIVE: &str = "notes:archive";
    pub const NOTES_SCHEDULE: &str = "notes:schedule";
    pub const NOTES_SEND: &str = "notes:send";
    pub const NOTES_COMMENT: &str = "notes:comment";
    pub const NOTES_RECEIVE: &str = "notes:receive";
    pub const TEMPLATES_READ: &str = "templates:read";
    pub const TEMPLATES_MANAGE: &str = "templates:manage";
    pub const DASHBOARD_READ: &str = "dashboard:read";
    pub const USERS_MANAGE: &str = "users:manage";

    /// Every permission that lets an actor take part in validation.
    pub const VALIDATION: &[&str] = &[NOTES_VALIDATE_FIRST, NOTES_VALIDATE_FINAL, NOTES_ARCHIVE];
}

use permissions::*;

const REDACTEUR_PERMISSIONS: &[&str] = &[
    NOTES_CREATE,
    NOTES_READ,
    NOTES_UPDATE,
    NOTES_SUBMIT,
    NOTES_SCHEDULE,
    NOTES_SEND,
    NOTES_COMMENT,
    NOTES_RECEIVE,
    TEMPLATES_READ,
    DASHBOARD_READ,
];

const CHEF_DEPARTEMENT_PERMISSIONS: &[&str] = &[
    NOTES_READ,
    NOTES_VALIDATE_FIRST,
    NOTES_COMMENT,
    NOTES_RECEIVE,
    TEMPLATES_READ,
    DASHBOARD_READ,
];

const DIRECTEUR_EXECUTIF_PERMISSIONS: &[&str] = &[
    NOTES_READ,
    NOTES_VALIDATE_FINAL,
    NOTES_ARCHIVE,
    NOTES_COMMENT,
    NOTES_RECEIVE,
    TEMPLATES_READ,
    DASHBOARD_READ,
];

const DESTINATAIRE_PERMISSIONS: &[&str] =
    &[NOTES_READ, NOTES_COMMENT, NOTES_RECEIVE, DASHBOARD_READ];

const ADMIN_PERMISSIONS: &[&str] = &[
    NOTES_CREATE,
    NOTES_READ,
    NOTES_UPDATE,
    NOTES_SUBMIT,
    NOTES_VALIDATE_FIRST,
    NOTES_VALIDATE_FINAL,
    NOTES_ARCHIVE,
    NOTES_SCHEDULE,
    NOTES_SEND,
    NOTES_COMMENT,
    NOTES_RECEIVE,
    TEMPLATES_READ,
    TEMPLATES_MANAGE,
    DASHBOARD_READ,
    USERS_MANAGE,
];

/// A role held by a user. A user may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Redacteur,
    ChefDepartement,
    DirecteurExecutif,
    Destinataire,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Redacteur,
        Role::ChefDepartement,
        Role::DirecteurExecutif,
        Role::Destinataire,
        Role::Admin,
    ];

    /// Wire name of the role, e.g. `"CHEF_DEPARTEMENT"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Redacteur => "REDACTEUR",
            Role::ChefDepartement => "CHEF_DEPARTEMENT",
            Role::DirecteurExecutif => "DIRECTEUR_EXECUTIF",
            Role::Destinataire => "DESTINATAIRE",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// The fixed permission set of this role.
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Redacteur => REDACTEUR_PERMISSIONS,
            Role::ChefDepartement => CHEF_DEPARTEMENT_PERMISSIONS,
            Role::DirecteurExecutif => DIRECTEUR_EXECUTIF_PERMISSIONS,
            Role::Destinataire => DESTINATAIRE_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
        }
    }

    pub fn grants(self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a list of role names, silently dropping unknown ones.
pub fn parse_roles<S: AsRef<str>>(names: &[S]) -> Vec<Role> {
    let mut roles: Vec<Role> = names
        .iter()
        .filter_map(|n| Role::from_name(n.as_ref()))
        .collect();
    roles.sort();
    roles.dedup();
    roles
}

/// `true` if any of `roles` grants `permission`.
pub fn has_permission(roles: &[Role], permission: &str) -> bool {
    roles.iter().any(|r| r.grants(permission))
}

/// `true` if the union of `roles` contains at least one of `wanted`.
pub fn has_any_permission(roles: &[Role], wanted: &[&str]) -> bool {
    wanted.iter().any(|p| has_permission(roles, p))
}

/// `true` if the union of `roles` contains every one of `wanted`.
///
/// An empty `wanted` list is trivially satisfied.
pub fn has_all_permissions(roles: &[Role], wanted: &[&str]) -> bool {
    wanted.iter().all(|p| has_permission(roles, p))
}

/// Sorted, de-duplicated union of the permissions of `roles`.
pub fn effective_permissions(roles: &[Role]) -> Vec<&'static str> {
    let mut all: Vec<&'static str> = roles
        .iter()
        .flat_map(|r| r.permissions().iter().copied())
        .collect();
    all.sort_unstable();
    all.dedup();
    all
}

/// Roles whose permission set contains `permission`.
pub fn roles_with_permission(permission: &str) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|r| r.grants(permission))
        .collect()
}
