//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::UserEmail;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: UserEmail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] User, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::User => "user", Self::Admin => "admin" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "user" => Some(Self::User), "admin" => Some(Self::Admin), _ => None }
    }
}

/// Body of `PUT /user`.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UserProfile {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl User {
    pub fn register(email: UserEmail, profile: UserProfile) -> Self {
        Self { email, name: profile.name, role: profile.role.unwrap_or_default(), created_at: Utc::now() }
    }

    /// Fields left out of the profile keep their stored value.
    pub fn update(&mut self, profile: UserProfile) {
        if let Some(name) = profile.name { self.name = Some(name); }
        if let Some(role) = profile.role { self.role = role; }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
