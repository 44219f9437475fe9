// SPDX-License-Identifier: MPL-2.0

use crate::feed::CapabilityError;
use crate::remote::{Profile, Role, UserId};

/// Who is acting on the feed. Sign-in itself happens elsewhere; the feed
/// only reads the resulting user id and profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewer {
    user_id: Option<UserId>,
    profile: Option<Profile>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed in with a completed profile.
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            user_id: Some(profile.id),
            profile: Some(profile),
        }
    }

    /// Signed in, profile not created yet.
    pub fn without_profile(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            profile: None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.profile.as_ref().is_some_and(|p| p.role == role)
    }

    pub fn require_user(&self) -> Result<UserId, CapabilityError> {
        self.user_id.ok_or(CapabilityError::SignInRequired)
    }

    pub fn require_profile(&self) -> Result<&Profile, CapabilityError> {
        self.require_user()?;
        self.profile.as_ref().ok_or(CapabilityError::ProfileRequired)
    }
}
