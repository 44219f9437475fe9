// SPDX-License-Identifier: MPL-2.0

use crate::feed::{CapabilityError, Feed, FeedError, ValidationError};
use crate::remote::{Post, PostId, PostKind, Role};
use crate::state::Viewer;

/// Donor contact revealed by a successful claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedContact {
    pub post_id: PostId,
    pub donor: Option<String>,
    pub title: Option<String>,
    pub contact: String,
}

/// Whether `viewer` may claim `post`. The first unmet precondition wins:
/// signed in, student, verified, not the donor.
pub fn check_claim(viewer: &Viewer, post: &Post) -> Result<(), CapabilityError> {
    let user_id = viewer.require_user()?;
    if !viewer.has_role(Role::Student) {
        return Err(CapabilityError::StudentsOnly);
    }
    if !viewer.profile().is_some_and(|p| p.is_verified()) {
        return Err(CapabilityError::VerificationRequired);
    }
    if post.user_id == user_id {
        return Err(CapabilityError::OwnResource);
    }
    Ok(())
}

impl Feed {
    /// Claim a donated resource. The viewer checks come first, so an
    /// anonymous viewer always hears about signing in. Nothing is written
    /// to the store.
    pub fn claim(&self, post_id: PostId) -> Result<ClaimedContact, FeedError> {
        let post = self
            .state
            .get(post_id)
            .ok_or(ValidationError::UnknownPost)?;
        check_claim(&self.viewer, post)?;
        if post.kind != PostKind::Donation {
            return Err(ValidationError::NotADonation.into());
        }

        let contact = post
            .contact
            .clone()
            .ok_or(ValidationError::MissingContact)?;
        tracing::info!(%post_id, "donation claimed");

        Ok(ClaimedContact {
            post_id,
            donor: post.author_username().map(str::to_string),
            title: post.resource_title.clone(),
            contact,
        })
    }
}
