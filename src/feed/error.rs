// SPDX-License-Identifier: MPL-2.0

use crate::config::FALLBACK_ERROR;
use crate::remote::StoreError;
use thiserror::Error;

/// Input rejected before any remote call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Write something before posting.")]
    EmptyContent,
    #[error("Comments cannot be empty.")]
    EmptyComment,
    #[error("Add a title for the resource.")]
    MissingTitle,
    #[error("Choose a category for the resource.")]
    MissingCategory,
    #[error("Add contact details so students can reach you.")]
    MissingContact,
    #[error("Images must be JPEG, PNG, GIF, or WebP.")]
    UnsupportedImage,
    #[error("That post is no longer in the feed.")]
    UnknownPost,
    #[error("Only donations can be claimed.")]
    NotADonation,
}

/// The viewer lacks what the action needs. Checked in a fixed order so the
/// first unmet precondition is the one reported.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Please sign in to continue.")]
    SignInRequired,
    #[error("Finish setting up your profile first.")]
    ProfileRequired,
    #[error("Only students can claim donated resources.")]
    StudentsOnly,
    #[error("Only students can post what they are seeking.")]
    SeekingStudentsOnly,
    #[error("Verify your student status to claim resources.")]
    VerificationRequired,
    #[error("This is your own donation.")]
    OwnResource,
    #[error("Only the author can change this post.")]
    NotOwner,
}

impl CapabilityError {
    /// The caller should send the viewer to the verification flow.
    pub fn redirects_to_verification(self) -> bool {
        self == CapabilityError::VerificationRequired
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("{}", .0.message().unwrap_or(FALLBACK_ERROR))]
    Remote(#[from] StoreError),
}

impl FeedError {
    /// Text for the toast or inline message.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, FeedError::Remote(_))
    }
}
