// SPDX-License-Identifier: MPL-2.0

//! Post composer: the three post shapes, image attachment, and the
//! debounced link preview.

use crate::feed::{CapabilityError, Feed, FeedError, ValidationError};
use crate::remote::links::{LinkPreviewResolver, extract_first_url};
use crate::remote::{Category, LinkPreview, NewPost, PostId, PostKind, Role};
use crate::runtime;
use image::ImageFormat;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// An image picked for upload, already checked to be a supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    bytes: Vec<u8>,
    extension: &'static str,
}

impl ImageAttachment {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let format = image::guess_format(&bytes).map_err(|_| ValidationError::UnsupportedImage)?;
        let extension = match format {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            _ => return Err(ValidationError::UnsupportedImage),
        };
        Ok(Self { bytes, extension })
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolves the preview for the first link in some text, at most once per
/// quiet period. Each new text aborts the pending resolution.
pub struct PreviewDebouncer {
    resolver: Arc<dyn LinkPreviewResolver>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    latest: Arc<watch::Sender<Option<LinkPreview>>>,
}

impl PreviewDebouncer {
    pub fn new(resolver: Arc<dyn LinkPreviewResolver>, delay: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            resolver,
            delay,
            pending: None,
            latest: Arc::new(tx),
        }
    }

    /// Works from async and plain synchronous callers alike.
    pub fn schedule(&mut self, text: &str) {
        self.cancel();

        let Some(url) = extract_first_url(text).map(str::to_string) else {
            self.latest.send_replace(None);
            return;
        };

        let resolver = Arc::clone(&self.resolver);
        let latest = Arc::clone(&self.latest);
        let delay = self.delay;
        self.pending = Some(runtime::spawn(async move {
            tokio::time::sleep(delay).await;
            let preview = resolver.resolve(&url).await;
            tracing::debug!(url, found = preview.is_some(), "link preview resolved");
            latest.send_replace(preview);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn current(&self) -> Option<LinkPreview> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LinkPreview>> {
        self.latest.subscribe()
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.latest.send_replace(None);
    }
}

impl Drop for PreviewDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Input fields for a new post. Fields that do not apply to the chosen kind
/// are ignored by [`Composer::build`].
pub struct Composer {
    kind: PostKind,
    content: String,
    title: String,
    category: Option<Category>,
    contact: String,
    image: Option<ImageAttachment>,
    previews: PreviewDebouncer,
}

impl Composer {
    pub fn new(resolver: Arc<dyn LinkPreviewResolver>, debounce: Duration) -> Self {
        Self {
            kind: PostKind::Wisdom,
            content: String::new(),
            title: String::new(),
            category: None,
            contact: String::new(),
            image: None,
            previews: PreviewDebouncer::new(resolver, debounce),
        }
    }

    pub fn kind(&self) -> PostKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    pub fn set_kind(&mut self, kind: PostKind) {
        self.kind = kind;
    }

    /// Update the body text and schedule a preview for its first link.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.previews.schedule(&self.content);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    pub fn set_contact(&mut self, contact: impl Into<String>) {
        self.contact = contact.into();
    }

    pub fn attach_image(&mut self, bytes: Vec<u8>) -> Result<(), ValidationError> {
        self.image = Some(ImageAttachment::from_bytes(bytes)?);
        Ok(())
    }

    pub fn remove_image(&mut self) {
        self.image = None;
    }

    /// The resolved preview, if it still belongs to the first link in the
    /// current text.
    pub fn link_preview(&self) -> Option<LinkPreview> {
        let first = extract_first_url(&self.content)?;
        self.previews.current().filter(|p| p.url == first)
    }

    pub fn previews(&self) -> &PreviewDebouncer {
        &self.previews
    }

    pub fn build(&self) -> Result<NewPost, ValidationError> {
        let details = Some(self.content.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        match self.kind {
            PostKind::Wisdom => {
                let content = details.ok_or(ValidationError::EmptyContent)?;
                Ok(NewPost::Wisdom {
                    content,
                    link: self.link_preview(),
                })
            }
            PostKind::Donation => {
                let (title, category) = self.resource()?;
                let contact = self.contact.trim();
                if contact.is_empty() {
                    return Err(ValidationError::MissingContact);
                }
                Ok(NewPost::Donation {
                    title,
                    category,
                    contact: contact.to_string(),
                    details,
                })
            }
            PostKind::Seeking => {
                let (title, category) = self.resource()?;
                Ok(NewPost::Seeking {
                    title,
                    category,
                    details,
                })
            }
        }
    }

    fn resource(&self) -> Result<(String, Category), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let category = self.category.ok_or(ValidationError::MissingCategory)?;
        Ok((title.to_string(), category))
    }

    /// Empty every field except the chosen kind.
    pub fn clear(&mut self) {
        self.content.clear();
        self.title.clear();
        self.category = None;
        self.contact.clear();
        self.image = None;
        self.previews.reset();
    }
}

impl Feed {
    /// Submit the composer. Fields are cleared once the input validates,
    /// before the store answers, and are not restored on failure. The post
    /// reaches the feed through the realtime insert echo.
    pub async fn publish(&self, composer: &mut Composer) -> Result<PostId, FeedError> {
        let profile = self.viewer.require_profile()?;
        if composer.kind() == PostKind::Seeking && profile.role != Role::Student {
            return Err(CapabilityError::SeekingStudentsOnly.into());
        }
        let author = profile.id;

        let post = composer.build()?;
        let image = composer.image.take();
        composer.clear();

        let image_url = match image {
            Some(image) => Some(
                self.store
                    .upload_image(author, image.bytes(), image.extension())
                    .await?,
            ),
            None => None,
        };

        let kind = post.kind();
        let post_id = self.store.insert_post(author, post, image_url).await?;
        tracing::info!(%post_id, %kind, "post published");
        Ok(post_id)
    }
}
