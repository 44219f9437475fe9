// SPDX-License-Identifier: MPL-2.0

//! Outbound links: share intents, permalinks, and abuse reports.

use crate::config::{
    ABUSE_REPORT_EMAIL, PUBLIC_BASE_URL, WHATSAPP_SHARE_ENDPOINT, X_SHARE_ENDPOINT,
};
use crate::remote::{Post, PostId};
use thiserror::Error;
use url::Url;
use url::form_urlencoded::byte_serialize;

const SHARE_TEXT_LIMIT: usize = 100;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Invalid share URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Could not open link: {0}")]
    Open(#[from] std::io::Error),

    #[error("No way to share this post")]
    NoChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareTarget {
    X,
    WhatsApp,
}

pub fn permalink(post_id: PostId) -> String {
    format!("{PUBLIC_BASE_URL}/post/{post_id}")
}

/// Short text for a share intent: the resource title, else the post body,
/// cut at a word boundary.
pub fn share_text(post: &Post) -> String {
    let source = post
        .resource_title
        .as_deref()
        .or(post.content.as_deref())
        .unwrap_or_default()
        .trim();

    if source.chars().count() <= SHARE_TEXT_LIMIT {
        return source.to_string();
    }
    let cut: String = source.chars().take(SHARE_TEXT_LIMIT).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}

pub fn share_url(target: ShareTarget, post: &Post) -> Result<Url, ShareError> {
    let text = share_text(post);
    let link = permalink(post.id);
    let url = match target {
        ShareTarget::X => {
            Url::parse_with_params(X_SHARE_ENDPOINT, &[("text", text), ("url", link)])?
        }
        ShareTarget::WhatsApp => Url::parse_with_params(
            WHATSAPP_SHARE_ENDPOINT,
            &[("text", format!("{text} {link}"))],
        )?,
    };
    Ok(url)
}

/// Mail clients disagree on `+`, so spaces are sent as `%20`.
fn mailto_encode(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub fn abuse_report_mailto(post: &Post) -> String {
    let subject = format!("Report post {}", post.id);
    let body = format!(
        "Post: {}\nAuthor: {}\n\nReason:\n",
        permalink(post.id),
        post.author_username().unwrap_or("unknown"),
    );
    format!(
        "mailto:{ABUSE_REPORT_EMAIL}?subject={}&body={}",
        mailto_encode(&subject),
        mailto_encode(&body)
    )
}

/// One way of handing a link to the user: a share sheet, the browser, the
/// clipboard.
///
/// Only [`BrowserChannel`] ships here. Share sheets and the clipboard belong
/// to the embedding toolkit, which implements this trait for them and passes
/// them to [`share_with_fallback`] ahead of or behind the browser.
pub trait ShareChannel {
    fn name(&self) -> &'static str;
    fn deliver(&self, url: &Url) -> Result<(), ShareError>;
}

/// Opens the link with the desktop's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserChannel;

impl ShareChannel for BrowserChannel {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn deliver(&self, url: &Url) -> Result<(), ShareError> {
        open::that(url.as_str())?;
        Ok(())
    }
}

/// Try each caller-supplied channel in order and return the name of the
/// first that worked. An empty chain fails with [`ShareError::NoChannel`].
pub fn share_with_fallback(
    channels: &[&dyn ShareChannel],
    url: &Url,
) -> Result<&'static str, ShareError> {
    let mut last = ShareError::NoChannel;
    for channel in channels {
        match channel.deliver(url) {
            Ok(()) => return Ok(channel.name()),
            Err(e) => {
                tracing::debug!(channel = channel.name(), error = %e, "share channel failed");
                last = e;
            }
        }
    }
    Err(last)
}
