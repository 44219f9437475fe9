// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const APP_ID: &str = "io.github.sharewell.Sharewell";
pub const APP_NAME: &str = "Sharewell";

#[cfg(feature = "devel")]
pub const IS_DEVEL: bool = true;
#[cfg(not(feature = "devel"))]
pub const IS_DEVEL: bool = false;

pub const USER_AGENT: &str = "Sharewell/0.1 (link preview)";

/// Delay between the last keystroke and link preview resolution.
pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(500);
pub const LINK_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Shown when the store fails without a message of its own.
pub const FALLBACK_ERROR: &str = "Something went wrong. Please try again.";

/// Capacity of the change channel before slow subscribers start lagging.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

pub const PUBLIC_BASE_URL: &str = "https://sharewell.app";
pub const ABUSE_REPORT_EMAIL: &str = "report@sharewell.app";

pub const X_SHARE_ENDPOINT: &str = "https://twitter.com/intent/tweet";
pub const WHATSAPP_SHARE_ENDPOINT: &str = "https://wa.me/";

/// Env var overriding the local store location.
pub const DB_PATH_ENV: &str = "SHAREWELL_DB";
/// Env var holding the tracing filter directives.
pub const LOG_ENV: &str = "SHAREWELL_LOG";
