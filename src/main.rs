// SPDX-License-Identifier: MPL-2.0

//! Headless Sharewell client: prints the feed and keeps it current.

use sharewell::config::{APP_NAME, IS_DEVEL, LINK_FETCH_TIMEOUT, LOG_ENV};
use sharewell::feed::{
    Composer, Feed, FeedError, FeedQuery, FeedView, RealtimeAdapter, SortKey, TypeFilter,
};
use sharewell::local::{LocalError, LocalStore};
use sharewell::remote::links::{
    HttpPreviewResolver, LinkPreviewResolver, StaticPreviewResolver, extract_first_url,
};
use sharewell::remote::Post;
use sharewell::runtime;
use sharewell::state::{AppSettings, SettingsError, Viewer};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: sharewell [--as USERNAME] [--search TEXT] [--filter all|wisdom|donation|seeking] \
[--sort recent|likes|comments] [--remember] [--post TEXT]";

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] LocalError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("no profile named {0}")]
    UnknownUser(String),
}

#[derive(Debug, Default)]
struct Options {
    username: Option<String>,
    query: FeedQuery,
    remember: bool,
    post: Option<String>,
}

impl Options {
    fn parse(
        mut args: impl Iterator<Item = String>,
        settings: &AppSettings,
    ) -> Result<Self, String> {
        let mut options = Options {
            query: FeedQuery {
                sort: settings.default_sort,
                ..FeedQuery::default()
            },
            ..Options::default()
        };

        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| format!("{arg} needs a value"));
            match arg.as_str() {
                "--as" => options.username = Some(value()?),
                "--search" => options.query.search = value()?,
                "--filter" => {
                    options.query.filter =
                        value()?.parse::<TypeFilter>().map_err(|e| e.to_string())?
                }
                "--sort" => {
                    options.query.sort = value()?.parse::<SortKey>().map_err(|e| e.to_string())?
                }
                "--post" => options.post = Some(value()?),
                "--remember" => options.remember = true,
                "-h" | "--help" => return Err(USAGE.to_string()),
                other => return Err(format!("unknown argument {other}\n{USAGE}")),
            }
        }
        Ok(options)
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("sharewell=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_post(post: &Post) {
    let author = post.author_username().unwrap_or("someone");
    let badge = post
        .author
        .as_ref()
        .and_then(|a| a.badge())
        .map(|b| format!(" [{b}]"))
        .unwrap_or_default();
    let headline = post
        .resource_title
        .as_deref()
        .or(post.content.as_deref())
        .unwrap_or_default();

    println!(
        "{:<8} @{author}{badge}  {} likes, {} comments",
        post.kind.as_str(),
        post.like_count(),
        post.comment_count()
    );
    println!("         {headline}");
    if let Some(link) = &post.link {
        println!("         -> {} ({})", link.title, link.url);
    }
}

fn render(view: &mut FeedView, feed: &Feed) {
    let posts = view.render(feed.state());
    println!("── {} of {} posts ──", posts.len(), feed.state().len());
    for post in posts {
        print_post(post);
    }
}

fn preview_resolver(settings: &AppSettings) -> Arc<dyn LinkPreviewResolver> {
    if settings.live_link_previews {
        match HttpPreviewResolver::new() {
            Ok(resolver) => return Arc::new(resolver),
            Err(e) => tracing::warn!(error = %e, "http previews unavailable, using offline cards"),
        }
    }
    Arc::new(StaticPreviewResolver)
}

async fn publish(feed: &Feed, settings: &AppSettings, text: String) -> Result<(), FeedError> {
    let mut composer = Composer::new(preview_resolver(settings), settings.preview_debounce());
    let mut previews = composer.previews().subscribe();
    let has_link = extract_first_url(&text).is_some();

    composer.set_content(text);
    if has_link {
        let wait = settings.preview_debounce() + LINK_FETCH_TIMEOUT;
        if tokio::time::timeout(wait, previews.changed()).await.is_err() {
            tracing::warn!("link preview not ready, posting without it");
        }
    }

    feed.publish(&mut composer).await?;
    Ok(())
}

async fn run(settings: AppSettings, options: Options) -> Result<(), RunError> {
    let path = settings.resolve_store_path()?;
    let store = LocalStore::open(&path)?;
    tracing::info!(path = %path.display(), "store opened");

    let viewer = match &options.username {
        Some(name) => {
            let profile = store
                .profiles()
                .by_username(name)?
                .ok_or_else(|| RunError::UnknownUser(name.clone()))?;
            Viewer::with_profile(profile)
        }
        None => Viewer::anonymous(),
    };

    let mut feed = Feed::new(Arc::new(store), viewer);
    feed.refresh().await?;

    let mut view = FeedView::new(options.query);
    let mut adapter = RealtimeAdapter::mount(&feed);
    render(&mut view, &feed);

    if let Some(text) = options.post {
        if let Err(e) = publish(&feed, &settings, text).await {
            eprintln!("{}", e.user_message());
        }
    }

    if !adapter.is_mounted() {
        return Ok(());
    }

    let mut shutdown = runtime::spawn(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            delivery = adapter.next() => {
                let Some(delivery) = delivery else { break };
                match feed.apply_delivery(delivery).await {
                    Ok(reaction) => {
                        tracing::debug!(?reaction, "change applied");
                        render(&mut view, &feed);
                    }
                    Err(e) => tracing::warn!(error = %e, "could not apply change"),
                }
            }
        }
    }

    adapter.unmount();
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let mut settings = AppSettings::load();
    let options = match Options::parse(std::env::args().skip(1), &settings) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    if options.remember && settings.default_sort != options.query.sort {
        settings.default_sort = options.query.sort;
        if let Err(e) = settings.save() {
            tracing::warn!(error = %e, "could not save settings");
        }
    }

    tracing::info!(app = APP_NAME, devel = IS_DEVEL, "starting");
    match runtime::block_on(run(settings, options)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sharewell stopped");
            ExitCode::FAILURE
        }
    }
}
