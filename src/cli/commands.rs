use crate::app::{AppContext, Result, RoostError};
use crate::bridge::PushOutcome;
use crate::fetcher::FetchResult;
use crate::parser;
use crate::store::Store;

pub async fn add_feed(ctx: &AppContext, nick: &str, url: &str) -> Result<()> {
    // Reject garbage before going to the network.
    url::Url::parse(url)?;

    if ctx.registry.contains(url)? {
        println!("Feed already registered: {}", url);
        return Ok(());
    }

    let fetched = ctx.fetcher.fetch(url, None, None).await?;
    let FetchResult::Content {
        body,
        etag,
        last_modified,
    } = fetched
    else {
        return Err(RoostError::InvalidFeed(format!(
            "{}: got 304 for an unconditional request",
            url
        )));
    };

    let statuses = parser::parse_feed(&body, nick, url)?;
    let count = statuses.len();
    ctx.registry.add_or_update(nick, url, None, statuses)?;
    ctx.registry.set_validators(url, etag, last_modified)?;

    println!("Registered {} ({} statuses)", url, count);
    enqueue_push(ctx);
    Ok(())
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    ctx.registry.remove(url)?;
    // Drop the durable record too, or a later pull would resurrect it.
    ctx.store.delete_feed(url)?;
    println!("Removed feed: {}", url);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    // Every nick contains the empty string, so this lists all feeds in
    // first-seen order.
    let feeds = ctx.registry.query_user("")?;

    if feeds.is_empty() {
        println!("No feeds registered");
        return Ok(());
    }

    for line in feeds {
        println!("{}", line);
    }
    Ok(())
}

pub async fn refresh_feeds(ctx: &AppContext) -> Result<()> {
    match ctx.refresher.refresh_all().await? {
        Some(summary) => {
            println!(
                "Refresh complete: {} updated, {} unchanged, {} failed",
                summary.updated, summary.unchanged, summary.failed
            );
            enqueue_push(ctx);
        }
        None => println!("Refresh already in progress"),
    }
    Ok(())
}

pub fn query_user(ctx: &AppContext, name: &str) -> Result<()> {
    print_lines(ctx.registry.query_user(name)?);
    Ok(())
}

pub fn query_tag(ctx: &AppContext, tag: &str) -> Result<()> {
    print_lines(ctx.registry.query_tag(tag)?);
    Ok(())
}

pub fn query_status(
    ctx: &AppContext,
    term: &str,
    all_casings: bool,
    exclude: &[String],
) -> Result<()> {
    let lines = if all_casings {
        let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
        ctx.registry.composite_query(term, &exclude)?
    } else {
        let mut lines = ctx.registry.query_in_status(term)?;
        if !exclude.is_empty() {
            lines.retain(|line| !exclude.iter().any(|ex| line.contains(ex.as_str())));
        }
        lines
    };
    print_lines(lines);
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    if lines.is_empty() {
        println!("No matches");
        return;
    }
    for line in lines {
        println!("{}", line);
    }
}

fn enqueue_push(ctx: &AppContext) {
    match ctx.bridge.push(&ctx.registry) {
        Ok(PushOutcome::Enqueued) => {}
        Ok(PushOutcome::QueueFull) => eprintln!("Push queue full; snapshot dropped"),
        Err(e) => eprintln!("Push failed: {}", e),
    }
}
