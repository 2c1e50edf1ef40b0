// ABOUTME: syndic command-line front end over syndic-fetch and syndic-feed.
// ABOUTME: Fetches feeds from URLs (with conditional GET) or parses files/stdin and prints JSON.

use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use syndic_feed::{parse_feed_bytes, parse_http_date, FeedParser};
use syndic_fetch::{init, CacheTokens, Fetcher, ProxyConfig, ProxyKind};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Fetch or parse RSS/Atom feeds and output JSON.
#[derive(Parser, Debug)]
#[command(name = "syndic")]
#[command(about = "Fetch and parse RSS/Atom feeds, printing JSON", long_about = None)]
struct Args {
    /// Feed URL(s) (http/https) or local file paths. Use "-" to read one feed from stdin.
    #[arg(required = true)]
    targets: Vec<String>,

    /// ETag from a previous fetch, sent as If-None-Match.
    #[arg(long)]
    etag: Option<String>,

    /// Last-Modified from a previous fetch: epoch seconds or an HTTP date.
    #[arg(long, value_parser = parse_last_modified)]
    last_modified: Option<i64>,

    /// Netscape-format cookie file read before and written after each fetch.
    #[arg(long)]
    cookie_jar: Option<PathBuf>,

    /// Timeout in seconds for each fetch (0 waits forever).
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// User-Agent header to send.
    #[arg(long)]
    user_agent: Option<String>,

    /// Proxy address (host:port or URL).
    #[arg(long)]
    proxy: Option<String>,

    /// Proxy credentials as user:password.
    #[arg(long, requires = "proxy")]
    proxy_auth: Option<String>,

    /// Proxy protocol: http, https, socks5 or socks5h.
    #[arg(long, requires = "proxy")]
    proxy_type: Option<ProxyKind>,

    /// Skip TLS certificate verification.
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Log debug output to stderr.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_last_modified(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .ok()
        .or_else(|| parse_http_date(s))
        .ok_or_else(|| format!("not epoch seconds or an HTTP date: {}", s))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = init().context("initialising fetch runtime")?;
    let fetcher = build_fetcher(&args, runtime.builder())?;
    let tokens = CacheTokens::new(
        args.last_modified.unwrap_or(0),
        args.etag.clone().unwrap_or_default(),
    );

    let mut results = Vec::new();
    for target in &args.targets {
        debug!(target = %target, "processing target");
        results.push(process_target(target, &fetcher, &tokens, &args));
    }
    runtime.shutdown();

    // Output format:
    // - Single target and ok => emit the result object
    // - Otherwise emit an envelope with feeds array and counts
    let parsed = results
        .iter()
        .filter(|r| r.get("ok").and_then(Value::as_bool) == Some(true))
        .count();
    let output = if results.len() == 1 && parsed == 1 {
        results.remove(0)
    } else {
        json!({
            "feeds": results,
            "total_feeds": results.len(),
            "parsed": parsed,
            "failed": results.len() - parsed
        })
    };

    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn build_fetcher(args: &Args, builder: syndic_fetch::FetcherBuilder) -> Result<Fetcher> {
    let mut builder = builder
        .timeout(Duration::from_secs(args.timeout))
        .verify_tls(!args.insecure);
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent);
    }
    if let Some(address) = &args.proxy {
        let mut proxy = ProxyConfig::new(address).kind(args.proxy_type.unwrap_or_default());
        if let Some(auth) = &args.proxy_auth {
            proxy = proxy.auth(auth);
        }
        builder = builder.proxy(proxy);
    }
    builder.build().context("building fetcher")
}

fn process_target(target: &str, fetcher: &Fetcher, tokens: &CacheTokens, args: &Args) -> Value {
    if target.starts_with("http://") || target.starts_with("https://") {
        return match fetcher.fetch(target, tokens, None, args.cookie_jar.as_deref()) {
            Ok(outcome) => json!({
                "target": target,
                "ok": true,
                "status": outcome.status,
                "feed": outcome.feed,
                "cache_tokens": outcome.cache_tokens,
                "error": null
            }),
            Err(err) => failure(target, &err),
        };
    }

    let parsed = if target == "-" {
        read_stdin().and_then(|bytes| parse_feed_bytes(&bytes, "-").map_err(anyhow::Error::new))
    } else {
        FeedParser::new()
            .parse_file(target)
            .map_err(anyhow::Error::new)
    };

    match parsed {
        Ok(feed) => json!({
            "target": target,
            "ok": true,
            "status": null,
            "feed": feed,
            "cache_tokens": null,
            "error": null
        }),
        Err(err) => failure(target, &err),
    }
}

fn failure(target: &str, err: &dyn std::fmt::Display) -> Value {
    json!({
        "target": target,
        "ok": false,
        "status": null,
        "feed": null,
        "cache_tokens": null,
        "error": err.to_string()
    })
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}
