//! # Operator Tools
//!
//! Command line helpers that work outside the HTTP server.
//!
//! ## Seed
//! - Connects straight to Redis using the same `REDIS_URL` as the server, or `--redis-url`
//! - Inserts the ten starter activities only when the `activities` hash is empty
//! - Safe to run repeatedly
//!
//! ## Elapsed
//! - Takes two RFC 3339 instants in either order
//! - Prints the same sentence as `/api/time-difference`
use anyhow::Context;
use elapsed::{format_message, parse_instant};
use winter::{
    config::Config,
    database::{RedisStore, init_redis, seed},
};

pub async fn seed_store(redis_url: Option<String>) -> anyhow::Result<usize> {
    let redis_url = match redis_url {
        Some(url) => url,
        None => Config::load()?.redis_url,
    };

    let connection = init_redis(&redis_url)
        .await
        .with_context(|| format!("Failed to connect to {redis_url}"))?;
    let store = RedisStore::new(connection);

    Ok(seed(&store).await?)
}

pub fn elapsed_message(from: &str, to: &str) -> anyhow::Result<String> {
    let start = parse_instant(from)
        .with_context(|| format!("'{from}' is not an RFC 3339 timestamp"))?;
    let end = parse_instant(to).with_context(|| format!("'{to}' is not an RFC 3339 timestamp"))?;

    Ok(format_message(&start, &end))
}

#[cfg(test)]
mod tests {
    use super::elapsed_message;

    #[test]
    fn test_elapsed_message() {
        assert_eq!(
            elapsed_message("2026-01-15T00:00:00Z", "2026-01-16T00:00:00Z").unwrap(),
            "The difference is 24 hours and 0 minutes."
        );
        assert_eq!(
            elapsed_message("2026-01-15T01:59:59Z", "2026-01-15T00:00:00Z").unwrap(),
            "The difference is 1 hours and 59 minutes."
        );
    }

    #[test]
    fn test_elapsed_message_invalid() {
        assert!(elapsed_message("2026-01-15", "2026-01-16T00:00:00Z").is_err());
    }
}
