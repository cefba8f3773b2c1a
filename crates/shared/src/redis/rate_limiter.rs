//! Redis-based dual-window IP rate limiter (§5).
//!
//! Two independent fixed windows are checked per request: a per-second
//! window and a per-day window, each keyed `ip:<addr>:second` /
//! `ip:<addr>:day`. Both windows use the same atomic Lua
//! check-and-increment script (INCR + conditional EXPIRE), just invoked
//! with a different key and window size. Fails open (allows the request,
//! logs a warning) if Redis is unavailable.

use crate::error::{Error, Result};
use redis::{aio::ConnectionManager, Script};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

/// Atomically increments the counter at `KEYS[1]`, setting its expiry to
/// `ARGV[1]` seconds only on the first increment of the window, and returns
/// `{count, ttl}`.
const LUA_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
return {current, ttl}
"#;

/// The two fixed windows checked on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    IpPerSecond,
    IpPerDay,
}

impl RateLimitScope {
    fn window_seconds(self) -> i64 {
        match self {
            RateLimitScope::IpPerSecond => 1,
            RateLimitScope::IpPerDay => 86_400,
        }
    }

    fn key(self, ip: &str) -> String {
        match self {
            RateLimitScope::IpPerSecond => format!("ip:{}:second", ip),
            RateLimitScope::IpPerDay => format!("ip:{}:day", ip),
        }
    }

    /// Header suffix used by the `X-RateLimit-*-{suffix}` response headers.
    pub fn header_suffix(self) -> &'static str {
        match self {
            RateLimitScope::IpPerSecond => "ip-per-second",
            RateLimitScope::IpPerDay => "ip-per-day",
        }
    }
}

/// Result of a single-window rate limit check.
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub current_usage: i64,
    pub limit: i64,
    pub reset_at: i64,
    pub retry_after: i64,
    pub remaining: i64,
}

impl RateLimitResult {
    fn from_script_response(current: i64, ttl: i64, limit: i64) -> Self {
        let current_time = now_unix();
        let ttl = ttl.max(0);
        Self {
            allowed: current <= limit,
            current_usage: current,
            limit,
            reset_at: current_time + ttl,
            retry_after: ttl,
            remaining: (limit - current).max(0),
        }
    }

    fn fail_open(limit: i64, window_seconds: i64) -> Self {
        Self {
            allowed: true,
            current_usage: 0,
            limit,
            reset_at: now_unix() + window_seconds,
            retry_after: 0,
            remaining: limit,
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Dual-window rate limiter, one instance shared across the process.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    script: Script,
    fail_open: bool,
}

impl RateLimiter {
    pub async fn new(redis: ConnectionManager) -> Result<Self> {
        Self::with_config(redis, true).await
    }

    pub async fn with_config(redis: ConnectionManager, fail_open: bool) -> Result<Self> {
        Ok(Self {
            redis,
            script: Script::new(LUA_SCRIPT),
            fail_open,
        })
    }

    /// Check and increment a single window for the given client IP.
    pub async fn check(&self, scope: RateLimitScope, ip: &str, limit: i64) -> Result<RateLimitResult> {
        let key = scope.key(ip);
        let window_seconds = scope.window_seconds();

        let mut conn = self.redis.clone();
        let result = self
            .script
            .key(&key)
            .arg(window_seconds)
            .invoke_async::<Vec<i64>>(&mut conn)
            .await;

        match result {
            Ok(response) => {
                let current = response[0];
                let ttl = response[1];
                let result = RateLimitResult::from_script_response(current, ttl, limit);

                if !result.allowed {
                    warn!(ip, scope = scope.header_suffix(), current, limit, "rate limit exceeded");
                } else {
                    debug!(ip, scope = scope.header_suffix(), current, limit, "rate limit check passed");
                }

                Ok(result)
            }
            Err(e) => {
                error!(ip, scope = scope.header_suffix(), error = %e, "redis error during rate limit check");
                if self.fail_open {
                    warn!(ip, scope = scope.header_suffix(), "redis unavailable, failing open");
                    Ok(RateLimitResult::fail_open(limit, window_seconds))
                } else {
                    Err(Error::unexpected(format!("rate limiter unavailable: {e}")))
                }
            }
        }
    }

    /// Check both the per-second and per-day windows for a client IP.
    /// Returns both results; the caller rejects the request if either is
    /// not allowed.
    pub async fn check_both(
        &self,
        ip: &str,
        per_second_limit: i64,
        per_day_limit: i64,
    ) -> Result<(RateLimitResult, RateLimitResult)> {
        let per_second = self.check(RateLimitScope::IpPerSecond, ip, per_second_limit).await?;
        let per_day = self.check(RateLimitScope::IpPerDay, ip, per_day_limit).await?;
        Ok((per_second, per_day))
    }

    /// Clears a single window's counter for a client IP. Exposed for
    /// operators manually lifting a ban and for integration tests that need
    /// a clean window before asserting against it.
    pub async fn reset(&self, scope: RateLimitScope, ip: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut redis = self.redis.clone();
        redis
            .del::<_, ()>(scope.key(ip))
            .await
            .map_err(|e| Error::unexpected(format!("failed to delete key: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(RateLimitScope::IpPerSecond.key("1.2.3.4"), "ip:1.2.3.4:second");
        assert_eq!(RateLimitScope::IpPerDay.key("1.2.3.4"), "ip:1.2.3.4:day");
    }

    #[test]
    fn test_result_allowed_under_limit() {
        let result = RateLimitResult::from_script_response(3, 1, 5);
        assert!(result.allowed);
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn test_result_rejected_over_limit() {
        let result = RateLimitResult::from_script_response(6, 1, 5);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_fail_open_result() {
        let result = RateLimitResult::fail_open(100, 86_400);
        assert!(result.allowed);
        assert_eq!(result.current_usage, 0);
        assert_eq!(result.remaining, 100);
    }

    #[test]
    fn test_header_suffixes() {
        assert_eq!(RateLimitScope::IpPerSecond.header_suffix(), "ip-per-second");
        assert_eq!(RateLimitScope::IpPerDay.header_suffix(), "ip-per-day");
    }
}
