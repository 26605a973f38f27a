//! Rate limit and token scope headers returned by the GitHub API

use crate::cli::output::Output;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Rate limit information parsed from API response headers
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Remaining requests in current window
    pub remaining: Option<u32>,
    /// Reset time when the rate limit window resets
    pub reset_time: Option<DateTime<Utc>>,
    /// Limit of requests per window
    pub limit: Option<u32>,
}

impl RateLimitInfo {
    /// Check if rate limited (no remaining requests)
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.remaining, Some(0))
    }

    /// Check if approaching rate limit (less than 10% remaining)
    pub fn is_approaching_limit(&self) -> bool {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) => remaining < (limit / 10),
            _ => false,
        }
    }

    /// Seconds until the window resets
    pub fn wait_seconds(&self) -> Option<u64> {
        self.reset_time.map(|reset| {
            let duration = reset.signed_duration_since(Utc::now());
            duration.num_seconds().max(1) as u64
        })
    }

    /// Human readable `remaining/limit` quota
    pub fn describe(&self) -> String {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) => format!("{} of {} calls remaining", remaining, limit),
            _ => "quota unknown".to_string(),
        }
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Parse GitHub rate limit headers
pub fn parse_github_rate_limits(headers: &HeaderMap) -> RateLimitInfo {
    RateLimitInfo {
        limit: header_value(headers, "x-ratelimit-limit"),
        remaining: header_value(headers, "x-ratelimit-remaining"),
        reset_time: header_value::<i64>(headers, "x-ratelimit-reset")
            .map(|ts| DateTime::from_timestamp(ts, 0).unwrap_or_default()),
    }
}

/// Parse the scopes granted to a classic personal access token
pub fn parse_oauth_scopes(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-oauth-scopes")
        .and_then(|v| v.to_str().ok())
        .map(|s| {
            s.split(',')
                .map(|scope| scope.trim().to_string())
                .filter(|scope| !scope.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Display rate limit warning if approaching limit
pub fn check_rate_limit_warning(info: &RateLimitInfo) {
    if info.is_rate_limited() {
        let wait = info
            .wait_seconds()
            .map(|s| {
                if s < 60 {
                    format!("{} seconds", s)
                } else {
                    format!("{} minutes", s / 60)
                }
            })
            .unwrap_or_else(|| "an unknown time".to_string());
        Output::warning(&format!(
            "GitHub API rate limit reached; it resets in {}. Remaining calls will fail.",
            wait
        ));
    } else if info.is_approaching_limit() {
        Output::info(&format!("GitHub API rate limit: {}", info.describe()));
    }
}
