//! Retry decision for a completed HTTP attempt

use reqwest::StatusCode;

/// Whether a call must carry a bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No credential is attached and 401s are never refreshed
    #[default]
    Public,
    /// Fails fast without a cached access token; 401s trigger a refresh
    Required,
}

/// How the client reacts to a rejected access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Surface the 401 as-is
    Never,
    /// Refresh the access token once and replay the request once
    #[default]
    RefreshOnce,
}

/// What to do after an attempt completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx: hand the response back to the caller
    Done,
    /// 401 on a protected call that has not been retried yet
    NeedsRefresh,
    /// Any other non-2xx, or a 401 that may not be retried
    Failed,
}

/// Classify an attempt.
///
/// `attempt` counts from zero; only the first attempt of a protected call
/// may ask for a refresh, so a replayed request never loops.
pub fn classify(status: StatusCode, auth: AuthMode, attempt: u8, policy: RetryPolicy) -> Outcome {
    if status.is_success() {
        return Outcome::Done;
    }

    let may_refresh = status == StatusCode::UNAUTHORIZED
        && auth == AuthMode::Required
        && policy == RetryPolicy::RefreshOnce
        && attempt == 0;

    if may_refresh {
        Outcome::NeedsRefresh
    } else {
        Outcome::Failed
    }
}
