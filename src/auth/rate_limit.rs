use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::server::AppState;

const WINDOW: Duration = Duration::from_secs(60);

/// Account endpoints that share a request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRoute {
    SignUp,
    SignIn,
    /// Requesting a reset and redeeming it draw from one budget.
    PasswordReset,
}

impl AccountRoute {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/v1/accounts/signup" => Some(Self::SignUp),
            "/v1/accounts/signin" => Some(Self::SignIn),
            "/v1/accounts/password-reset" | "/v1/accounts/password-reset/confirm" => {
                Some(Self::PasswordReset)
            }
            _ => None,
        }
    }
}

type LimitKey = (IpAddr, AccountRoute);

struct Window {
    started: Instant,
    used: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, used: 0 }
    }

    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) > WINDOW
    }

    /// Count one request. `Err` carries the wait until the window reopens.
    fn admit(&mut self, now: Instant, limit: u32) -> Result<u32, Duration> {
        if self.expired(now) {
            *self = Window::new(now);
        }
        if self.used >= limit {
            return Err(WINDOW.saturating_sub(now.duration_since(self.started)));
        }
        self.used += 1;
        Ok(limit - self.used)
    }
}

/// Fixed one-minute windows per client IP and account route, held in
/// process memory.
#[derive(Clone)]
pub struct RateLimitState {
    windows: Arc<Mutex<HashMap<LimitKey, Window>>>,
    per_window: u32,
}

impl RateLimitState {
    pub fn new(per_window: u32) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            per_window,
        }
    }

    /// Returns the requests left in the window, or how long to wait.
    pub async fn check(&self, ip: IpAddr, route: AccountRoute) -> Result<u32, Duration> {
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .entry((ip, route))
            .or_insert_with(|| Window::new(now))
            .admit(now, self.per_window)
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .retain(|_, window| !window.expired(now));
    }

    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(WINDOW * 5);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }
}

pub async fn rate_limit_accounts(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(route) = AccountRoute::from_path(req.uri().path()) else {
        return Ok(next.run(req).await);
    };
    let ip = addr.ip();

    match state.rate_limiter.check(ip, route).await {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, route = ?route, remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                route = ?route,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}
