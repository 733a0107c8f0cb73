use super::*;
use std::time::{Duration, Instant};

pub(super) const DEFAULT_WRITES_PER_SEC: u32 = 120;

/// Access rules for the editor API. The server only binds loopback, so there is
/// one client budget: reads (map polling, bus streaming) are free, and every
/// other method draws from a shared per-second write allowance.
#[derive(Clone)]
pub(super) struct ApiSecurity {
    pub token: Option<String>,
    pub writes_per_sec: u32,
    window: Arc<Mutex<WriteWindow>>,
}

#[derive(Debug)]
struct WriteWindow {
    opened: Instant,
    writes: u32,
}

impl WriteWindow {
    /// Count one write. False once this second's allowance is spent.
    fn admit(&mut self, now: Instant, limit: u32) -> bool {
        if now.duration_since(self.opened) >= Duration::from_secs(1) {
            self.opened = now;
            self.writes = 0;
        }
        if self.writes >= limit {
            return false;
        }
        self.writes += 1;
        true
    }
}

impl ApiSecurity {
    pub(super) fn new(token: Option<String>, writes_per_sec: u32) -> Self {
        Self {
            token,
            writes_per_sec: writes_per_sec.max(1),
            window: Arc::new(Mutex::new(WriteWindow {
                opened: Instant::now(),
                writes: 0,
            })),
        }
    }

    /// `EMOJIBOARD_API_TOKEN` and `EMOJIBOARD_API_RATE_LIMIT_PER_SEC`.
    pub(super) fn from_env() -> Self {
        let token = std::env::var("EMOJIBOARD_API_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let writes_per_sec = std::env::var("EMOJIBOARD_API_RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_WRITES_PER_SEC);
        if token.is_some() {
            println!("[Emojiboard API] Token required for every request");
        }
        Self::new(token, writes_per_sec)
    }

    fn admit_write(&self) -> bool {
        // a poisoned lock only means another request panicked mid-count
        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        window.admit(Instant::now(), self.writes_per_sec)
    }
}

/// Token from `Authorization: Bearer`, or from `?token=` for the bus stream,
/// which browsers open without custom headers.
fn presented_token(req: &Request) -> Option<&str> {
    let header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("Bearer "));
    header.or_else(|| {
        req.uri()
            .query()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
    })
}

pub(super) async fn api_guard(
    State(security): State<ApiSecurity>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    if let Some(expected) = security.token.as_deref() {
        if presented_token(&req).map(str::trim) != Some(expected) {
            warn!(
                "[Emojiboard API] Rejected {} {}: missing or wrong token",
                req.method(),
                req.uri().path()
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::err(
                    "send EMOJIBOARD_API_TOKEN as a Bearer token or a token query parameter",
                )),
            )
                .into_response();
        }
    }

    if req.method() != axum::http::Method::GET && !security.admit_write() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::err(format!(
                "more than {} edits per second",
                security.writes_per_sec
            ))),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::util::ServiceExt;

    fn guarded(security: ApiSecurity) -> Router {
        Router::new()
            .route("/map", get(|| async { "map" }).post(|| async { "painted" }))
            .route("/bus/subscribe", get(|| async { "stream" }))
            .layer(middleware::from_fn_with_state(security, api_guard))
    }

    async fn status(app: &Router, method: &str, uri: &str, bearer: Option<&str>) -> StatusCode {
        let mut req = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let req = req.body(Body::empty()).expect("request");
        app.clone().oneshot(req).await.expect("response").status()
    }

    #[tokio::test]
    async fn token_is_checked_from_header_or_query() {
        let app = guarded(ApiSecurity::new(Some("sesame".into()), 100));

        assert_eq!(status(&app, "GET", "/map", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(&app, "GET", "/map", Some("nope")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(&app, "GET", "/map", Some("sesame")).await, StatusCode::OK);
        assert_eq!(
            status(&app, "GET", "/bus/subscribe?after=3&token=sesame", None).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn open_mode_needs_no_token() {
        let app = guarded(ApiSecurity::new(None, 100));
        assert_eq!(status(&app, "POST", "/map", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn only_writes_spend_the_allowance() {
        let app = guarded(ApiSecurity::new(None, 1));

        assert_eq!(status(&app, "POST", "/map", None).await, StatusCode::OK);
        assert_eq!(
            status(&app, "POST", "/map", None).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        // polling keeps working while edits are throttled
        assert_eq!(status(&app, "GET", "/map", None).await, StatusCode::OK);
    }

    #[test]
    fn window_reopens_after_a_second() {
        let start = Instant::now();
        let mut window = WriteWindow {
            opened: start,
            writes: 0,
        };
        assert!(window.admit(start, 2));
        assert!(window.admit(start, 2));
        assert!(!window.admit(start, 2));
        assert!(window.admit(start + Duration::from_millis(1200), 2));
        assert_eq!(window.writes, 1);
    }
}
