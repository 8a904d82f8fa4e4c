//! Fixed robots policy: Googlebot may crawl, everyone else may not.

use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

pub const ROBOTS_PATH: &str = "/ROBOTS.txt";

pub const ROBOTS_BODY: &str = "User-agent: Googlebot\nDisallow:\n\nUser-agent: *\nDisallow: /";

/// Handler of [`ROBOTS_PATH`].
pub async fn robots_txt() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], ROBOTS_BODY)
}
