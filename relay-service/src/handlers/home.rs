use axum::response::Html;

/// Placeholder body served at `/`.
pub const HOME_PAGE: &str = "HelloWorld('Print')";

pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}
