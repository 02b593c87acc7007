use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// CSP for the chat page and its assets: same-origin scripts, styles and fetches.
const PAGE_CSP: &str = "default-src 'self'; \
                        script-src 'self'; \
                        style-src 'self'; \
                        img-src 'self' data:; \
                        connect-src 'self'; \
                        frame-ancestors 'none'";

/// CSP for JSON endpoints: nothing may be loaded from a response.
const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'";

fn is_page_route(path: &str) -> bool {
    path == "/" || path.starts_with("/static/")
}

pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let page_route = is_page_route(req.uri().path());

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(if page_route { PAGE_CSP } else { API_CSP }),
    );

    response
}
