use axum::{
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use stockledger_core::Actor;

use crate::context::ActorContext;

/// Header naming the person behind a request. Absent or blank means
/// `anonymous`.
pub const ACTOR_HEADER: &str = "x-actor";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let actor = extract_actor(req.headers());
    req.extensions_mut().insert(ActorContext::new(actor));
    next.run(req).await
}

fn extract_actor(headers: &HeaderMap) -> Actor {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(Actor::new)
        .unwrap_or_else(Actor::anonymous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_actor(&HeaderMap::new()), Actor::anonymous());
    }

    #[test]
    fn header_value_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("  zeynep "));
        assert_eq!(extract_actor(&headers).as_str(), "zeynep");
    }

    #[test]
    fn blank_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("   "));
        assert_eq!(extract_actor(&headers), Actor::anonymous());
    }
}
