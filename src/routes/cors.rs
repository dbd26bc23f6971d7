use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{self, HeaderMap, HeaderValue},
    http::Method,
    middleware::Next,
    web, Error, HttpResponse,
};

use crate::config::AppConfig;

const PREFLIGHT_MAX_AGE: &str = "86400";

/// Browser access for the JSON API. Preflight requests never reach a handler.
pub async fn cors_handler<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody,
{
    let token_header = req
        .app_data::<web::Data<AppConfig>>()
        .map(|cfg| cfg.token_header.clone())
        .unwrap_or_else(|| "token".to_string());

    let mut res = if req.method() == Method::OPTIONS {
        let preflight = HttpResponse::NoContent().finish().map_into_right_body();
        req.into_response(preflight)
    } else {
        next.call(req).await?.map_into_left_body()
    };
    apply_cors(res.headers_mut(), &token_header);
    Ok(res)
}

fn apply_cors(headers: &mut HeaderMap, token_header: &str) {
    let allowed = format!("Content-Type, Accept, Authorization, {}", token_header);
    let pairs = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS")),
        (header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE)),
        (header::VARY, HeaderValue::from_static("Origin")),
    ];
    for (name, value) in pairs {
        headers.insert(name, value);
    }
    let allowed = HeaderValue::from_str(&allowed)
        .unwrap_or_else(|_| HeaderValue::from_static("Content-Type, Accept, Authorization"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_headers_include_token_header() {
        let mut headers = HeaderMap::new();
        apply_cors(&mut headers, "x-study-token");
        let allowed = headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap();
        assert!(allowed.to_str().unwrap().ends_with("x-study-token"));
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }
}
