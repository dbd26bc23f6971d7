use actix_web::{error::JsonPayloadError, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;

#[derive(Serialize)]
pub struct ResponseDto<T: Serialize> {
    pub data: Option<T>,
    pub code: i32,
    pub msg: String,
}

impl<T: Serialize> ResponseDto<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            data,
            code: 0,
            msg: "".to_string(),
        }
    }

    /// Success carrying a user-facing message, e.g. "Username has been updated".
    pub fn message(data: Option<T>, msg: impl Into<String>) -> Self {
        Self {
            data,
            code: 0,
            msg: msg.into(),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ResponseDto::success(Some(data)))
}

pub fn ok_msg(msg: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ResponseDto::<()>::message(None, msg))
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match err {
        JsonPayloadError::ContentType => AppError::param_error("content type must be application/json"),
        JsonPayloadError::Deserialize(e) => AppError::param_error(format!("invalid request body: {}", e)),
        _ => AppError::param_error("invalid request body"),
    };
    app_err.into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    let body = ResponseDto {
        data: err.field_name().map(|field| json!({ "field": field })),
        code: err.code(),
        msg: err.msg(),
    };
    match err {
        AppError::NotFound => HttpResponse::NotFound().json(body),
        _ => HttpResponse::Ok().json(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn field_error_carries_field_name() {
        let resp = response_from_error(&AppError::field("title", "This field is required."));
        assert_eq!(resp.status(), 200);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], 1);
        assert_eq!(value["data"]["field"], "title");
        assert_eq!(value["msg"], "This field is required.");
    }

    #[actix_rt::test]
    async fn not_found_uses_404() {
        let resp = response_from_error(&AppError::NotFound);
        assert_eq!(resp.status(), 404);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], 4);
        assert!(value["data"].is_null());
    }
}
