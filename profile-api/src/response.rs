use http::{StatusCode, HeaderValue};
use http::header::{CONTENT_TYPE, CONTENT_LENGTH};
use axum_core::body::Body;
use axum_core::response::Response;
use serde::Serialize;
use bytes::{Bytes, BytesMut, BufMut};

fn json_response(status: StatusCode, body: Bytes) -> Response {
    let length = HeaderValue::from(body.len());
    let mut response = Response::new(Body::from(body));

    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, length);

    response
}

pub fn serialize_json(
    status: StatusCode,
    data: &impl Serialize
) -> Result<Response, serde_json::Error> {
    let froze = {
        let mut buf = BytesMut::with_capacity(128).writer();
        serde_json::to_writer(&mut buf, data)?;

        buf.into_inner().freeze()
    };

    Ok(json_response(status, froze))
}

pub fn error_json() -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        Bytes::from_static(br#"{"kind":{"General":"InternalFailure"}}"#)
    )
}
