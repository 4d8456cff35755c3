use actix_web::HttpResponse;
use std::borrow::Cow;

/// Response payload flattened into the top-level JSON object, with an
/// optional human-readable `message` next to it.
#[derive(serde::Serialize)]
pub struct SuccessData<T: serde::Serialize> {
    #[serde(flatten)]
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
}

pub struct Success<T: serde::Serialize> {
    pub status: actix_web::http::StatusCode,
    pub body: SuccessData<T>,
}

impl<T: serde::Serialize> Success<T> {
    pub fn ok(data: T) -> Self {
        Self { status: actix_web::http::StatusCode::OK, body: SuccessData { data, message: None } }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: actix_web::http::StatusCode::CREATED,
            body: SuccessData { data, message: None },
        }
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<Cow<'static, str>>,
    {
        self.body.message = Some(msg.into());
        self
    }
}

impl<T: serde::Serialize> actix_web::Responder for Success<T> {
    type Body = actix_web::body::BoxBody;

    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::build(self.status).json(self.body)
    }
}

/// Body of acknowledgement-only responses.
#[derive(serde::Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn done() -> Self {
        Self { success: true }
    }
}
