mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use axum::{extract::FromRequest, http::Request, Json};
use serde::{Deserialize, Serialize};

use crate::errors::RequestError;

/// `Json<T>` whose rejections become `RequestError::Validation` (422 with a `{message}` body).
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, B, T> FromRequest<S, B> for JsonBody<T>
where
    Json<T>: FromRequest<S, B, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
    B: Send + 'static,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Query string of `GET /questions`.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct QuestionQueryParams {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, rename = "q")]
    pub search_text: Option<String>,
}

impl QuestionQueryParams {
    /// Empty strings mean "no filter".
    pub fn normalized(self) -> Self {
        QuestionQueryParams {
            tag: self.tag.filter(|tag| !tag.is_empty()),
            search_text: self.search_text.filter(|text| !text.is_empty()),
        }
    }
}
