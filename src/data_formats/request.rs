use serde::{Deserialize, Deserializer, Serialize};

/// Keeps an explicit JSON `null` apart from an absent key: absent is `None`
/// (through `#[serde(default)]`), `null` is `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ----------------- Auth Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

// ----------------- Question Request -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct CreateQuestionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
}

/// The only question fields a caller may change. Anything else in the body is ignored.
/// `description` and `tag` are cleared by sending `null`.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct UpdateQuestionRequest {
    pub title: Option<String>,
    #[serde(
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<Option<String>>,
}

// ----------------- Answer Request -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct CreateAnswerRequest {
    #[serde(rename = "questionid")]
    pub question_id: Option<String>,
    #[serde(rename = "answer")]
    pub body: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct UpdateAnswerRequest {
    #[serde(rename = "answer")]
    pub body: Option<String>,
}
