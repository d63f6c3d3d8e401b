use serde::{Deserialize, Serialize};

use super::response::UserResponse;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginWrapper {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageWrapper {
    pub message: String,
}

impl MessageWrapper {
    pub fn new(message: &str) -> MessageWrapper {
        MessageWrapper {
            message: message.to_string(),
        }
    }
}
