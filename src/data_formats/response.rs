use serde::{Deserialize, Serialize};

use crate::models::{timestamp, Answer, Question, User, UserId};

/// Public profile fields embedded in question and answer responses.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OwnerProfile {
    #[serde(rename = "userid")]
    pub id: UserId,
    pub username: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserResponse {
    #[serde(rename = "userid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QuestionResponse {
    #[serde(rename = "questionid")]
    pub id: String,
    #[serde(rename = "userid")]
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "User")]
    pub owner: OwnerProfile,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AnswerResponse {
    #[serde(rename = "answerid")]
    pub id: String,
    #[serde(rename = "userid")]
    pub user_id: UserId,
    #[serde(rename = "questionid")]
    pub question_id: String,
    #[serde(rename = "answer")]
    pub body: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "User")]
    pub owner: OwnerProfile,
}

impl UserResponse {
    pub fn new(
        User {
            id,
            username,
            email,
            first_name,
            last_name,
            ..
        }: User,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            first_name,
            last_name,
        }
    }
}

impl QuestionResponse {
    pub fn new(
        Question {
            id,
            user_id,
            title,
            description,
            tag,
            created_at,
            updated_at,
            owner_username,
            owner_first_name,
            owner_last_name,
        }: Question,
    ) -> Self {
        QuestionResponse {
            id,
            user_id,
            title,
            description,
            tag,
            created_at: timestamp(created_at),
            updated_at: timestamp(updated_at),
            owner: OwnerProfile {
                id: user_id,
                username: owner_username,
                first_name: owner_first_name,
                last_name: owner_last_name,
            },
        }
    }
}

impl AnswerResponse {
    pub fn new(
        Answer {
            id,
            user_id,
            question_id,
            body,
            created_at,
            updated_at,
            owner_username,
            owner_first_name,
            owner_last_name,
        }: Answer,
    ) -> Self {
        AnswerResponse {
            id,
            user_id,
            question_id,
            body,
            created_at: timestamp(created_at),
            updated_at: timestamp(updated_at),
            owner: OwnerProfile {
                id: user_id,
                username: owner_username,
                first_name: owner_first_name,
                last_name: owner_last_name,
            },
        }
    }
}
