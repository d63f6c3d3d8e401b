use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    Extension, Json,
};

use crate::{
    authentication::{hash_password_argon2, verify_password_argon2, AuthUser},
    data_formats::*,
    db_helpers::*,
    errors::{RequestError, RequestErrorJson, RequestResult},
    AppState, JsonResponse,
};

type JsonResult<T> = RequestResult<Json<T>>;
type CreatedResult<T> = RequestResult<JsonResponse<T>>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> JsonResponse<RequestErrorJson> {
    (
        StatusCode::NOT_FOUND,
        Json(RequestErrorJson {
            message: format!("URL {} provided was not found", uri),
        }),
    )
}

// ----------------- Auth Handlers -----------------
pub async fn register_user(
    Extension(state): Extension<AppState>,
    JsonBody(mut user): JsonBody<RegisterRequest>,
) -> CreatedResult<MessageWrapper> {
    for field in [
        &user.username,
        &user.first_name,
        &user.last_name,
        &user.email,
        &user.password,
    ] {
        if field.trim().is_empty() {
            return Err(RequestError::Validation(
                "username, firstname, lastname, email and password are required",
            ));
        }
    }

    user.password = hash_password_argon2(user.password).await.map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        RequestError::ServerError
    })?;
    insert_user(state.store.pool(), user).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageWrapper::new("User registered successfully")),
    ))
}

pub async fn login_user(
    Extension(state): Extension<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> JsonResult<LoginWrapper> {
    let user = get_user_by_email(state.store.pool(), &request.email)
        .await?
        .ok_or(RequestError::NotAuthorized("Invalid email or password"))?;

    let is_password_correct = verify_password_argon2(request.password, user.password.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification failed");
            RequestError::ServerError
        })?;
    if !is_password_correct {
        return Err(RequestError::NotAuthorized("Invalid email or password"));
    }

    let token = state.auth.issue_token(user.id).map_err(|e| {
        tracing::error!(error = %e, "token generation failed");
        RequestError::ServerError
    })?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(LoginWrapper {
        token,
        user: UserResponse::new(user),
    }))
}

// ----------------- User Handlers -----------------
pub async fn get_current_user(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
) -> JsonResult<UserResponse> {
    let user = get_user_by_id(state.store.pool(), id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(UserResponse::new(user)))
}

pub async fn delete_current_user(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
) -> JsonResult<MessageWrapper> {
    delete_user_in_db(state.store.pool(), id).await?;
    Ok(Json(MessageWrapper::new(
        "User and all associated questions and answers deleted successfully",
    )))
}

// ----------------- Question Handlers -----------------
pub async fn create_question(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    JsonBody(request): JsonBody<CreateQuestionRequest>,
) -> CreatedResult<QuestionResponse> {
    let question = create_question_in_db(state.store.pool(), id, request).await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::new(question))))
}

pub async fn list_questions(
    Extension(state): Extension<AppState>,
    Query(params): Query<QuestionQueryParams>,
) -> JsonResult<Vec<QuestionResponse>> {
    let questions = list_questions_in_db(state.store.pool(), params).await?;
    Ok(Json(
        questions.into_iter().map(QuestionResponse::new).collect(),
    ))
}

pub async fn get_question(
    Extension(state): Extension<AppState>,
    Path(question_id): Path<String>,
) -> JsonResult<QuestionResponse> {
    let question = get_question_by_id_in_db(state.store.pool(), &question_id).await?;
    Ok(Json(QuestionResponse::new(question)))
}

pub async fn update_question(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    Path(question_id): Path<String>,
    JsonBody(request): JsonBody<UpdateQuestionRequest>,
) -> JsonResult<QuestionResponse> {
    let question = update_question_in_db(state.store.pool(), &question_id, id, request).await?;
    Ok(Json(QuestionResponse::new(question)))
}

pub async fn delete_question(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    Path(question_id): Path<String>,
) -> JsonResult<MessageWrapper> {
    delete_question_in_db(state.store.pool(), &question_id, id).await?;
    Ok(Json(MessageWrapper::new(
        "Question and all associated answers deleted successfully",
    )))
}

// ----------------- Answer Handlers -----------------
pub async fn list_answers(
    Extension(state): Extension<AppState>,
    Path(question_id): Path<String>,
) -> JsonResult<Vec<AnswerResponse>> {
    let answers = list_answers_for_question_in_db(state.store.pool(), &question_id).await?;
    Ok(Json(answers.into_iter().map(AnswerResponse::new).collect()))
}

pub async fn create_answer(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    JsonBody(request): JsonBody<CreateAnswerRequest>,
) -> CreatedResult<AnswerResponse> {
    let answer = create_answer_in_db(state.store.pool(), id, request).await?;
    Ok((StatusCode::CREATED, Json(AnswerResponse::new(answer))))
}

pub async fn update_answer(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    Path(answer_id): Path<String>,
    JsonBody(request): JsonBody<UpdateAnswerRequest>,
) -> JsonResult<AnswerResponse> {
    let answer = update_answer_in_db(state.store.pool(), &answer_id, id, request).await?;
    Ok(Json(AnswerResponse::new(answer)))
}

pub async fn delete_answer(
    Extension(state): Extension<AppState>,
    AuthUser { id }: AuthUser,
    Path(answer_id): Path<String>,
) -> JsonResult<MessageWrapper> {
    delete_answer_in_db(state.store.pool(), &answer_id, id).await?;
    Ok(Json(MessageWrapper::new("Answer deleted successfully")))
}
