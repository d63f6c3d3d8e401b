use sqlx::{SqliteConnection, SqlitePool};

use crate::data_formats::{CreateQuestionRequest, QuestionQueryParams, UpdateQuestionRequest};
use crate::errors::RequestError;
use crate::models::{now_timestamp, Question, UserId};

use super::{
    ensure_owner, guarded_write_miss, new_resource_id, parse_resource_id, required_text,
    QueryBuilder,
};

const QUESTION_QUERY: &str = r#"
            SELECT questions.id          AS "id",
                   questions.user_id     AS "user_id",
                   questions.title       AS "title",
                   questions.description AS "description",
                   questions.tag         AS "tag",
                   questions.created_at  AS "created_at",
                   questions.updated_at  AS "updated_at",
                   users.username        AS "owner_username",
                   users.first_name      AS "owner_first_name",
                   users.last_name       AS "owner_last_name"
            FROM   questions
                   JOIN users
                     ON users.id = questions.user_id
"#;

const QUESTION_NOT_FOUND: &str = "Question not found";
const UPDATE_FORBIDDEN: &str = "Not authorized to update this question";

async fn fetch_question(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Question>, RequestError> {
    let query = format!("{QUESTION_QUERY} WHERE questions.id = ?1");
    let result = sqlx::query_as::<_, Question>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(result)
}

async fn question_owner(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<UserId>, RequestError> {
    let result = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM questions WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(result)
}

/// Case-insensitive substring match using full Unicode lowercasing.
fn title_matches(title: &str, needle: &str) -> bool {
    title.to_lowercase().contains(needle)
}

pub async fn create_question_in_db(
    pool: &SqlitePool,
    owner_id: UserId,
    CreateQuestionRequest {
        title,
        description,
        tag,
    }: CreateQuestionRequest,
) -> Result<Question, RequestError> {
    let title = required_text(title, "Question title is required")?;
    let id = new_resource_id();
    let now = now_timestamp();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO questions (id, user_id, title, description, tag, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(title)
    .bind(description)
    .bind(tag)
    .bind(now)
    .execute(&mut tx)
    .await
    .map_err(RequestError::from)
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            RequestError::NotAuthorized("User no longer exists")
        } else {
            e
        }
    })?;

    let question = fetch_question(&mut tx, &id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;

    tracing::info!(question_id = %question.id, owner_id, "created question");
    Ok(question)
}

/// Newest first. `tag` is an exact match, `search_text` a case-insensitive title substring.
pub async fn list_questions_in_db(
    pool: &SqlitePool,
    params: QuestionQueryParams,
) -> Result<Vec<Question>, RequestError> {
    let QuestionQueryParams { tag, search_text } = params.normalized();
    let query = format!(
        r#"{QUESTION_QUERY}
            WHERE  ( questions.tag = ?1
                     OR ?1 IS NULL )
            ORDER  BY questions.created_at DESC, questions.rowid DESC
        "#
    );
    let mut result = sqlx::query_as::<_, Question>(&query)
        .bind(tag)
        .fetch_all(pool)
        .await?;
    // SQLite's LIKE only folds ASCII, so the title match happens here.
    if let Some(needle) = search_text.map(|text| text.to_lowercase()) {
        result.retain(|question| title_matches(&question.title, &needle));
    }
    Ok(result)
}

pub async fn get_question_by_id_in_db(
    pool: &SqlitePool,
    id: &str,
) -> Result<Question, RequestError> {
    let id = parse_resource_id(id).ok_or(RequestError::NotFound(QUESTION_NOT_FOUND))?;
    let mut conn = pool.acquire().await?;
    fetch_question(&mut conn, &id)
        .await?
        .ok_or(RequestError::NotFound(QUESTION_NOT_FOUND))
}

/// The guarded `UPDATE` runs first so the transaction takes SQLite's write
/// lock up front; concurrent writers then queue on the busy timeout.
pub async fn update_question_in_db(
    pool: &SqlitePool,
    id: &str,
    caller_id: UserId,
    UpdateQuestionRequest {
        title,
        description,
        tag,
    }: UpdateQuestionRequest,
) -> Result<Question, RequestError> {
    let id = parse_resource_id(id).ok_or(RequestError::NotFound(QUESTION_NOT_FOUND))?;
    let title = match title {
        Some(title) => Some(required_text(Some(title), "Question title cannot be empty")?),
        None => None,
    };

    let builder = QueryBuilder::new("UPDATE questions SET ", ", ")
        .add_param("title", title)
        .add_nullable_param("description", description)
        .add_nullable_param("tag", tag);
    if !builder.has_assignments() {
        let existing = get_question_by_id_in_db(pool, &id).await?;
        ensure_owner(existing.user_id, caller_id, UPDATE_FORBIDDEN)?;
        return Ok(existing);
    }
    let (query, params) = builder
        .add_param("updated_at", Some(now_timestamp()))
        .add_clause(" WHERE id = ", id.clone())
        .build();
    let query = format!("{query} AND user_id = ?{}", params.len() + 1);

    let mut tx = pool.begin().await?;
    let mut update = sqlx::query(&query);
    for param in params {
        update = update.bind(param);
    }
    let updated = update.bind(caller_id).execute(&mut tx).await?;
    if updated.rows_affected() == 0 {
        let owner_id = question_owner(&mut tx, &id).await?;
        tx.rollback().await?;
        return Err(guarded_write_miss(
            owner_id,
            caller_id,
            QUESTION_NOT_FOUND,
            UPDATE_FORBIDDEN,
        ));
    }

    let question = fetch_question(&mut tx, &id)
        .await?
        .ok_or(RequestError::NotFound(QUESTION_NOT_FOUND))?;
    tx.commit().await?;

    tracing::info!(question_id = %id, caller_id, "updated question");
    Ok(question)
}

/// Deletes the question and all of its answers in a single transaction.
pub async fn delete_question_in_db(
    pool: &SqlitePool,
    id: &str,
    caller_id: UserId,
) -> Result<(), RequestError> {
    let id = parse_resource_id(id).ok_or(RequestError::NotFound(QUESTION_NOT_FOUND))?;

    let mut tx = pool.begin().await?;
    let answers = sqlx::query(
        r#"
        DELETE FROM answers
        WHERE question_id = ?1
          AND EXISTS (SELECT 1 FROM questions WHERE id = ?1 AND user_id = ?2)
        "#,
    )
    .bind(&id)
    .bind(caller_id)
    .execute(&mut tx)
    .await?;
    let question = sqlx::query("DELETE FROM questions WHERE id = ?1 AND user_id = ?2")
        .bind(&id)
        .bind(caller_id)
        .execute(&mut tx)
        .await?;
    if question.rows_affected() == 0 {
        let owner_id = question_owner(&mut tx, &id).await?;
        tx.rollback().await?;
        return Err(guarded_write_miss(
            owner_id,
            caller_id,
            QUESTION_NOT_FOUND,
            "Not authorized to delete this question",
        ));
    }
    tx.commit().await?;

    tracing::info!(
        question_id = %id,
        answers = answers.rows_affected(),
        "deleted question"
    );
    Ok(())
}
