use sqlx::SqlitePool;

use crate::{
    data_formats::RegisterRequest,
    errors::RequestError,
    models::{now_timestamp, User, UserId},
};

const USER_COLUMNS: &str = "id, username, email, password, first_name, last_name";

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let result = sqlx::query_as::<_, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let result = sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

/// Expects `user.password` to already be hashed.
pub async fn insert_user(pool: &SqlitePool, user: RegisterRequest) -> Result<User, RequestError> {
    let now = now_timestamp();
    let mut tx = pool.begin().await?;
    let query = format!(
        r#"
        INSERT INTO users (username, email, password, first_name, last_name, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(now)
        .fetch_one(&mut tx)
        .await
        .map_err(RequestError::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                RequestError::Conflict("Username or email already exists")
            } else {
                e
            }
        })?;
    tx.commit().await?;
    tracing::info!(user_id = user.id, "registered user");
    Ok(user)
}

/// Removes the user together with every question and answer that depends on them.
pub async fn delete_user_in_db(pool: &SqlitePool, id: UserId) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;

    let answers = sqlx::query(
        r#"
        DELETE FROM answers
        WHERE user_id = ?1
           OR question_id IN (SELECT id FROM questions WHERE user_id = ?1)
        "#,
    )
    .bind(id)
    .execute(&mut tx)
    .await?;

    let questions = sqlx::query("DELETE FROM questions WHERE user_id = ?1")
        .bind(id)
        .execute(&mut tx)
        .await?;

    let user = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(&mut tx)
        .await?;

    if user.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(RequestError::NotFound("User not found"));
    }

    tx.commit().await?;
    tracing::info!(
        user_id = id,
        questions = questions.rows_affected(),
        answers = answers.rows_affected(),
        "deleted user"
    );
    Ok(())
}
