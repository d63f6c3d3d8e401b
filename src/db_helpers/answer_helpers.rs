use sqlx::{SqliteConnection, SqlitePool};

use crate::data_formats::{CreateAnswerRequest, UpdateAnswerRequest};
use crate::errors::RequestError;
use crate::models::{now_timestamp, Answer, UserId};

use super::{ensure_owner, guarded_write_miss, new_resource_id, parse_resource_id, required_text};

const ANSWER_QUERY: &str = r#"
            SELECT answers.id          AS "id",
                   answers.user_id     AS "user_id",
                   answers.question_id AS "question_id",
                   answers.body        AS "body",
                   answers.created_at  AS "created_at",
                   answers.updated_at  AS "updated_at",
                   users.username      AS "owner_username",
                   users.first_name    AS "owner_first_name",
                   users.last_name     AS "owner_last_name"
            FROM   answers
                   JOIN users
                     ON users.id = answers.user_id
"#;

const ANSWER_NOT_FOUND: &str = "Answer not found";
const QUESTION_MISSING: &str = "Question does not exist";
const UPDATE_FORBIDDEN: &str = "Not authorized to update this answer";

async fn fetch_answer(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Answer>, RequestError> {
    let query = format!("{ANSWER_QUERY} WHERE answers.id = ?1");
    let result = sqlx::query_as::<_, Answer>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(result)
}

async fn answer_owner(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<UserId>, RequestError> {
    let result = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM answers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(result)
}

/// Any authenticated user may answer any existing question.
pub async fn create_answer_in_db(
    pool: &SqlitePool,
    owner_id: UserId,
    CreateAnswerRequest { question_id, body }: CreateAnswerRequest,
) -> Result<Answer, RequestError> {
    let question_id = required_text(question_id, "questionid is required")?;
    let body = required_text(body, "Answer body is required")?;
    let question_id =
        parse_resource_id(&question_id).ok_or(RequestError::Validation(QUESTION_MISSING))?;
    let id = new_resource_id();
    let now = now_timestamp();

    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO answers (id, user_id, question_id, body, created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?5
        WHERE  EXISTS (SELECT 1 FROM questions WHERE id = ?3)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(&question_id)
    .bind(body)
    .bind(now)
    .execute(&mut tx)
    .await
    .map_err(RequestError::from)
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            RequestError::Validation(QUESTION_MISSING)
        } else {
            e
        }
    })?;
    if inserted.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(RequestError::Validation(QUESTION_MISSING));
    }

    let answer = fetch_answer(&mut tx, &id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;

    tracing::info!(answer_id = %answer.id, question_id = %question_id, owner_id, "created answer");
    Ok(answer)
}

/// Oldest first. A question that does not exist simply has no answers.
pub async fn list_answers_for_question_in_db(
    pool: &SqlitePool,
    question_id: &str,
) -> Result<Vec<Answer>, RequestError> {
    let question_id = match parse_resource_id(question_id) {
        Some(id) => id,
        None => return Ok(vec![]),
    };
    let query = format!(
        "{ANSWER_QUERY} WHERE answers.question_id = ?1 ORDER BY answers.created_at ASC, answers.rowid ASC"
    );
    let result = sqlx::query_as::<_, Answer>(&query)
        .bind(question_id)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

pub async fn update_answer_in_db(
    pool: &SqlitePool,
    id: &str,
    caller_id: UserId,
    UpdateAnswerRequest { body }: UpdateAnswerRequest,
) -> Result<Answer, RequestError> {
    let id = parse_resource_id(id).ok_or(RequestError::NotFound(ANSWER_NOT_FOUND))?;
    let body = match required_text(body, "Answer body is required") {
        Ok(body) => body,
        Err(invalid) => {
            // Missing and foreign answers still report 404/403 ahead of the bad body.
            let mut conn = pool.acquire().await?;
            let owner_id = answer_owner(&mut conn, &id)
                .await?
                .ok_or(RequestError::NotFound(ANSWER_NOT_FOUND))?;
            ensure_owner(owner_id, caller_id, UPDATE_FORBIDDEN)?;
            return Err(invalid);
        }
    };

    let mut tx = pool.begin().await?;
    let updated =
        sqlx::query("UPDATE answers SET body = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4")
            .bind(body)
            .bind(now_timestamp())
            .bind(&id)
            .bind(caller_id)
            .execute(&mut tx)
            .await?;
    if updated.rows_affected() == 0 {
        let owner_id = answer_owner(&mut tx, &id).await?;
        tx.rollback().await?;
        return Err(guarded_write_miss(
            owner_id,
            caller_id,
            ANSWER_NOT_FOUND,
            UPDATE_FORBIDDEN,
        ));
    }

    let answer = fetch_answer(&mut tx, &id)
        .await?
        .ok_or(RequestError::NotFound(ANSWER_NOT_FOUND))?;
    tx.commit().await?;

    tracing::info!(answer_id = %id, caller_id, "updated answer");
    Ok(answer)
}

pub async fn delete_answer_in_db(
    pool: &SqlitePool,
    id: &str,
    caller_id: UserId,
) -> Result<(), RequestError> {
    let id = parse_resource_id(id).ok_or(RequestError::NotFound(ANSWER_NOT_FOUND))?;

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM answers WHERE id = ?1 AND user_id = ?2")
        .bind(&id)
        .bind(caller_id)
        .execute(&mut tx)
        .await?;
    if deleted.rows_affected() == 0 {
        let owner_id = answer_owner(&mut tx, &id).await?;
        tx.rollback().await?;
        return Err(guarded_write_miss(
            owner_id,
            caller_id,
            ANSWER_NOT_FOUND,
            "Not authorized to delete this answer",
        ));
    }
    tx.commit().await?;

    tracing::info!(answer_id = %id, caller_id, "deleted answer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_formats::CreateQuestionRequest;
    use crate::db_helpers::{create_question_in_db, test_support::seed_user};
    use crate::models::Question;
    use crate::store::test_store;

    async fn question(pool: &SqlitePool, owner_id: UserId) -> Question {
        create_question_in_db(
            pool,
            owner_id,
            CreateQuestionRequest {
                title: Some("How do I center a div?".to_string()),
                tag: Some("CSS".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    fn reply(question_id: &str, body: &str) -> CreateAnswerRequest {
        CreateAnswerRequest {
            question_id: Some(question_id.to_string()),
            body: Some(body.to_string()),
        }
    }

    #[tokio::test]
    async fn anyone_can_answer_and_answers_are_listed_in_order() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let bob = seed_user(pool, "bob").await;
        let q = question(pool, alice.id).await;

        let first = create_answer_in_db(pool, bob.id, reply(&q.id, "Use flexbox"))
            .await
            .unwrap();
        assert_eq!(first.user_id, bob.id);
        assert_eq!(first.question_id, q.id);
        assert_eq!(first.owner_username, "bob");
        create_answer_in_db(pool, alice.id, reply(&q.id, "Thanks!"))
            .await
            .unwrap();

        let answers = list_answers_for_question_in_db(pool, &q.id).await.unwrap();
        let bodies: Vec<_> = answers.iter().map(|a| a.body.as_str()).collect();
        assert_eq!(bodies, vec!["Use flexbox", "Thanks!"]);
    }

    #[tokio::test]
    async fn create_validates_body_and_question() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let q = question(pool, alice.id).await;

        let cases = [
            reply(&q.id, ""),
            CreateAnswerRequest {
                question_id: None,
                body: Some("orphan".to_string()),
            },
            reply("not-a-uuid", "orphan"),
            reply(&new_resource_id(), "orphan"),
        ];
        for case in cases {
            let err = create_answer_in_db(pool, alice.id, case).await.unwrap_err();
            assert!(matches!(err, RequestError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn listing_answers_of_unknown_question_is_empty() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        assert!(list_answers_for_question_in_db(pool, &new_resource_id())
            .await
            .unwrap()
            .is_empty());
        assert!(list_answers_for_question_in_db(pool, "garbage")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn only_owner_can_update_or_delete() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let bob = seed_user(pool, "bob").await;
        let q = question(pool, alice.id).await;
        let answer = create_answer_in_db(pool, bob.id, reply(&q.id, "Use flexbox"))
            .await
            .unwrap();

        let err = update_answer_in_db(
            pool,
            &answer.id,
            alice.id,
            UpdateAnswerRequest {
                body: Some("Use tables".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));
        let err = delete_answer_in_db(pool, &answer.id, alice.id)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let updated = update_answer_in_db(
            pool,
            &answer.id,
            bob.id,
            UpdateAnswerRequest {
                body: Some("Use grid".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.body, "Use grid");
        assert_eq!(updated.question_id, q.id);
        assert_eq!(updated.created_at, answer.created_at);

        delete_answer_in_db(pool, &answer.id, bob.id).await.unwrap();
        assert!(list_answers_for_question_in_db(pool, &q.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_requires_body() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let q = question(pool, alice.id).await;
        let answer = create_answer_in_db(pool, alice.id, reply(&q.id, "first"))
            .await
            .unwrap();
        let err = update_answer_in_db(pool, &answer.id, alice.id, UpdateAnswerRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Validation(_)));
    }

    #[tokio::test]
    async fn ownership_is_checked_before_body() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let bob = seed_user(pool, "bob").await;
        let q = question(pool, alice.id).await;
        let answer = create_answer_in_db(pool, alice.id, reply(&q.id, "first"))
            .await
            .unwrap();
        let err = update_answer_in_db(pool, &answer.id, bob.id, UpdateAnswerRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));
        let err = update_answer_in_db(pool, &new_resource_id(), bob.id, UpdateAnswerRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_answer_writes_all_succeed() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let bob = seed_user(pool, "bob").await;
        let q = question(pool, alice.id).await;
        let mut seeded = Vec::new();
        for n in 0..10 {
            let answer = create_answer_in_db(pool, bob.id, reply(&q.id, &format!("answer {n}")))
                .await
                .unwrap();
            seeded.push(answer.id);
        }

        let bob_id = bob.id;
        let mut tasks = Vec::new();
        for n in 0..60 {
            let pool = pool.clone();
            let question_id = q.id.clone();
            let answer_id = seeded[n % seeded.len()].clone();
            tasks.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    create_answer_in_db(&pool, bob_id, reply(&question_id, &format!("more {n}")))
                        .await
                        .map(|_| ())
                } else {
                    update_answer_in_db(
                        &pool,
                        &answer_id,
                        bob_id,
                        UpdateAnswerRequest {
                            body: Some(format!("edit {n}")),
                        },
                    )
                    .await
                    .map(|_| ())
                }
            }));
        }
        let mut failures = Vec::new();
        for task in tasks {
            if let Err(err) = task.await.unwrap() {
                failures.push(err.to_string());
            }
        }
        assert!(failures.is_empty(), "failed writes: {failures:?}");
        assert_eq!(
            list_answers_for_question_in_db(pool, &q.id).await.unwrap().len(),
            40
        );
    }

    #[tokio::test]
    async fn missing_answer_is_not_found() {
        let (store, _dir) = test_store().await;
        let pool = store.pool();
        let alice = seed_user(pool, "alice").await;
        let id = new_resource_id();
        assert!(matches!(
            update_answer_in_db(
                pool,
                &id,
                alice.id,
                UpdateAnswerRequest {
                    body: Some("x".to_string())
                }
            )
            .await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            delete_answer_in_db(pool, "nope", alice.id).await,
            Err(RequestError::NotFound(_))
        ));
    }
}
