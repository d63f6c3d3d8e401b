use uuid::Uuid;

use crate::{errors::RequestError, models::UserId};

mod answer_helpers;
mod question_helpers;
mod user_helpers;

pub use answer_helpers::*;
pub use question_helpers::*;
pub use user_helpers::*;

/// Builds `column = ?n` lists for partial updates, numbering binds in order.
/// A `None` param binds SQL `NULL`.
struct QueryBuilder {
    query: String,
    params: Vec<Option<String>>,
    seperator: &'static str,
    counter: usize,
}

impl QueryBuilder {
    fn new(initial: &str, seperator: &'static str) -> Self {
        Self {
            query: initial.to_owned(),
            params: vec![],
            seperator,
            counter: 0,
        }
    }

    fn add_param(self, column: &str, param: Option<String>) -> Self {
        self.add_nullable_param(column, param.map(Some))
    }

    /// `Some(None)` assigns `NULL`, `None` leaves the column out.
    fn add_nullable_param(mut self, column: &str, param: Option<Option<String>>) -> Self {
        if let Some(value) = param {
            if self.counter > 0 {
                self.query.push_str(self.seperator);
            }
            self.query
                .push_str(&format!("{} = ?{}", column, self.params.len() + 1));
            self.params.push(value);
            self.counter += 1;
        }
        self
    }

    /// Appends a trailing clause such as ` WHERE id = ` with its own bind.
    fn add_clause(mut self, clause: &str, value: String) -> Self {
        self.query
            .push_str(&format!("{}?{}", clause, self.params.len() + 1));
        self.params.push(Some(value));
        self
    }

    fn has_assignments(&self) -> bool {
        self.counter > 0
    }

    fn build(self) -> (String, Vec<Option<String>>) {
        (self.query, self.params)
    }
}

/// Question and answer ids are v4 UUIDs; anything else cannot name a row.
pub(crate) fn parse_resource_id(raw: &str) -> Option<String> {
    Uuid::parse_str(raw.trim()).ok().map(|id| id.to_string())
}

pub(crate) fn new_resource_id() -> String {
    Uuid::new_v4().to_string()
}

/// Mutations are only allowed to the user that created the resource.
pub(crate) fn ensure_owner(
    owner_id: UserId,
    caller_id: UserId,
    message: &'static str,
) -> Result<(), RequestError> {
    if owner_id != caller_id {
        tracing::debug!(owner_id, caller_id, "ownership check failed");
        return Err(RequestError::Forbidden(message));
    }
    Ok(())
}

/// Explains an owner-guarded write (`... WHERE id = ? AND user_id = ?`) that
/// touched no rows: either the row is gone or it belongs to someone else.
pub(crate) fn guarded_write_miss(
    owner_id: Option<UserId>,
    caller_id: UserId,
    not_found: &'static str,
    forbidden: &'static str,
) -> RequestError {
    match owner_id {
        Some(owner_id) => {
            tracing::debug!(owner_id, caller_id, "ownership check failed");
            RequestError::Forbidden(forbidden)
        }
        None => RequestError::NotFound(not_found),
    }
}

pub(crate) fn required_text(
    value: Option<String>,
    message: &'static str,
) -> Result<String, RequestError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RequestError::Validation(message)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_skips_missing_params() {
        let (query, params) = QueryBuilder::new("UPDATE questions SET ", ", ")
            .add_param("title", Some("New".to_string()))
            .add_param("description", None)
            .add_param("tag", Some("CSS".to_string()))
            .add_clause(" WHERE id = ", "abc".to_string())
            .build();
        assert_eq!(
            query,
            "UPDATE questions SET title = ?1, tag = ?2 WHERE id = ?3"
        );
        assert_eq!(
            params,
            vec![
                Some("New".to_string()),
                Some("CSS".to_string()),
                Some("abc".to_string())
            ]
        );
    }

    #[test]
    fn query_builder_binds_null_for_cleared_columns() {
        let (query, params) = QueryBuilder::new("UPDATE questions SET ", ", ")
            .add_param("title", None)
            .add_nullable_param("description", None)
            .add_nullable_param("tag", Some(None))
            .add_clause(" WHERE id = ", "abc".to_string())
            .build();
        assert_eq!(query, "UPDATE questions SET tag = ?1 WHERE id = ?2");
        assert_eq!(params, vec![None, Some("abc".to_string())]);
    }

    #[test]
    fn query_builder_reports_empty_assignment_list() {
        let builder = QueryBuilder::new("UPDATE questions SET ", ", ").add_param("title", None);
        assert!(!builder.has_assignments());
    }

    #[test]
    fn resource_ids_are_normalized_uuids() {
        let id = new_resource_id();
        assert_eq!(parse_resource_id(&id.to_uppercase()), Some(id));
        assert_eq!(parse_resource_id("42"), None);
    }

    #[test]
    fn ownership_compares_numeric_ids() {
        assert!(ensure_owner(1, 1, "nope").is_ok());
        assert!(matches!(
            ensure_owner(1, 2, "nope"),
            Err(RequestError::Forbidden("nope"))
        ));
    }

    #[test]
    fn missed_guarded_write_distinguishes_missing_from_foreign() {
        assert!(matches!(
            guarded_write_miss(None, 1, "gone", "not yours"),
            RequestError::NotFound("gone")
        ));
        assert!(matches!(
            guarded_write_miss(Some(2), 1, "gone", "not yours"),
            RequestError::Forbidden("not yours")
        ));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(required_text(Some("  ".to_string()), "missing").is_err());
        assert!(required_text(None, "missing").is_err());
        assert_eq!(required_text(Some("x".to_string()), "missing").unwrap(), "x");
    }
}
