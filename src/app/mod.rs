pub mod cache;
pub mod comment_tree;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod posts;

pub use error::{ServiceError, ServiceResult};

/// Identity of whoever issued a mutation, already validated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Caller {
    pub fn can_modify(&self, owner_id: i64) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Rejects blank text and text longer than `max_chars`.
pub(crate) fn validate_text(field: &str, value: &str, max_chars: usize) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > max_chars {
        return Err(ServiceError::validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(())
}
