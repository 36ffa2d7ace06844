use crate::types::DbId;

/// Domain error shared by every crate in the workspace.
///
/// The HTTP layer maps each variant onto a status code; background code
/// logs them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No template exists for the requested slug.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but has been switched off by an operator.
    #[error("Template is inactive: {0}")]
    TemplateInactive(String),

    /// Unknown operator action on the queue monitor.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "Report",
            id: 7,
        };
        assert_eq!(err.to_string(), "Entity not found: Report with id 7");
    }

    #[test]
    fn template_errors_carry_slug() {
        assert_eq!(
            CoreError::TemplateNotFound("welcome".into()).to_string(),
            "Template not found: welcome"
        );
        assert_eq!(
            CoreError::TemplateInactive("welcome".into()).to_string(),
            "Template is inactive: welcome"
        );
    }
}
