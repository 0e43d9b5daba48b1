use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TmError {
    /// Malformed construction input (empty names, unknown references).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A write was attempted on a locked property. Carries the property type name.
    #[error("Property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// Structurally invalid edit, e.g. adding a child to a rule leaf.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A rule leaf needs a capability the evaluated identity does not have.
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Object not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TmError>;

/// Rejects empty or whitespace-only names.
pub(crate) fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TmError::Validation(format!("{} name cannot be empty", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_name_rejects_blank() {
        assert!(matches!(
            require_name("Property type", "   "),
            Err(TmError::Validation(_))
        ));
        assert!(require_name("Property type", "Owner").is_ok());
    }

    #[test]
    fn read_only_message_names_the_property() {
        let err = TmError::ReadOnlyProperty("Owner".into());
        assert_eq!(err.to_string(), "Property 'Owner' is read-only");
    }
}
