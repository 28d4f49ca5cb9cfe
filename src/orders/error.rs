// Item-level rejections raised while re-validating a cart against the live menu

use crate::error::{ErrorKind, ServiceError};

pub const ITEMS_INVALID_MESSAGE: &str = "Certains articles ne sont pas disponibles";

/// Why one cart line cannot be ordered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemRejection {
    #[error("Article \"{name}\" non trouvé")]
    NotFound { name: String },

    #[error("Article \"{name}\" indisponible")]
    Unavailable { name: String },

    #[error("Variante \"{variant}\" inconnue pour l'article \"{name}\"")]
    UnknownVariant { name: String, variant: String },

    #[error("Option \"{option}\" inconnue pour l'article \"{name}\"")]
    UnknownOption { name: String, option: String },
}

/// Aggregate every rejected line into one validation error
pub fn items_rejected(rejections: &[ItemRejection]) -> ServiceError {
    ServiceError::with_details(
        ITEMS_INVALID_MESSAGE,
        ErrorKind::Validation,
        rejections.iter().map(ToString::to_string).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        let missing = ItemRejection::NotFound { name: "Ghost Item".to_string() };
        assert_eq!(missing.to_string(), "Article \"Ghost Item\" non trouvé");

        let off = ItemRejection::Unavailable { name: "Yassa".to_string() };
        assert_eq!(off.to_string(), "Article \"Yassa\" indisponible");
    }

    #[test]
    fn test_rejections_aggregate_in_order() {
        let err = items_rejected(&[
            ItemRejection::Unavailable { name: "A".to_string() },
            ItemRejection::NotFound { name: "B".to_string() },
        ]);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, ITEMS_INVALID_MESSAGE);
        assert_eq!(
            err.details.unwrap(),
            vec!["Article \"A\" indisponible".to_string(), "Article \"B\" non trouvé".to_string()]
        );
    }
}
