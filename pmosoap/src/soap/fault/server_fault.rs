use serde::{Deserialize, Serialize};

use crate::content::ContentType;

/// Détail générique d'un Fault côté serveur
///
/// C'est le type candidat par défaut du `Detail` lorsque l'appelant n'en
/// fournit aucun.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ServerFault", rename_all = "PascalCase")]
pub struct ServerFault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ServerFault {
    pub fn new(
        exception_type: impl Into<String>,
        exception_message: impl Into<String>,
        stack_trace: Option<String>,
    ) -> Self {
        Self {
            exception_type: Some(exception_type.into()),
            exception_message: Some(exception_message.into()),
            stack_trace,
        }
    }

    /// Construit le détail à partir d'une erreur Rust et de sa chaîne de causes
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            exception_type: Some(std::any::type_name::<E>().to_string()),
            exception_message: Some(error.to_string()),
            stack_trace: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    pub fn content_type() -> ContentType {
        ContentType::of::<ServerFault>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding;
    use crate::error::SoapError;
    use crate::namespaces::NamespaceSet;

    #[test]
    fn test_xml_shape() {
        let fault = ServerFault::new("IoError", "disk full", None);
        let xml = binding::serialize_fragment(&fault, &NamespaceSet::new()).unwrap();
        assert_eq!(
            xml,
            "<ServerFault><ExceptionType>IoError</ExceptionType><ExceptionMessage>disk full</ExceptionMessage></ServerFault>"
        );
        let back: ServerFault = binding::deserialize_fragment(&xml).unwrap();
        assert_eq!(back, fault);
    }

    #[test]
    fn test_from_error() {
        let err = SoapError::missing_part("Body");
        let fault = ServerFault::from_error(&err);
        assert!(fault.exception_message.unwrap().contains("Body"));
        assert!(fault.stack_trace.is_none());
        assert!(fault.exception_type.unwrap().ends_with("SoapError"));
    }
}
