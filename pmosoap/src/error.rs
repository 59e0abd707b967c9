//! Gestion des erreurs pour pmosoap

use std::cell::RefCell;
use thiserror::Error;

use crate::version::SoapVersion;

/// Type Result personnalisé pour pmosoap
pub type Result<T> = std::result::Result<T, SoapError>;

/// Erreurs possibles lors de la construction, de la sérialisation
/// ou du parsing d'un message SOAP
#[derive(Error, Debug)]
pub enum SoapError {
    /// Valeur mal formée (code de fault inconnu, fragment XML invalide, ...)
    #[error("Format error: {0}")]
    Format(String),

    /// Partie obligatoire absente (Body à la sérialisation ou au parsing)
    #[error("Missing required part: {0}")]
    MissingRequiredPart(String),

    /// Namespace cible qui n'est ni SOAP 1.1 ni SOAP 1.2
    #[error("Unsupported SOAP version (target namespace {0:?})")]
    UnsupportedVersion(String),

    /// Fault d'une version placé dans un message d'une autre version
    #[error("SOAP version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        expected: SoapVersion,
        found: SoapVersion,
    },

    /// Le document ne correspond pas au type demandé
    #[error("The XML document cannot be deserialized to an instance of {0}")]
    CannotDeserialize(String),

    /// Erreur de parsing XML (arbre)
    #[error("XML parse error: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    /// Erreur d'écriture XML (arbre)
    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),

    /// Erreur de sérialisation XML (serde)
    #[error("XML serialization error: {0}")]
    Serialize(#[from] quick_xml::se::SeError),

    /// Erreur de désérialisation XML (serde)
    #[error("XML deserialization error: {0}")]
    Deserialize(#[from] quick_xml::de::DeError),

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur de configuration
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl SoapError {
    /// Crée une erreur de partie manquante
    pub fn missing_part(part: impl Into<String>) -> Self {
        Self::MissingRequiredPart(part.into())
    }

    /// Crée une erreur de format
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Vérifie si l'erreur signale une partie obligatoire manquante
    pub fn is_missing_part(&self) -> bool {
        matches!(self, Self::MissingRequiredPart(_))
    }

    /// Vérifie si l'erreur est liée à la version du protocole
    pub fn is_version_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion(_) | Self::VersionMismatch { .. }
        )
    }
}

thread_local! {
    static LAST_PARSE_ERROR: RefCell<Option<SoapError>> = const { RefCell::new(None) };
}

/// Mémorise l'échec d'une variante `try_*` pour diagnostic
pub(crate) fn record_parse_error(error: SoapError) {
    tracing::warn!(error = %error, "SOAP parse failed");
    LAST_PARSE_ERROR.with(|slot| *slot.borrow_mut() = Some(error));
}

/// Récupère (et efface) la dernière erreur avalée par une variante `try_*`
/// sur le thread courant.
pub fn take_last_parse_error() -> Option<SoapError> {
    LAST_PARSE_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Convertit un `Result` en `Option` en mémorisant l'erreur éventuelle
pub(crate) fn swallow<T>(result: Result<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            record_parse_error(e);
            None
        }
    }
}
