//! Versions du protocole SOAP
//!
//! Une version est identifiée par le namespace de l'enveloppe. Seules deux
//! valeurs sont acceptées, toute autre est une erreur fatale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoapError};

/// Namespace de l'enveloppe SOAP 1.1
pub const SOAP11_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace de l'enveloppe SOAP 1.2
pub const SOAP12_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Version du protocole SOAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoapVersion {
    /// SOAP 1.1 : éléments de Fault non qualifiés, code et raison à plat
    V11,
    /// SOAP 1.2 : éléments de Fault qualifiés, Code et Reason structurés
    V12,
}

impl SoapVersion {
    /// Résout la version depuis un namespace cible.
    ///
    /// Le `/` final est ignoré, les deux URIs étant rencontrées avec et sans.
    pub fn from_namespace(uri: &str) -> Result<Self> {
        let trimmed = uri.trim().trim_end_matches('/');
        if trimmed == SOAP12_NAMESPACE.trim_end_matches('/') {
            Ok(Self::V12)
        } else if trimmed == SOAP11_NAMESPACE.trim_end_matches('/') {
            Ok(Self::V11)
        } else {
            Err(SoapError::UnsupportedVersion(uri.to_string()))
        }
    }

    /// Namespace de l'enveloppe pour cette version
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::V11 => SOAP11_NAMESPACE,
            Self::V12 => SOAP12_NAMESPACE,
        }
    }

    pub fn is_v12(&self) -> bool {
        matches!(self, Self::V12)
    }

    /// Nom de l'élément Detail du Fault
    pub fn detail_element(&self) -> &'static str {
        match self {
            Self::V11 => "detail",
            Self::V12 => "Detail",
        }
    }
}

impl Default for SoapVersion {
    fn default() -> Self {
        Self::V12
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V11 => write!(f, "SOAP 1.1"),
            Self::V12 => write!(f, "SOAP 1.2"),
        }
    }
}

/// Compare deux namespaces en tolérant un `/` final de part et d'autre
pub fn namespaces_match(actual: Option<&str>, expected: Option<&str>) -> bool {
    match (actual.filter(|s| !s.is_empty()), expected.filter(|s| !s.is_empty())) {
        (None, None) => true,
        (Some(a), Some(e)) => a.trim_end_matches('/') == e.trim_end_matches('/'),
        _ => false,
    }
}
