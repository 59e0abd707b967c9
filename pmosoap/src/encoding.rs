//! Encodages annoncés dans la déclaration XML
//!
//! Les documents sont produits en `String` (UTF-8 en mémoire) ; l'encodage
//! ne sert qu'à l'étiquette `encoding="..."` de la déclaration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SoapError;

/// Encodage d'un document SOAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "UTF-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-16", alias = "UTF-16", alias = "utf16")]
    Utf16,
    #[serde(rename = "iso-8859-1", alias = "ISO-8859-1", alias = "latin1")]
    Iso8859_1,
    #[serde(rename = "us-ascii", alias = "US-ASCII", alias = "ascii")]
    UsAscii,
}

impl Encoding {
    /// Nom IANA en minuscules, tel qu'écrit dans la déclaration XML
    pub fn web_name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
            Self::Iso8859_1 => "iso-8859-1",
            Self::UsAscii => "us-ascii",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.web_name())
    }
}

impl FromStr for Encoding {
    type Err = SoapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16" | "utf16" => Ok(Self::Utf16),
            "iso-8859-1" | "latin1" => Ok(Self::Iso8859_1),
            "us-ascii" | "ascii" => Ok(Self::UsAscii),
            other => Err(SoapError::format(format!("unknown encoding {other:?}"))),
        }
    }
}
