//! Codes de Fault SOAP 1.2 (`Code`, `Value`, `Subcode`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use xmltree::{Element, XMLNode};

use super::ElementForm;
use crate::binding::{child_elements, element_text};
use crate::error::{Result, SoapError};

/// Valeurs de `Code/Value` définies par SOAP 1.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCodeEnum {
    DataEncodingUnknown,
    MustUnderstand,
    Receiver,
    Sender,
    VersionMismatch,
}

impl FaultCodeEnum {
    pub const ALL: [FaultCodeEnum; 5] = [
        Self::DataEncodingUnknown,
        Self::MustUnderstand,
        Self::Receiver,
        Self::Sender,
        Self::VersionMismatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DataEncodingUnknown => "DataEncodingUnknown",
            Self::MustUnderstand => "MustUnderstand",
            Self::Receiver => "Receiver",
            Self::Sender => "Sender",
            Self::VersionMismatch => "VersionMismatch",
        }
    }

    /// Équivalent SOAP 1.1 (`Client`/`Server` pour `Sender`/`Receiver`)
    pub fn soap11_name(&self) -> &'static str {
        match self {
            Self::DataEncodingUnknown | Self::Sender => "Client",
            Self::Receiver => "Server",
            Self::MustUnderstand => "MustUnderstand",
            Self::VersionMismatch => "VersionMismatch",
        }
    }

    /// Lit un jeton `prefix:Name` : seul le dernier segment compte, comparé
    /// sans tenir compte de la casse.
    pub fn parse_token(token: &str) -> Result<Self> {
        let name = token.rsplit(':').next().unwrap_or(token).trim();
        Self::ALL
            .into_iter()
            .find(|code| code.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                SoapError::format(format!(
                    "{token:?} cannot be converted to a SOAP fault code"
                ))
            })
    }
}

impl fmt::Display for FaultCodeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FaultCodeEnum {
    type Err = SoapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_token(s)
    }
}

/// Chaîne récursive de sous-codes applicatifs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultSubcode {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcode: Option<Box<FaultSubcode>>,
}

impl FaultSubcode {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            subcode: None,
        }
    }

    pub fn with_subcode(mut self, subcode: FaultSubcode) -> Self {
        self.subcode = Some(Box::new(subcode));
        self
    }

    /// Profondeur de la chaîne (1 pour un sous-code sans enfant)
    pub fn depth(&self) -> usize {
        1 + self.subcode.as_ref().map_or(0, |sub| sub.depth())
    }

    pub(crate) fn to_element(&self, form: &ElementForm) -> Element {
        let mut element = form.element("Subcode");
        element
            .children
            .push(XMLNode::Element(form.text_element("Value", &self.value)));
        if let Some(subcode) = &self.subcode {
            element
                .children
                .push(XMLNode::Element(subcode.to_element(form)));
        }
        element
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let mut value = None;
        let mut subcode = None;
        for child in child_elements(element) {
            match child.name.as_str() {
                "Value" => value = Some(element_text(child).trim().to_string()),
                "Subcode" => subcode = Some(Box::new(Self::from_element(child)?)),
                other => {
                    debug!(element = %other, parent = "Subcode", "Unknown fault child, skipped")
                }
            }
        }
        Ok(Self {
            value: value.ok_or_else(|| SoapError::missing_part("Fault/Code/Subcode/Value"))?,
            subcode,
        })
    }
}

impl fmt::Display for FaultSubcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// `Code` d'un Fault SOAP 1.2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultCode {
    pub value: FaultCodeEnum,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcode: Option<FaultSubcode>,
}

impl FaultCode {
    pub fn new(value: FaultCodeEnum) -> Self {
        Self {
            value,
            subcode: None,
        }
    }

    pub fn with_subcode(mut self, subcode: FaultSubcode) -> Self {
        self.subcode = Some(subcode);
        self
    }

    /// Texte de `Value` : `prefix:Name`
    pub fn value_string(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.value)
    }

    /// Affecte la valeur depuis un jeton `prefix:Name` ; un jeton inconnu
    /// est une erreur immédiate et la valeur courante est conservée.
    pub fn set_value_str(&mut self, token: &str) -> Result<()> {
        self.value = FaultCodeEnum::parse_token(token)?;
        Ok(())
    }

    pub(crate) fn to_element(&self, form: &ElementForm) -> Element {
        let mut element = form.element("Code");
        element.children.push(XMLNode::Element(
            form.text_element("Value", &self.value_string(form.prefix)),
        ));
        if let Some(subcode) = &self.subcode {
            element
                .children
                .push(XMLNode::Element(subcode.to_element(form)));
        }
        element
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let mut value = None;
        let mut subcode = None;
        for child in child_elements(element) {
            match child.name.as_str() {
                "Value" => value = Some(FaultCodeEnum::parse_token(&element_text(child))?),
                "Subcode" => subcode = Some(FaultSubcode::from_element(child)?),
                other => {
                    debug!(element = %other, parent = "Code", "Unknown fault child, skipped")
                }
            }
        }
        Ok(Self {
            value: value.ok_or_else(|| SoapError::missing_part("Fault/Code/Value"))?,
            subcode,
        })
    }
}

impl From<FaultCodeEnum> for FaultCode {
    fn from(value: FaultCodeEnum) -> Self {
        Self::new(value)
    }
}
