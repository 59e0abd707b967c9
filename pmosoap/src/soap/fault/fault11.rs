//! Fault SOAP 1.1 (`faultcode`, `faultstring`, `faultactor`, `detail`)
//!
//! Forme à plat, enfants non qualifiés dans un ordre fixe.

use serde::{Deserialize, Serialize};
use tracing::debug;
use xmltree::{Element, XMLNode};

use super::{ElementForm, FaultCodeEnum, SoapFaultBase, extract_detail};
use crate::binding::{self, child_elements, element_text};
use crate::config::get_config;
use crate::content::{Content, ContentType};
use crate::encoding::Encoding;
use crate::error::{self, Result, SoapError};
use crate::namespaces::NamespaceSet;
use crate::serialize::{SerializeJson, SerializeXml, SerializeXmlFragment};
use crate::soap::container::{SoapContext, impl_soap_part};
use crate::version::SoapVersion;

/// Fault SOAP 1.1 : champs plats non qualifiés
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoapFault11 {
    #[serde(skip)]
    pub(crate) base: SoapFaultBase,
    pub faultcode: String,
    pub faultstring: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faultactor: Option<String>,
}

impl_soap_part!(SoapFault11, base.container);

impl SoapFault11 {
    pub fn new(faultcode: impl Into<String>, faultstring: impl Into<String>) -> Self {
        Self {
            base: SoapFaultBase::new(),
            faultcode: faultcode.into(),
            faultstring: faultstring.into(),
            faultactor: None,
        }
    }

    /// `faultcode` construit à partir d'un code SOAP 1.2 (`Sender` devient
    /// `soap:Client`, `Receiver` devient `soap:Server`)
    pub fn from_code(code: FaultCodeEnum, faultstring: impl Into<String>) -> Self {
        let config = get_config();
        Self::new(
            format!("{}:{}", config.prefix(), code.soap11_name()),
            faultstring,
        )
    }

    pub fn with_detail(mut self, detail: Content) -> Self {
        self.base.set_detail(Some(detail));
        self
    }

    pub fn set_faultcode(&mut self, faultcode: impl Into<String>) -> &mut Self {
        self.faultcode = faultcode.into();
        self
    }

    pub fn set_faultstring(&mut self, faultstring: impl Into<String>) -> &mut Self {
        self.faultstring = faultstring.into();
        self
    }

    pub fn set_faultactor(&mut self, faultactor: impl Into<String>) -> &mut Self {
        self.faultactor = Some(faultactor.into());
        self
    }

    pub fn set_detail(&mut self, detail: Option<Content>) -> &mut Self {
        self.base.set_detail(detail);
        self
    }

    pub fn detail(&self) -> Option<&Content> {
        self.base.detail()
    }

    pub fn detail_as<T: 'static>(&self) -> Option<&T> {
        self.base.detail_as::<T>()
    }

    /// Code SOAP 1.2 équivalent au `faultcode`, s'il est reconnu
    pub fn code(&self) -> Option<FaultCodeEnum> {
        let name = self.faultcode.rsplit(':').next().unwrap_or(&self.faultcode);
        match name.trim().to_ascii_lowercase().as_str() {
            "client" => Some(FaultCodeEnum::Sender),
            "server" => Some(FaultCodeEnum::Receiver),
            _ => FaultCodeEnum::parse_token(name).ok(),
        }
    }

    fn to_element(&mut self, ctx: &SoapContext) -> Result<Element> {
        let form = ElementForm::unqualified(&ctx.prefix, ctx.namespace());
        let mut fault = form.fault_element();
        fault.children.push(XMLNode::Element(
            form.text_element("faultcode", &self.faultcode),
        ));
        fault.children.push(XMLNode::Element(
            form.text_element("faultstring", &self.faultstring),
        ));
        if let Some(actor) = &self.faultactor {
            fault
                .children
                .push(XMLNode::Element(form.text_element("faultactor", actor)));
        }
        if let Some(detail) = self.base.detail_element(ctx)? {
            fault.children.push(XMLNode::Element(detail));
        }
        Ok(fault)
    }

    fn render(&mut self, ctx: &SoapContext) -> Result<String> {
        if ctx.version != SoapVersion::V11 {
            return Err(SoapError::VersionMismatch {
                expected: ctx.version,
                found: SoapVersion::V11,
            });
        }
        let element = self.to_element(ctx)?;
        binding::element_to_string(&element)
    }

    /// Rendu embarquable, sans déclaration de préfixe sur `Fault`
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        let xml = self.render(ctx)?;
        Ok(binding::strip_element_attributes(&xml, "Fault", Some(&ctx.prefix)))
    }

    /// Lit un élément `Fault` SOAP 1.1 ; `faultcode` et `faultstring` sont
    /// obligatoires.
    pub fn parse_element(element: &Element, detail_types: &[ContentType]) -> Result<Self> {
        let (stripped, detail) = extract_detail(element, SoapVersion::V11, detail_types);

        let mut faultcode = None;
        let mut faultstring = None;
        let mut faultactor = None;
        for child in child_elements(&stripped) {
            match child.name.as_str() {
                "faultcode" => faultcode = Some(element_text(child).trim().to_string()),
                "faultstring" => faultstring = Some(element_text(child)),
                "faultactor" => faultactor = Some(element_text(child)),
                other => {
                    debug!(element = %other, parent = "Fault", "Unknown fault child, skipped")
                }
            }
        }

        let mut fault = Self {
            base: SoapFaultBase::with_detail(detail),
            faultcode: faultcode.ok_or_else(|| SoapError::missing_part("Fault/faultcode"))?,
            faultstring: faultstring
                .ok_or_else(|| SoapError::missing_part("Fault/faultstring"))?,
            faultactor,
        };
        fault
            .base
            .container
            .set_target_namespace(SoapVersion::V11.namespace());
        if let Some(prefix) = element.prefix.as_deref() {
            fault.base.container.set_prefix(prefix);
        }
        Ok(fault)
    }

    pub fn try_parse_element(element: &Element, detail_types: &[ContentType]) -> Option<Self> {
        error::swallow(Self::parse_element(element, detail_types).map(Some))
    }
}

impl SerializeXml for SoapFault11 {
    fn serialize_xml(&mut self) -> Result<String> {
        let ctx = self.base.standalone_context(SoapVersion::V11)?;
        let xml = self.render(&ctx)?;
        Ok(format!(
            r#"<?xml version="1.0" encoding="{}"?>{}"#,
            ctx.encoding.web_name(),
            xml
        ))
    }
}

impl SerializeXmlFragment for SoapFault11 {
    fn serialize_xml_fragment(
        &mut self,
        namespaces: &NamespaceSet,
        encoding: Encoding,
    ) -> Result<String> {
        self.base.container.state.set_namespaces(namespaces);
        let ctx = self
            .base
            .standalone_context(SoapVersion::V11)?
            .with_encoding(encoding);
        self.serialize_with(&ctx)
    }
}

impl SerializeJson for SoapFault11 {}
