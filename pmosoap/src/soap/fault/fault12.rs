//! Fault SOAP 1.2
//!
//! `Code` et `Reason` sont structurés et tous les enfants sont qualifiés par
//! le préfixe SOAP. Au parsing, les enfants d'extension sont ignorés.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;
use xmltree::{Element, XMLNode};

use super::{
    ElementForm, FaultCode, FaultCodeEnum, FaultReason, ReasonText, SoapFaultBase, extract_detail,
};
use crate::binding::{self, child_elements, element_text};
use crate::content::{Content, ContentType};
use crate::encoding::Encoding;
use crate::error::{self, Result, SoapError};
use crate::namespaces::NamespaceSet;
use crate::serialize::{SerializeJson, SerializeXml, SerializeXmlFragment};
use crate::soap::container::{SoapContext, impl_soap_part};
use crate::version::SoapVersion;

/// Fault SOAP 1.2
#[derive(Debug, Clone)]
pub struct SoapFault {
    pub(crate) base: SoapFaultBase,
    pub code: FaultCode,
    pub reason: FaultReason,
    pub node: Option<String>,
    pub role: Option<String>,
}

impl_soap_part!(SoapFault, base.container);

impl SoapFault {
    pub fn new(
        code: impl Into<FaultCode>,
        reasons: impl IntoIterator<Item = impl Into<ReasonText>>,
    ) -> Self {
        Self {
            base: SoapFaultBase::new(),
            code: code.into(),
            reason: FaultReason::new(reasons),
            node: None,
            role: None,
        }
    }

    pub fn with_detail(mut self, detail: Content) -> Self {
        self.base.set_detail(Some(detail));
        self
    }

    pub fn set_code(&mut self, code: impl Into<FaultCode>) -> &mut Self {
        self.code = code.into();
        self
    }

    pub fn set_reason(&mut self, reason: FaultReason) -> &mut Self {
        self.reason = reason;
        self
    }

    pub fn set_node(&mut self, node: impl Into<String>) -> &mut Self {
        self.node = Some(node.into());
        self
    }

    pub fn set_role(&mut self, role: impl Into<String>) -> &mut Self {
        self.role = Some(role.into());
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

    pub fn fault_code(&self) -> FaultCodeEnum {
        self.code.value
    }

    fn to_element(&mut self, ctx: &SoapContext) -> Result<Element> {
        let form = ElementForm::qualified(&ctx.prefix, ctx.namespace());
        let mut fault = form.fault_element();
        fault
            .children
            .push(XMLNode::Element(self.code.to_element(&form)));
        fault
            .children
            .push(XMLNode::Element(self.reason.to_element(&form)?));
        if let Some(node) = &self.node {
            fault
                .children
                .push(XMLNode::Element(form.text_element("Node", node)));
        }
        if let Some(role) = &self.role {
            fault
                .children
                .push(XMLNode::Element(form.text_element("Role", role)));
        }
        if let Some(detail) = self.base.detail_element(ctx)? {
            fault.children.push(XMLNode::Element(detail));
        }
        Ok(fault)
    }

    fn check_version(ctx: &SoapContext) -> Result<()> {
        if ctx.version != SoapVersion::V12 {
            return Err(SoapError::VersionMismatch {
                expected: ctx.version,
                found: SoapVersion::V12,
            });
        }
        Ok(())
    }

    /// Rendu de l'élément `Fault` avec sa déclaration de préfixe
    fn render(&mut self, ctx: &SoapContext) -> Result<String> {
        Self::check_version(ctx)?;
        let element = self.to_element(ctx)?;
        binding::element_to_string(&element)
    }

    /// Rendu embarquable : la déclaration de préfixe de `Fault` est retirée,
    /// l'enveloppe la portant déjà.
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        let xml = self.render(ctx)?;
        Ok(binding::strip_element_attributes(&xml, "Fault", Some(&ctx.prefix)))
    }

    /// Lit un élément `Fault` SOAP 1.2.
    ///
    /// Le `Detail` est retiré puis résolu contre `detail_types` (à défaut
    /// [`ServerFault`](super::ServerFault)). Les enfants inconnus sont ignorés ;
    /// `Code` et `Reason` sont obligatoires.
    pub fn parse_element(element: &Element, detail_types: &[ContentType]) -> Result<Self> {
        let (stripped, detail) = extract_detail(element, SoapVersion::V12, detail_types);

        let mut code = None;
        let mut reason = None;
        let mut node = None;
        let mut role = None;
        for child in child_elements(&stripped) {
            match child.name.as_str() {
                "Code" => code = Some(FaultCode::from_element(child)?),
                "Reason" => reason = Some(FaultReason::from_element(child)?),
                "Node" => node = Some(element_text(child)),
                "Role" => role = Some(element_text(child)),
                other => {
                    debug!(element = %other, parent = "Fault", "Unknown fault child, skipped")
                }
            }
        }

        let mut fault = Self {
            base: SoapFaultBase::with_detail(detail),
            code: code.ok_or_else(|| SoapError::missing_part("Fault/Code"))?,
            reason: reason.ok_or_else(|| SoapError::missing_part("Fault/Reason"))?,
            node,
            role,
        };
        fault
            .base
            .container
            .set_target_namespace(SoapVersion::V12.namespace());
        if let Some(prefix) = element.prefix.as_deref() {
            fault.base.container.set_prefix(prefix);
        }
        Ok(fault)
    }

    /// Variante de [`SoapFault::parse_element`] qui n'échoue pas
    pub fn try_parse_element(element: &Element, detail_types: &[ContentType]) -> Option<Self> {
        error::swallow(Self::parse_element(element, detail_types).map(Some))
    }
}

impl SerializeXml for SoapFault {
    fn serialize_xml(&mut self) -> Result<String> {
        let ctx = self.base.standalone_context(SoapVersion::V12)?;
        let xml = self.render(&ctx)?;
        Ok(format!(
            r#"<?xml version="1.0" encoding="{}"?>{}"#,
            ctx.encoding.web_name(),
            xml
        ))
    }
}

impl SerializeXmlFragment for SoapFault {
    fn serialize_xml_fragment(
        &mut self,
        namespaces: &NamespaceSet,
        encoding: Encoding,
    ) -> Result<String> {
        self.base.container.state.set_namespaces(namespaces);
        let ctx = self
            .base
            .standalone_context(SoapVersion::V12)?
            .with_encoding(encoding);
        self.serialize_with(&ctx)
    }
}

impl Serialize for SoapFault {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Fault", 5)?;
        state.serialize_field("Code", &self.code)?;
        state.serialize_field("Reason", &self.reason)?;
        if let Some(node) = &self.node {
            state.serialize_field("Node", node)?;
        }
        if let Some(role) = &self.role {
            state.serialize_field("Role", role)?;
        }
        if let Some(detail) = self.base.detail() {
            state.serialize_field("Detail", detail)?;
        }
        state.end()
    }
}

impl SerializeJson for SoapFault {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::fault::{FaultSubcode, ServerFault};
    use crate::version::SOAP12_NAMESPACE;

    fn ctx() -> SoapContext {
        SoapContext::new(SoapVersion::V12, "soap", Encoding::Utf8)
    }

    fn bad_request() -> SoapFault {
        SoapFault::new(FaultCodeEnum::Sender, [("Bad request", "en")])
    }

    #[test]
    fn test_literal_fault() {
        let xml = bad_request().serialize_with(&ctx()).unwrap();
        assert_eq!(
            xml,
            r#"<soap:Fault><soap:Code><soap:Value>soap:Sender</soap:Value></soap:Code><soap:Reason><soap:Text xml:lang="en">Bad request</soap:Text></soap:Reason></soap:Fault>"#
        );
    }

    #[test]
    fn test_render_keeps_declaration() {
        let xml = bad_request().render(&ctx()).unwrap();
        assert!(xml.starts_with(&format!(r#"<soap:Fault xmlns:soap="{SOAP12_NAMESPACE}">"#)));
    }

    #[test]
    fn test_optional_children_order() {
        let mut fault = bad_request();
        fault
            .set_node("http://example.org/node")
            .set_role("http://example.org/role")
            .set_detail(Some(Content::object(ServerFault::new("E", "boom", None))));
        let xml = fault.serialize_with(&ctx()).unwrap();

        let reason = xml.find("<soap:Reason>").unwrap();
        let node = xml.find("<soap:Node>").unwrap();
        let role = xml.find("<soap:Role>").unwrap();
        let detail = xml.find("<soap:Detail>").unwrap();
        assert!(reason < node && node < role && role < detail);
        assert!(xml.contains("<ServerFault><ExceptionType>E</ExceptionType>"));
        assert!(!xml.contains("faultcode"));
        assert_eq!(xml.matches("xmlns:soap").count(), 0);
    }

    #[test]
    fn test_empty_reason_is_rejected() {
        let mut fault = SoapFault::new(FaultCodeEnum::Sender, Vec::<ReasonText>::new());
        assert!(fault.serialize_with(&ctx()).unwrap_err().is_missing_part());
    }

    #[test]
    fn test_wrong_context_version() {
        let ctx = SoapContext::new(SoapVersion::V11, "soap", Encoding::Utf8);
        assert!(bad_request().serialize_with(&ctx).unwrap_err().is_version_error());
    }

    #[test]
    fn test_parse_round_trip() {
        let mut fault = SoapFault::new(
            FaultCode::new(FaultCodeEnum::Sender).with_subcode(FaultSubcode::new("m:Timeout")),
            [("Bad request", "en"), ("Requête invalide", "fr")],
        );
        fault
            .set_role("urn:role")
            .set_detail(Some(Content::object(ServerFault::new("E", "boom", None))));
        let xml = fault.render(&ctx()).unwrap();

        let element = binding::parse_document(&xml).unwrap();
        let parsed = SoapFault::parse_element(&element, &[]).unwrap();
        assert_eq!(parsed.code, fault.code);
        assert_eq!(parsed.reason, fault.reason);
        assert_eq!(parsed.role.as_deref(), Some("urn:role"));
        assert_eq!(parsed.node, None);
        assert_eq!(
            parsed.detail_as::<ServerFault>().unwrap().exception_message.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_parse_requires_code() {
        let xml = format!(
            r#"<soap:Fault xmlns:soap="{SOAP12_NAMESPACE}"><soap:Reason><soap:Text xml:lang="en">x</soap:Text></soap:Reason></soap:Fault>"#
        );
        let element = binding::parse_document(&xml).unwrap();
        assert!(SoapFault::parse_element(&element, &[]).unwrap_err().is_missing_part());
        assert!(SoapFault::try_parse_element(&element, &[]).is_none());
    }

    #[test]
    fn test_parse_skips_extension_children() {
        let xml = format!(
            r#"<soap:Fault xmlns:soap="{SOAP12_NAMESPACE}" xmlns:x="urn:x"><soap:Code><soap:Value>soap:Sender</soap:Value><soap:Subcode><soap:Value>m:Quota</soap:Value><x:Hint>retry</x:Hint></soap:Subcode></soap:Code><soap:Reason><soap:Text xml:lang="en">x</soap:Text><x:Note/></soap:Reason><x:Trace>1</x:Trace></soap:Fault>"#
        );
        let element = binding::parse_document(&xml).unwrap();
        let fault = SoapFault::parse_element(&element, &[]).unwrap();
        assert_eq!(fault.fault_code(), FaultCodeEnum::Sender);
        assert_eq!(fault.code.subcode.as_ref().unwrap().value, "m:Quota");
        assert_eq!(fault.reason.texts().len(), 1);
    }

    #[test]
    fn test_parse_bad_code_token() {
        let xml = format!(
            r#"<soap:Fault xmlns:soap="{SOAP12_NAMESPACE}"><soap:Code><soap:Value>soap:Client</soap:Value></soap:Code></soap:Fault>"#
        );
        let element = binding::parse_document(&xml).unwrap();
        let err = SoapFault::parse_element(&element, &[]).unwrap_err();
        assert!(matches!(err, SoapError::Format(_)));
    }

    #[test]
    fn test_json() {
        let json = bad_request().serialize_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Code"]["Value"], "Sender");
        assert_eq!(value["Reason"][0]["Lang"], "en");
    }
}
