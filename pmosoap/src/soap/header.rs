//! En-tête SOAP

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::trace;
use xmltree::Element;

use super::container::{SoapContainer, SoapContext, SoapPart, impl_soap_part};
use crate::binding::find_element;
use crate::config::get_config;
use crate::content::{Content, ContentType, parse_content};
use crate::encoding::Encoding;
use crate::error::{self, Result, SoapError};
use crate::namespaces::NamespaceSet;
use crate::serialize::{SerializeJson, SerializeXml, SerializeXmlFragment};
use crate::version::SoapVersion;

/// Élément `Header` d'une enveloppe
#[derive(Debug, Clone, Default)]
pub struct SoapHeader {
    pub(crate) container: SoapContainer,
}

impl_soap_part!(SoapHeader, container);

impl SoapHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<Content>) -> Self {
        Self {
            container: SoapContainer::with_content(Some(content.into())),
        }
    }

    /// En-tête avec contenu optionnel et namespaces transmis au contenu
    pub fn with_namespaces(content: Option<Content>, namespaces: &NamespaceSet) -> Self {
        let mut header = Self {
            container: SoapContainer::with_content(content),
        };
        header.container.state.set_namespaces(namespaces);
        header
    }

    /// Rendu `<prefix:Header>` dans le contexte du parent
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        let xml = self.container.serialize_content(ctx)?;
        Ok(self.container.enclose_in_element("Header", &xml, &ctx.prefix))
    }

    /// Recherche et lit l'en-tête de `document`.
    ///
    /// Un en-tête absent donne `Ok(None)`, ou une erreur
    /// [`SoapError::MissingRequiredPart`] si `throw_if_missing`.
    pub fn parse(
        document: &Element,
        types: &[ContentType],
        throw_if_missing: bool,
        target_namespace: Option<&str>,
    ) -> Result<Option<Self>> {
        let version = match target_namespace {
            Some(namespace) => SoapVersion::from_namespace(namespace)?,
            None => get_config().version()?,
        };
        let Some(element) = find_element(document, "Header", Some(version.namespace())) else {
            if throw_if_missing {
                return Err(SoapError::missing_part("Header"));
            }
            trace!(version=%version, "No SOAP Header");
            return Ok(None);
        };

        let mut header = Self {
            container: SoapContainer::with_content(parse_content(element, types)),
        };
        header.set_target_namespace(version.namespace());
        if let Some(prefix) = element.prefix.as_deref() {
            header.set_prefix(prefix);
        }
        Ok(Some(header))
    }

    /// Variante de [`SoapHeader::parse`] qui n'échoue pas
    pub fn try_parse(
        document: &Element,
        types: &[ContentType],
        target_namespace: Option<&str>,
    ) -> Option<Self> {
        error::swallow(Self::parse(document, types, false, target_namespace))
    }
}

impl SerializeXml for SoapHeader {
    fn serialize_xml(&mut self) -> Result<String> {
        let ctx = self.container.resolve_context(&get_config())?;
        let xml = self.container.serialize_content(&ctx)?;
        Ok(self.container.enclose_in_document("Header", &xml, &ctx))
    }
}

impl SerializeXmlFragment for SoapHeader {
    fn serialize_xml_fragment(
        &mut self,
        namespaces: &NamespaceSet,
        encoding: Encoding,
    ) -> Result<String> {
        self.container.state.set_namespaces(namespaces);
        let ctx = self
            .container
            .resolve_context(&get_config())?
            .with_encoding(encoding);
        self.serialize_with(&ctx)
    }
}

impl Serialize for SoapHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Header", 1)?;
        state.serialize_field("Content", &self.content())?;
        state.end()
    }
}

impl SerializeJson for SoapHeader {}
