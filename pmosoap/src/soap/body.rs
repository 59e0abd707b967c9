//! Corps SOAP : contenu applicatif et/ou Fault

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::trace;
use xmltree::{Element, XMLNode};

use super::container::{SoapContainer, SoapContext, SoapPart, impl_soap_part};
use super::fault::Fault;
use crate::binding::find_element;
use crate::config::get_config;
use crate::content::{Content, ContentType, parse_content};
use crate::encoding::Encoding;
use crate::error::{self, Result, SoapError};
use crate::namespaces::NamespaceSet;
use crate::serialize::{SerializeJson, SerializeXml, SerializeXmlFragment};
use crate::version::{SoapVersion, namespaces_match};

/// Élément `Body` d'une enveloppe
///
/// Un corps sans contenu ni Fault ne peut pas être sérialisé.
#[derive(Debug, Clone, Default)]
pub struct SoapBody {
    pub(crate) container: SoapContainer,
    fault: Option<Fault>,
}

impl_soap_part!(SoapBody, container);

impl SoapBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<Content>) -> Self {
        Self {
            container: SoapContainer::with_content(Some(content.into())),
            fault: None,
        }
    }

    pub fn with_fault(fault: impl Into<Fault>) -> Self {
        Self {
            container: SoapContainer::new(),
            fault: Some(fault.into()),
        }
    }

    /// Corps avec contenu optionnel et namespaces transmis au contenu
    pub fn with_namespaces(content: Option<Content>, namespaces: &NamespaceSet) -> Self {
        let mut body = Self {
            container: SoapContainer::with_content(content),
            fault: None,
        };
        body.container.state.set_namespaces(namespaces);
        body
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn fault_mut(&mut self) -> Option<&mut Fault> {
        self.fault.as_mut()
    }

    pub fn set_fault(&mut self, fault: Option<Fault>) -> &mut Self {
        self.fault = fault;
        self
    }

    pub fn take_fault(&mut self) -> Option<Fault> {
        self.fault.take()
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    fn render_inner(&mut self, ctx: &SoapContext) -> Result<String> {
        if self.container.content.is_none() && self.fault.is_none() {
            return Err(SoapError::missing_part("Body content or Fault"));
        }
        let mut xml = self.container.serialize_content(ctx)?;
        if let Some(fault) = self.fault.as_mut() {
            xml.push_str(&fault.serialize_with(ctx)?);
        }
        Ok(xml)
    }

    /// Rendu `<prefix:Body>` dans le contexte du parent : contenu puis Fault
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        let xml = self.render_inner(ctx)?;
        Ok(self.container.enclose_in_element("Body", &xml, &ctx.prefix))
    }

    /// Recherche et lit le corps de `document`.
    ///
    /// Le Fault éventuel (enfant direct du corps) est lu avec `fault_types`
    /// comme candidats du `Detail` ; les autres enfants sont résolus contre
    /// `body_types`. Un corps absent, ou dont ni le contenu ni le Fault ne
    /// se résolvent, donne `Ok(None)` ou une erreur si `throw_if_missing`.
    pub fn parse(
        document: &Element,
        body_types: &[ContentType],
        fault_types: &[ContentType],
        throw_if_missing: bool,
        target_namespace: Option<&str>,
    ) -> Result<Option<Self>> {
        let version = match target_namespace {
            Some(namespace) => SoapVersion::from_namespace(namespace)?,
            None => get_config().version()?,
        };
        let missing = || {
            if throw_if_missing {
                Err(SoapError::missing_part("Body"))
            } else {
                Ok(None)
            }
        };

        let Some(element) = find_element(document, "Body", Some(version.namespace())) else {
            trace!(version=%version, "No SOAP Body");
            return missing();
        };

        let is_fault = |node: &XMLNode| {
            node.as_element().is_some_and(|el| {
                el.name == "Fault" && namespaces_match(el.namespace.as_deref(), Some(version.namespace()))
            })
        };

        let fault = match element.children.iter().find(|node| is_fault(node)) {
            Some(node) => match node.as_element() {
                Some(fault) => Some(Fault::parse_element(fault, fault_types, version)?),
                None => None,
            },
            None => None,
        };

        let content = if fault.is_some() {
            let mut payload = element.clone();
            payload.children.retain(|node| !is_fault(node));
            parse_content(&payload, body_types)
        } else {
            parse_content(element, body_types)
        };

        if content.is_none() && fault.is_none() {
            trace!(version=%version, "SOAP Body resolved to nothing");
            return missing();
        }

        let mut body = Self {
            container: SoapContainer::with_content(content),
            fault,
        };
        body.set_target_namespace(version.namespace());
        if let Some(prefix) = element.prefix.as_deref() {
            body.set_prefix(prefix);
        }
        Ok(Some(body))
    }

    /// Variante de [`SoapBody::parse`] qui n'échoue pas
    pub fn try_parse(
        document: &Element,
        body_types: &[ContentType],
        fault_types: &[ContentType],
        target_namespace: Option<&str>,
    ) -> Option<Self> {
        error::swallow(Self::parse(
            document,
            body_types,
            fault_types,
            false,
            target_namespace,
        ))
    }
}

impl From<Content> for SoapBody {
    fn from(content: Content) -> Self {
        Self::with_content(content)
    }
}

impl From<Fault> for SoapBody {
    fn from(fault: Fault) -> Self {
        Self::with_fault(fault)
    }
}

impl SerializeXml for SoapBody {
    fn serialize_xml(&mut self) -> Result<String> {
        let ctx = self.container.resolve_context(&get_config())?;
        let xml = self.render_inner(&ctx)?;
        Ok(self.container.enclose_in_document("Body", &xml, &ctx))
    }
}

impl SerializeXmlFragment for SoapBody {
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

impl Serialize for SoapBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Body", 2)?;
        state.serialize_field("Content", &self.content())?;
        if let Some(fault) = &self.fault {
            state.serialize_field("Fault", fault)?;
        }
        state.end()
    }
}

impl SerializeJson for SoapBody {}
