//! Faults SOAP
//!
//! Les deux versions du protocole ont des formes incompatibles :
//!
//! - SOAP 1.2 ([`SoapFault`]) : `Code{Value, Subcode?}`, `Reason{Text+}`,
//!   `Node?`, `Role?`, `Detail?`, tous qualifiés par le préfixe SOAP ;
//! - SOAP 1.1 ([`SoapFault11`]) : `faultcode`, `faultstring`, `faultactor?`,
//!   `detail?`, non qualifiés.
//!
//! Les deux partagent [`SoapFaultBase`], dont le contenu est le `Detail`.
//! Le `Detail` est rendu à part puis greffé comme dernier enfant du Fault ; au
//! parsing il est retiré de l'arbre avant la lecture des autres champs et
//! résolu par essais successifs contre les types candidats.

mod code;
mod fault11;
mod fault12;
mod reason;
mod server_fault;

pub use code::{FaultCode, FaultCodeEnum, FaultSubcode};
pub use fault11::SoapFault11;
pub use fault12::SoapFault;
pub use reason::{FaultReason, ReasonText, default_lang};
pub use server_fault::ServerFault;

use serde::{Serialize, Serializer};
use tracing::debug;
use xmltree::{Element, Namespace, XMLNode};

use super::container::{SoapContainer, SoapContext, SoapPart};
use crate::binding::{self, find_element};
use crate::config::get_config;
use crate::content::{Content, ContentType, parse_content};
use crate::error::{self, Result, SoapError};
use crate::serialize::{SerializeJson, SerializeXml};
use crate::version::{SoapVersion, namespaces_match};

/// Forme des éléments produits : qualifiés par le préfixe SOAP ou non
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementForm<'a> {
    pub prefix: &'a str,
    pub namespace: &'a str,
    pub qualified: bool,
}

impl<'a> ElementForm<'a> {
    pub fn qualified(prefix: &'a str, namespace: &'a str) -> Self {
        Self {
            prefix,
            namespace,
            qualified: true,
        }
    }

    pub fn unqualified(prefix: &'a str, namespace: &'a str) -> Self {
        Self {
            prefix,
            namespace,
            qualified: false,
        }
    }

    pub fn element(&self, name: &str) -> Element {
        if self.qualified {
            Element::new(&format!("{}:{}", self.prefix, name))
        } else {
            Element::new(name)
        }
    }

    pub fn text_element(&self, name: &str, text: &str) -> Element {
        let mut element = self.element(name);
        element.children.push(XMLNode::Text(text.to_string()));
        element
    }

    /// Élément `Fault`, toujours qualifié, qui déclare le préfixe SOAP
    pub fn fault_element(&self) -> Element {
        let mut element = Element::new(&format!("{}:Fault", self.prefix));
        let mut namespaces = Namespace::empty();
        namespaces.put(self.prefix, self.namespace);
        element.namespaces = Some(namespaces);
        element
    }
}

/// État commun aux deux formes de Fault ; le contenu du conteneur est le
/// `Detail`.
#[derive(Debug, Clone, Default)]
pub struct SoapFaultBase {
    pub(crate) container: SoapContainer,
}

impl SoapFaultBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detail(detail: Option<Content>) -> Self {
        Self {
            container: SoapContainer::with_content(detail),
        }
    }

    pub fn detail(&self) -> Option<&Content> {
        self.container.content.as_ref()
    }

    pub fn set_detail(&mut self, detail: Option<Content>) {
        self.container.content = detail;
    }

    pub fn detail_as<T: 'static>(&self) -> Option<&T> {
        self.detail().and_then(|detail| detail.downcast_ref::<T>())
    }

    /// Contexte d'un Fault sérialisé seul : la version est celle de la forme
    /// du Fault, sauf namespace cible explicite sur l'instance.
    pub(crate) fn standalone_context(&self, version: SoapVersion) -> Result<SoapContext> {
        let config = get_config();
        let ctx = self.container.resolve_context(&config)?;
        if self.container.target_namespace().is_some() {
            Ok(ctx)
        } else {
            Ok(ctx.with_version(version))
        }
    }

    /// Rend le `Detail` seul puis le relit comme élément à greffer
    pub(crate) fn detail_element(&mut self, ctx: &SoapContext) -> Result<Option<Element>> {
        if self.container.content.is_none() {
            return Ok(None);
        }
        let xml = self.container.serialize_content(ctx)?;
        let wrapped = match ctx.version {
            SoapVersion::V12 => format!("<{p}:Detail>{xml}</{p}:Detail>", p = ctx.prefix),
            SoapVersion::V11 => format!("<detail>{xml}</detail>"),
        };
        binding::parse_fragment(&wrapped, &ctx.prefix, ctx.namespace()).map(Some)
    }
}

/// Types candidats du `Detail` quand l'appelant n'en fournit aucun
pub fn default_detail_types() -> Vec<ContentType> {
    vec![ServerFault::content_type()]
}

/// Vrai si `element` est le `Detail` de `version` : qualifié par le
/// namespace SOAP en 1.2, sans namespace en 1.1.
fn is_detail(element: &Element, version: SoapVersion) -> bool {
    let expected = match version {
        SoapVersion::V12 => Some(version.namespace()),
        SoapVersion::V11 => None,
    };
    element.name == version.detail_element()
        && namespaces_match(element.namespace.as_deref(), expected)
}

/// Sépare le `Detail` du reste du Fault.
///
/// Retourne une copie de `fault` sans son `Detail` et le contenu résolu de
/// celui-ci (absent si l'élément manque ou si aucun enfant n'est reconnu).
pub(crate) fn extract_detail(
    fault: &Element,
    version: SoapVersion,
    detail_types: &[ContentType],
) -> (Element, Option<Content>) {
    let mut stripped = fault.clone();
    let position = stripped.children.iter().position(|node| {
        node.as_element()
            .is_some_and(|el| is_detail(el, version))
    });
    let Some(position) = position else {
        return (stripped, None);
    };
    let node = stripped.children.remove(position);
    let Some(detail) = node.as_element() else {
        return (stripped, None);
    };

    let content = if detail_types.is_empty() {
        parse_content(detail, &default_detail_types())
    } else {
        parse_content(detail, detail_types)
    };
    if content.is_none() {
        debug!(version=%version, "Fault detail resolved to nothing");
    }
    (stripped, content)
}

/// Fault d'une des deux versions
#[derive(Debug, Clone)]
pub enum Fault {
    V12(SoapFault),
    V11(SoapFault11),
}

impl Fault {
    /// Fault minimal : code et texte d'explication
    pub fn new(version: SoapVersion, code: FaultCodeEnum, reason: impl Into<String>) -> Self {
        match version {
            SoapVersion::V12 => Self::V12(SoapFault::new(code, [ReasonText::new(reason)])),
            SoapVersion::V11 => Self::V11(SoapFault11::from_code(code, reason)),
        }
    }

    pub fn version(&self) -> SoapVersion {
        match self {
            Self::V12(_) => SoapVersion::V12,
            Self::V11(_) => SoapVersion::V11,
        }
    }

    pub fn base(&self) -> &SoapFaultBase {
        match self {
            Self::V12(fault) => &fault.base,
            Self::V11(fault) => &fault.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut SoapFaultBase {
        match self {
            Self::V12(fault) => &mut fault.base,
            Self::V11(fault) => &mut fault.base,
        }
    }

    pub fn detail(&self) -> Option<&Content> {
        self.base().detail()
    }

    pub fn set_detail(&mut self, detail: Option<Content>) {
        self.base_mut().set_detail(detail);
    }

    pub fn detail_as<T: 'static>(&self) -> Option<&T> {
        self.base().detail_as::<T>()
    }

    pub fn as_v12(&self) -> Option<&SoapFault> {
        match self {
            Self::V12(fault) => Some(fault),
            Self::V11(_) => None,
        }
    }

    pub fn as_v11(&self) -> Option<&SoapFault11> {
        match self {
            Self::V11(fault) => Some(fault),
            Self::V12(_) => None,
        }
    }

    /// Rendu dans un message de version `ctx.version`
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        if self.version() != ctx.version {
            return Err(SoapError::VersionMismatch {
                expected: ctx.version,
                found: self.version(),
            });
        }
        match self {
            Self::V12(fault) => fault.serialize_with(ctx),
            Self::V11(fault) => fault.serialize_with(ctx),
        }
    }

    /// Recherche et lit le Fault de `document`.
    ///
    /// La version est celle de `target_namespace`, sinon celle de la
    /// configuration. Un Fault absent n'est pas une erreur.
    pub fn parse(
        document: &Element,
        detail_types: &[ContentType],
        target_namespace: Option<&str>,
    ) -> Result<Option<Self>> {
        let version = match target_namespace {
            Some(namespace) => SoapVersion::from_namespace(namespace)?,
            None => get_config().version()?,
        };
        match find_element(document, "Fault", Some(version.namespace())) {
            Some(element) => Self::parse_element(element, detail_types, version).map(Some),
            None => Ok(None),
        }
    }

    /// Variante de [`Fault::parse`] qui n'échoue pas
    pub fn try_parse(
        document: &Element,
        detail_types: &[ContentType],
        target_namespace: Option<&str>,
    ) -> Option<Self> {
        error::swallow(Self::parse(document, detail_types, target_namespace))
    }

    /// Lit un élément `Fault` déjà localisé
    pub fn parse_element(
        element: &Element,
        detail_types: &[ContentType],
        version: SoapVersion,
    ) -> Result<Self> {
        match version {
            SoapVersion::V12 => SoapFault::parse_element(element, detail_types).map(Self::V12),
            SoapVersion::V11 => SoapFault11::parse_element(element, detail_types).map(Self::V11),
        }
    }
}

impl From<SoapFault> for Fault {
    fn from(fault: SoapFault) -> Self {
        Self::V12(fault)
    }
}

impl From<SoapFault11> for Fault {
    fn from(fault: SoapFault11) -> Self {
        Self::V11(fault)
    }
}

impl SoapPart for Fault {
    fn container(&self) -> &SoapContainer {
        &self.base().container
    }

    fn container_mut(&mut self) -> &mut SoapContainer {
        &mut self.base_mut().container
    }
}

impl SerializeXml for Fault {
    fn serialize_xml(&mut self) -> Result<String> {
        match self {
            Self::V12(fault) => fault.serialize_xml(),
            Self::V11(fault) => fault.serialize_xml(),
        }
    }
}

impl Serialize for Fault {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::V12(fault) => fault.serialize(serializer),
            Self::V11(fault) => fault.serialize(serializer),
        }
    }
}

impl SerializeJson for Fault {}
