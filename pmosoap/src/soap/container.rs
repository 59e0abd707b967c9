//! Base commune des parties SOAP (Header, Body, Fault, Envelope)

use tracing::trace;

use crate::config::SoapConfig;
use crate::content::{self, Content, ContentItem};
use crate::encoding::Encoding;
use crate::error::Result;
use crate::namespaces::{NamespaceSet, QualifiedNamespace};
use crate::serialize::SerializeState;
use crate::version::SoapVersion;

/// Paramètres de rendu transmis explicitement du parent vers ses parties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapContext {
    pub version: SoapVersion,
    pub prefix: String,
    pub encoding: Encoding,
}

impl SoapContext {
    pub fn new(version: SoapVersion, prefix: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            version,
            prefix: prefix.into(),
            encoding,
        }
    }

    /// Contexte par défaut tiré de la configuration
    pub fn from_config(config: &SoapConfig) -> Result<Self> {
        Ok(Self::new(config.version()?, config.prefix(), config.encoding))
    }

    /// Namespace de l'enveloppe
    pub fn namespace(&self) -> &'static str {
        self.version.namespace()
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_version(mut self, version: SoapVersion) -> Self {
        self.version = version;
        self
    }
}

/// État partagé par les parties SOAP : contenu, namespace cible et préfixe
/// propres à l'instance (sinon ceux de la configuration).
#[derive(Debug, Clone, Default)]
pub struct SoapContainer {
    pub(crate) state: SerializeState,
    pub(crate) content: Option<Content>,
    target_namespace: Option<String>,
    prefix: Option<String>,
    include_target_namespace: bool,
}

impl SoapContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SerializeState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn with_content(content: Option<Content>) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    /// Namespace cible propre à l'instance
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Fixe le namespace cible ; une valeur non supportée est signalée au
    /// moment de la sérialisation.
    pub fn set_target_namespace(&mut self, namespace: impl Into<String>) {
        self.target_namespace = Some(namespace.into());
    }

    /// Préfixe propre à l'instance (ignoré s'il est vide)
    pub fn prefix(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    pub fn include_target_namespace(&self) -> bool {
        self.include_target_namespace
    }

    /// Déclare aussi le namespace cible sur la racine du contenu
    pub fn set_include_target_namespace(&mut self, value: bool) {
        self.include_target_namespace = value;
    }

    /// Contexte d'une partie sérialisée seule
    pub fn resolve_context(&self, config: &SoapConfig) -> Result<SoapContext> {
        let version = match self.target_namespace() {
            Some(namespace) => SoapVersion::from_namespace(namespace)?,
            None => config.version()?,
        };
        let prefix = self.prefix().unwrap_or(config.prefix());
        let encoding = self.state.encoding_or(config.encoding);
        Ok(SoapContext::new(version, prefix, encoding))
    }

    /// Namespaces transmis au contenu
    pub fn content_namespaces(&self, ctx: &SoapContext) -> NamespaceSet {
        if !self.include_target_namespace {
            return self.state.namespaces.clone();
        }
        let mut namespaces = NamespaceSet::new();
        namespaces.insert(QualifiedNamespace::new(&ctx.prefix, ctx.namespace()));
        namespaces.merge(&self.state.namespaces);
        namespaces
    }

    /// Rendu du contenu via le dispatch de [`content::serialize_content`]
    pub fn serialize_content(&mut self, ctx: &SoapContext) -> Result<String> {
        let namespaces = self.content_namespaces(ctx);
        content::serialize_content(self.content.as_mut(), &namespaces, ctx.encoding)
    }

    /// `<prefix:name attrs>xml</prefix:name>`
    pub fn enclose_in_element(&self, name: &str, xml: &str, prefix: &str) -> String {
        let attributes = self.state.attributes.render();
        trace!(element = name, prefix = prefix, "Enclosing SOAP part");
        format!("<{prefix}:{name}{attributes}>{xml}</{prefix}:{name}>")
    }

    /// Document autonome : déclaration XML, préfixe SOAP déclaré sur l'élément
    pub fn enclose_in_document(&self, name: &str, xml: &str, ctx: &SoapContext) -> String {
        let declaration = QualifiedNamespace::new(&ctx.prefix, ctx.namespace());
        let attributes = self.state.attributes.render();
        format!(
            r#"<?xml version="1.0" encoding="{}"?><{p}:{name} {}="{}"{attributes}>{xml}</{p}:{name}>"#,
            ctx.encoding.web_name(),
            declaration.attribute_name(),
            declaration.uri,
            p = ctx.prefix,
        )
    }
}

/// Accès uniforme au contenu et au namespace d'une partie SOAP
pub trait SoapPart {
    fn container(&self) -> &SoapContainer;

    fn container_mut(&mut self) -> &mut SoapContainer;

    fn content(&self) -> Option<&Content> {
        self.container().content.as_ref()
    }

    fn content_mut(&mut self) -> Option<&mut Content> {
        self.container_mut().content.as_mut()
    }

    fn set_content(&mut self, content: Option<Content>) {
        self.container_mut().content = content;
    }

    fn take_content(&mut self) -> Option<Content> {
        self.container_mut().content.take()
    }

    /// Contenu unique de type `T`
    fn content_as<T: 'static>(&self) -> Option<&T> {
        self.content().and_then(|content| content.downcast_ref::<T>())
    }

    /// Contenu à plat : vide, un élément, ou les éléments de la séquence
    fn content_items(&self) -> Vec<&ContentItem> {
        self.content()
            .map(|content| content.iter().collect())
            .unwrap_or_default()
    }

    fn target_namespace(&self) -> Option<&str> {
        self.container().target_namespace()
    }

    fn set_target_namespace(&mut self, namespace: &str) {
        self.container_mut().set_target_namespace(namespace);
    }

    fn prefix(&self) -> Option<&str> {
        self.container().prefix()
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.container_mut().set_prefix(prefix);
    }
}

/// Implémente [`SoapPart`] et [`XmlSerializable`](crate::serialize::XmlSerializable)
/// pour un type qui contient un [`SoapContainer`] au chemin donné.
macro_rules! impl_soap_part {
    ($ty:ty, $($path:ident).+) => {
        impl $crate::soap::container::SoapPart for $ty {
            fn container(&self) -> &$crate::soap::container::SoapContainer {
                &self.$($path).+
            }

            fn container_mut(&mut self) -> &mut $crate::soap::container::SoapContainer {
                &mut self.$($path).+
            }
        }

        impl $crate::serialize::XmlSerializable for $ty {
            fn state(&self) -> &$crate::serialize::SerializeState {
                &self.$($path).+.state
            }

            fn state_mut(&mut self) -> &mut $crate::serialize::SerializeState {
                &mut self.$($path).+.state
            }
        }
    };
}

pub(crate) use impl_soap_part;
