//! Adaptateur entre des structures applicatives et l'enveloppe SOAP
//!
//! Une structure déclare ses membres d'en-tête et de corps une fois pour
//! toutes via [`SoapMessage`] (généré par la macro [`soap_message!`]). Les
//! déclarations sont résolues au premier usage dans un registre immuable
//! indexé par `(type, marqueur)`.
//!
//! [`SoapEnvelopeContainer`] fait le chemin inverse : il lit un document avec
//! des types candidats par partie et expose les contenus résolus à plat.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::envelope::SoapEnvelope;
use super::part::SoapEnvelopePart;
use crate::content::{Content, ContentItem, ContentType};
use crate::error::SoapError;

/// Partie de l'enveloppe à laquelle un membre est destiné
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapMarker {
    Header,
    Body,
}

/// Membre déclaré d'un message
pub struct SoapMember<M> {
    pub name: &'static str,
    pub marker: SoapMarker,
    pub content_type: ContentType,
    pub value: fn(&M) -> Option<ContentItem>,
}

impl<M> SoapMember<M> {
    pub fn new(
        name: &'static str,
        marker: SoapMarker,
        content_type: ContentType,
        value: fn(&M) -> Option<ContentItem>,
    ) -> Self {
        Self {
            name,
            marker,
            content_type,
            value,
        }
    }
}

impl<M> Clone for SoapMember<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            marker: self.marker,
            content_type: self.content_type.clone(),
            value: self.value,
        }
    }
}

impl<M> fmt::Debug for SoapMember<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapMember")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("content_type", &self.content_type.type_name())
            .finish()
    }
}

/// Structure convertible en enveloppe SOAP
pub trait SoapMessage: Send + Sync + 'static {
    /// Membres d'en-tête et de corps, dans l'ordre de déclaration
    fn members() -> Vec<SoapMember<Self>>
    where
        Self: Sized;
}

type Registry = HashMap<(TypeId, SoapMarker), Arc<dyn Any + Send + Sync>>;

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Membres de `M` portant `marker`, résolus une seule fois par type
pub fn registered_members<M: SoapMessage>(marker: SoapMarker) -> Arc<Vec<SoapMember<M>>> {
    let key = (TypeId::of::<M>(), marker);
    if let Some(members) = lookup::<M>(&REGISTRY.read(), &key) {
        return members;
    }

    let mut registry = REGISTRY.write();
    if !registry.contains_key(&key) {
        let members = M::members();
        for marker in [SoapMarker::Header, SoapMarker::Body] {
            let selected: Vec<SoapMember<M>> = members
                .iter()
                .filter(|member| member.marker == marker)
                .cloned()
                .collect();
            registry.insert((TypeId::of::<M>(), marker), Arc::new(selected));
        }
        debug!(message_type = std::any::type_name::<M>(), members = members.len(), "SOAP message registered");
    }
    lookup::<M>(&registry, &key).unwrap_or_default()
}

fn lookup<M: SoapMessage>(
    registry: &Registry,
    key: &(TypeId, SoapMarker),
) -> Option<Arc<Vec<SoapMember<M>>>> {
    registry
        .get(key)
        .cloned()
        .and_then(|entry| entry.downcast::<Vec<SoapMember<M>>>().ok())
}

/// Types déclarés par `M` pour `marker`
pub fn types_for_marker<M: SoapMessage>(marker: SoapMarker) -> Vec<ContentType> {
    registered_members::<M>(marker)
        .iter()
        .map(|member| member.content_type.clone())
        .collect()
}

fn collect_content<M: SoapMessage>(message: &M, marker: SoapMarker) -> Option<Content> {
    let items = registered_members::<M>(marker)
        .iter()
        .filter_map(|member| (member.value)(message))
        .collect();
    Content::from_items(items)
}

/// Enveloppe construite à partir des membres renseignés de `message`.
///
/// Les membres absents (`None`) sont ignorés ; sans membre d'en-tête
/// renseigné, l'enveloppe n'a pas d'en-tête.
pub fn as_soap_envelope<M: SoapMessage>(message: &M) -> SoapEnvelope {
    SoapEnvelope::from_content(
        collect_content(message, SoapMarker::Body),
        collect_content(message, SoapMarker::Header),
    )
}

/// Lecture d'un document avec des types candidats fixés par partie
#[derive(Debug, Default)]
pub struct SoapEnvelopeContainer {
    header_types: Vec<ContentType>,
    body_types: Vec<ContentType>,
    fault_types: Vec<ContentType>,
    target_namespace: Option<String>,
    envelope: Option<SoapEnvelope>,
    parse_error: Option<SoapError>,
}

impl SoapEnvelopeContainer {
    pub fn new(
        header_types: Vec<ContentType>,
        body_types: Vec<ContentType>,
        fault_types: Vec<ContentType>,
    ) -> Self {
        Self {
            header_types,
            body_types,
            fault_types,
            ..Self::default()
        }
    }

    /// Candidats tirés des membres déclarés par `M`
    pub fn for_message<M: SoapMessage>() -> Self {
        Self::new(
            types_for_marker::<M>(SoapMarker::Header),
            types_for_marker::<M>(SoapMarker::Body),
            Vec::new(),
        )
    }

    pub fn with_fault_types(mut self, fault_types: Vec<ContentType>) -> Self {
        self.fault_types = fault_types;
        self
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    pub fn set_target_namespace(&mut self, namespace: Option<String>) {
        self.target_namespace = namespace;
    }

    /// Candidats d'une partie
    pub fn types_hint(&self, part: SoapEnvelopePart) -> &[ContentType] {
        match part {
            SoapEnvelopePart::Header => &self.header_types,
            SoapEnvelopePart::Body => &self.body_types,
            SoapEnvelopePart::Fault => &self.fault_types,
        }
    }

    /// Lit `xml` ; en cas d'échec l'erreur est conservée dans
    /// [`parse_error`](Self::parse_error) et `false` est retourné.
    pub fn try_parse(&mut self, xml: &str) -> bool {
        self.envelope = None;
        let result = SoapEnvelope::parse(
            xml,
            |part| self.types_hint(part).to_vec(),
            self.target_namespace.as_deref(),
        );
        match result {
            Ok(envelope) => {
                self.envelope = Some(envelope);
                self.parse_error = None;
                true
            }
            Err(e) => {
                warn!(error = %e, "Cannot parse SOAP envelope");
                self.parse_error = Some(e);
                false
            }
        }
    }

    pub fn envelope(&self) -> Option<&SoapEnvelope> {
        self.envelope.as_ref()
    }

    pub fn into_envelope(self) -> Option<SoapEnvelope> {
        self.envelope
    }

    pub fn parse_error(&self) -> Option<&SoapError> {
        self.parse_error.as_ref()
    }

    /// Contenu de l'en-tête à plat
    pub fn header_content(&self) -> Vec<&ContentItem> {
        content_array(self.envelope.as_ref().and_then(SoapEnvelope::header_content))
    }

    /// Contenu du corps à plat
    pub fn body_content(&self) -> Vec<&ContentItem> {
        content_array(self.envelope.as_ref().and_then(SoapEnvelope::body_content))
    }

    /// Contenu du `Detail` du Fault à plat
    pub fn fault_detail_content(&self) -> Vec<&ContentItem> {
        content_array(
            self.envelope
                .as_ref()
                .and_then(SoapEnvelope::fault)
                .and_then(|fault| fault.detail()),
        )
    }
}

fn content_array(content: Option<&Content>) -> Vec<&ContentItem> {
    content
        .map(|content| content.iter().collect())
        .unwrap_or_default()
}

/// Déclare les membres d'en-tête et de corps d'une structure.
///
/// Chaque champ déclaré est un `Option<T>` ; `T` doit être un type serde
/// utilisable comme [`ContentType::of`](crate::ContentType::of).
///
/// ```ignore
/// soap_message! {
///     impl PriceRequest {
///         header auth: Auth,
///         body request: GetPrice,
///     }
/// }
/// ```
#[macro_export]
macro_rules! soap_message {
    (@marker header) => {
        $crate::SoapMarker::Header
    };
    (@marker body) => {
        $crate::SoapMarker::Body
    };
    (impl $ty:ty {
        $(
            $marker:ident $field:ident : $fty:ty
        ),* $(,)?
    }) => {
        impl $crate::SoapMessage for $ty {
            fn members() -> Vec<$crate::SoapMember<Self>> {
                vec![
                    $(
                        $crate::SoapMember::new(
                            stringify!($field),
                            $crate::soap_message!(@marker $marker),
                            $crate::ContentType::of::<$fty>(),
                            |message: &$ty| {
                                message
                                    .$field
                                    .clone()
                                    .map($crate::ContentItem::object::<$fty>)
                            },
                        ),
                    )*
                ]
            }
        }
    };
}
