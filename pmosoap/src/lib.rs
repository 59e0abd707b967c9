//! # pmosoap - Enveloppes SOAP 1.1 / 1.2
//!
//! Modélisation et aller-retour XML des messages SOAP : enveloppe, en-tête,
//! corps et Fault, pour les deux versions incompatibles du protocole.
//!
//! ## Fonctionnalités
//!
//! - ✅ Sérialisation et parsing d'enveloppes SOAP 1.1 et 1.2
//! - ✅ Faults structurés (1.2) et à plat (1.1), avec `Detail` ouvert
//! - ✅ Résolution du contenu par types candidats (premier qui convient)
//! - ✅ Namespaces et attributs libres sur chaque partie
//! - ✅ Configuration globale (YAML intégré, fichier, variables d'environnement)
//! - ✅ Adaptateur pour structures applicatives ([`soap_message!`])
//! - ✅ Passage JSON
//!
//! ## Exemple
//!
//! ```ignore
//! use pmosoap::{Content, FaultCodeEnum, SerializeXml, SoapEnvelope, SoapFault};
//!
//! let mut envelope = SoapEnvelope::create();
//! envelope.set_fault(SoapFault::new(FaultCodeEnum::Sender, [("Bad request", "en")]));
//! let xml = envelope.serialize_xml()?;
//!
//! let parsed = SoapEnvelope::parse(&xml, |_| Vec::new(), None)?;
//! assert!(parsed.fault().is_some());
//! ```

pub mod attributes;
pub mod binding;
pub mod config;
pub mod content;
pub mod encoding;
pub mod error;
pub mod namespaces;
pub mod serialize;
pub mod soap;
pub mod version;

pub use attributes::AttributeBag;
pub use config::{SoapConfig, get_config, set_config};
pub use content::{Content, ContentItem, ContentType, parse_content, serialize_content};
pub use encoding::Encoding;
pub use error::{Result, SoapError, take_last_parse_error};
pub use namespaces::{NamespaceSet, QualifiedNamespace};
pub use serialize::{
    SerializeJson, SerializeState, SerializeXml, SerializeXmlFragment, XmlSerializable,
};
pub use soap::*;
pub use version::{SOAP11_NAMESPACE, SOAP12_NAMESPACE, SoapVersion};
