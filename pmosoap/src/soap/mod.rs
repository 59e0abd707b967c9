//! # Module SOAP - parties de l'enveloppe
//!
//! ## Architecture
//!
//! - [`SoapEnvelope`] : document complet (en-tête optionnel, corps obligatoire)
//! - [`SoapHeader`] / [`SoapBody`] : conteneurs de contenu applicatif
//! - [`Fault`] : Fault SOAP 1.2 ([`SoapFault`]) ou SOAP 1.1 ([`SoapFault11`])
//! - [`SoapEnvelopeContainer`] : lecture guidée par des types candidats
//!
//! Les parties partagent [`SoapContainer`] et le trait [`SoapPart`]. Le
//! contexte de rendu ([`SoapContext`]) descend explicitement de l'enveloppe
//! vers ses parties.

mod body;
pub(crate) mod container;
pub mod fault;
mod envelope;
mod header;
mod message;
mod part;

pub use body::SoapBody;
pub use container::{SoapContainer, SoapContext, SoapPart};
pub use envelope::SoapEnvelope;
pub use fault::{
    Fault, FaultCode, FaultCodeEnum, FaultReason, FaultSubcode, ReasonText, ServerFault,
    SoapFault, SoapFault11, SoapFaultBase,
};
pub use header::SoapHeader;
pub use message::{
    SoapEnvelopeContainer, SoapMarker, SoapMember, SoapMessage, as_soap_envelope,
    registered_members, types_for_marker,
};
pub use part::SoapEnvelopePart;
