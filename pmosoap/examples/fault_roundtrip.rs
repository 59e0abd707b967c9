//! Exemple d'aller-retour d'un Fault SOAP
//!
//! Construit une enveloppe portant un Fault 1.2 avec un détail
//! `ServerFault`, la sérialise puis la relit.
//!
//! Usage:
//! ```bash
//! RUST_LOG=pmosoap=debug cargo run --example fault_roundtrip
//! ```

use pmosoap::{
    Content, FaultCodeEnum, SerializeJson, SerializeXml, ServerFault, SoapEnvelope, SoapFault,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialiser le logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== SOAP Fault round trip ===\n");

    let error = std::io::Error::other("disk full");
    let mut fault = SoapFault::new(FaultCodeEnum::Receiver, [("Internal error", "en")])
        .with_detail(Content::object(ServerFault::from_error(&error)));
    fault.set_role("urn:example:storage");

    let mut envelope = SoapEnvelope::create();
    envelope.set_fault(fault);

    let xml = envelope.serialize_xml()?;
    println!("--- XML ---\n{}\n", xml);

    let parsed = SoapEnvelope::parse(&xml, |_| Vec::new(), None)?;
    match parsed.fault() {
        Some(fault) => {
            println!("Version: {}", fault.version());
            if let Some(detail) = fault.detail_as::<ServerFault>() {
                println!("Exception: {:?}", detail.exception_message);
            }
        }
        None => println!("Pas de Fault dans l'enveloppe"),
    }

    println!("\n--- JSON ---\n{}", parsed.serialize_json()?);
    Ok(())
}
