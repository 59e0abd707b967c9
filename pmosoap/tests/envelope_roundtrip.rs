//! Tests d'intégration : aller-retour d'enveloppes SOAP 1.1 / 1.2

use pmosoap::{
    Content, ContentType, Fault, FaultCodeEnum, SOAP11_NAMESPACE, SOAP12_NAMESPACE,
    SerializeXml, ServerFault, SoapEnvelope, SoapEnvelopeContainer, SoapEnvelopePart, SoapFault,
    SoapFault11, SoapPart, SoapVersion, XmlSerializable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GetPrice {
    item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Auth {
    token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "getStock")]
struct GetStock {
    item: String,
    warehouse: u32,
}

#[derive(Debug, Default)]
struct StockRequest {
    request: Option<GetStock>,
}

pmosoap::soap_message! {
    impl StockRequest {
        body request: GetStock,
    }
}

#[derive(Debug, Default)]
struct PriceRequest {
    auth: Option<Auth>,
    request: Option<GetPrice>,
}

pmosoap::soap_message! {
    impl PriceRequest {
        header auth: Auth,
        body request: GetPrice,
    }
}

#[test]
fn test_fault_code_tokens() {
    for code in FaultCodeEnum::ALL {
        let token = format!("soap:{}", code.name());
        assert_eq!(FaultCodeEnum::parse_token(&token).unwrap(), code);
        assert_eq!(code.name().parse::<FaultCodeEnum>().unwrap(), code);
    }
    assert_eq!(FaultCodeEnum::parse_token("sender").unwrap(), FaultCodeEnum::Sender);
    assert!(FaultCodeEnum::parse_token("soap:Nobody").is_err());
}

#[test]
fn test_sender_fault_fragment() {
    let mut envelope = SoapEnvelope::create();
    envelope.set_fault(SoapFault::new(FaultCodeEnum::Sender, [("Bad request", "en")]));
    envelope.set_exclude_xml_declaration(true);

    let xml = envelope.serialize_xml().unwrap();
    assert_eq!(
        xml,
        format!(
            r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}"><soap:Body><soap:Fault><soap:Code><soap:Value>soap:Sender</soap:Value></soap:Code><soap:Reason><soap:Text xml:lang="en">Bad request</soap:Text></soap:Reason></soap:Fault></soap:Body></soap:Envelope>"#
        )
    );
}

#[test]
fn test_envelope_without_body() {
    let mut envelope = SoapEnvelope::create();
    let err = envelope.serialize_xml().unwrap_err();
    assert!(err.is_missing_part());

    let xml = format!(
        r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}"><soap:Header/></soap:Envelope>"#
    );
    assert!(
        SoapEnvelope::parse(&xml, |_| Vec::new(), None)
            .unwrap_err()
            .is_missing_part()
    );
}

#[test]
fn test_body_round_trip() {
    let mut envelope = SoapEnvelope::from_content(
        Some(Content::object(GetPrice {
            item: "apple & pear".into(),
        })),
        Some(Content::object(Auth {
            token: "abc".into(),
        })),
    );
    let xml = envelope.serialize_xml().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));

    let parsed = SoapEnvelope::parse_typed::<Auth, GetPrice>(&xml).unwrap();
    assert_eq!(
        parsed.content_as::<GetPrice>(),
        Some(&GetPrice {
            item: "apple & pear".into()
        })
    );
    assert_eq!(
        parsed.header_content().unwrap().downcast_ref::<Auth>(),
        Some(&Auth {
            token: "abc".into()
        })
    );
}

#[test]
fn test_soap11_version_is_kept() {
    let xml = format!(
        r#"<env:Envelope xmlns:env="{SOAP11_NAMESPACE}"><env:Body><GetPrice><item>fig</item></GetPrice></env:Body></env:Envelope>"#
    );
    let mut envelope = SoapEnvelope::parse_body::<GetPrice>(&xml).unwrap();
    assert_eq!(envelope.context().unwrap().version, SoapVersion::V11);

    let out = envelope.serialize_xml().unwrap();
    assert!(out.contains(&format!(r#"<env:Envelope xmlns:env="{SOAP11_NAMESPACE}">"#)));
    assert!(out.contains("<env:Body><GetPrice><item>fig</item></GetPrice></env:Body>"));
    assert!(!out.contains(SOAP12_NAMESPACE));
}

#[test]
fn test_soap11_fault_round_trip() {
    let mut envelope = SoapEnvelope::create();
    envelope.set_target_namespace(SOAP11_NAMESPACE);
    envelope.set_fault(SoapFault11::from_code(FaultCodeEnum::Sender, "bad input"));

    let xml = envelope.serialize_xml().unwrap();
    assert!(xml.contains("<faultcode>soap:Client</faultcode>"));
    assert!(xml.contains("<faultstring>bad input</faultstring>"));

    let parsed = SoapEnvelope::parse(&xml, |_| Vec::new(), None).unwrap();
    let fault = parsed.fault().unwrap().as_v11().unwrap();
    assert_eq!(fault.code(), Some(FaultCodeEnum::Sender));
}

#[test]
fn test_fault_version_mismatch() {
    let mut envelope = SoapEnvelope::create();
    envelope.set_fault(Fault::new(SoapVersion::V11, FaultCodeEnum::Receiver, "down"));
    assert!(envelope.serialize_xml().unwrap_err().is_version_error());
}

#[test]
fn test_server_fault_detail() {
    let error = std::io::Error::other("disk full");
    let fault = SoapFault::new(FaultCodeEnum::Receiver, [("Internal error", "en")])
        .with_detail(Content::object(ServerFault::from_error(&error)));
    let mut envelope = SoapEnvelope::create();
    envelope.set_fault(fault);

    let xml = envelope.serialize_xml().unwrap();
    assert!(xml.contains("<soap:Detail><ServerFault>"));

    let parsed = SoapEnvelope::parse(&xml, |_| Vec::new(), None).unwrap();
    let detail = parsed.fault().unwrap().detail_as::<ServerFault>().unwrap();
    assert_eq!(detail.exception_message.as_deref(), Some("disk full"));
}

#[test]
fn test_try_parse_records_error() {
    assert!(SoapEnvelope::try_parse("<broken", |_| Vec::new(), None).is_none());
    assert!(pmosoap::take_last_parse_error().is_some());
    assert!(pmosoap::take_last_parse_error().is_none());
}

#[test]
fn test_message_adapter() {
    let message = PriceRequest {
        auth: Some(Auth {
            token: "k".into(),
        }),
        request: Some(GetPrice {
            item: "plum".into(),
        }),
    };
    let mut envelope = pmosoap::as_soap_envelope(&message);
    let xml = envelope.serialize_xml().unwrap();

    let mut container = SoapEnvelopeContainer::for_message::<PriceRequest>();
    assert!(container.try_parse(&xml));
    assert_eq!(
        container.body_content()[0].downcast_ref::<GetPrice>(),
        Some(&GetPrice {
            item: "plum".into()
        })
    );
    assert_eq!(container.header_content().len(), 1);
    assert!(container.fault_detail_content().is_empty());
    assert_eq!(
        container.types_hint(SoapEnvelopePart::Body)[0].root(),
        ContentType::of::<GetPrice>().root()
    );
}

#[test]
fn test_renamed_operation_round_trip() {
    let message = StockRequest {
        request: Some(GetStock {
            item: "pear".into(),
            warehouse: 7,
        }),
    };
    let xml = pmosoap::as_soap_envelope(&message).serialize_xml().unwrap();
    assert!(xml.contains("<getStock><item>pear</item><warehouse>7</warehouse></getStock>"));

    let mut container = SoapEnvelopeContainer::for_message::<StockRequest>();
    assert!(container.try_parse(&xml));
    assert_eq!(
        container.body_content()[0].downcast_ref::<GetStock>(),
        Some(&GetStock {
            item: "pear".into(),
            warehouse: 7,
        })
    );

    let envelope = SoapEnvelope::parse_body::<GetStock>(&xml).unwrap();
    assert_eq!(envelope.content_as::<GetStock>().unwrap().warehouse, 7);
}

#[test]
fn test_extra_namespaces_survive() {
    let xml = format!(
        r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}" xmlns:m="urn:market"><soap:Body><GetPrice><item>x</item></GetPrice></soap:Body></soap:Envelope>"#
    );
    let mut envelope = SoapEnvelope::parse_body::<GetPrice>(&xml).unwrap();
    assert!(envelope.namespaces().contains("m", "urn:market"));
    let out = envelope.serialize_xml().unwrap();
    assert!(out.contains(r#"xmlns:m="urn:market""#));
}
