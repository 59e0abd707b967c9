//! Enveloppe SOAP
//!
//! L'enveloppe compose l'en-tête optionnel et le corps obligatoire. Elle
//! résout le contexte de rendu (version, préfixe, encodage) une seule fois et
//! le transmet explicitement à ses parties.
//!
//! ✅ Fonctionnalités :
//! - Fabriques ([`SoapEnvelope::create`], [`SoapEnvelope::from_content`], ...)
//! - Déclaration XML optionnelle, namespaces supplémentaires triés
//! - Parsing avec détection de la version depuis l'élément racine
//! - Variantes `try_*` qui n'échouent pas

use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, trace};

use super::body::SoapBody;
use super::container::{SoapContainer, SoapContext, SoapPart};
use super::fault::Fault;
use super::header::SoapHeader;
use super::part::SoapEnvelopePart;
use crate::binding;
use crate::config::get_config;
use crate::content::{Content, ContentType};
use crate::error::{self, Result, SoapError};
use crate::namespaces::{NamespaceSet, QualifiedNamespace};
use crate::encoding::Encoding;
use crate::serialize::{
    SerializeJson, SerializeState, SerializeXml, SerializeXmlFragment, XmlSerializable,
};
use crate::version::SoapVersion;

/// Préfixes réservés jamais recopiés comme namespaces supplémentaires
const RESERVED_PREFIXES: [&str; 2] = ["xml", "xmlns"];

/// Message SOAP complet
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub(crate) container: SoapContainer,
    header: Option<SoapHeader>,
    body: Option<SoapBody>,
    exclude_xml_declaration: bool,
}

impl Default for SoapEnvelope {
    fn default() -> Self {
        Self::create()
    }
}

impl SoapEnvelope {
    /// Enveloppe vide (le corps devra être fourni avant la sérialisation)
    pub fn create() -> Self {
        Self {
            container: SoapContainer::with_state(SerializeState::sorted()),
            header: None,
            body: None,
            exclude_xml_declaration: false,
        }
    }

    pub fn with_body(body: impl Into<SoapBody>) -> Self {
        let mut envelope = Self::create();
        envelope.body = Some(body.into());
        envelope
    }

    pub fn with_header_and_body(header: SoapHeader, body: impl Into<SoapBody>) -> Self {
        let mut envelope = Self::with_body(body);
        envelope.header = Some(header);
        envelope
    }

    /// Enveloppe construite à partir des contenus du corps et de l'en-tête
    pub fn from_content(body: Option<Content>, header: Option<Content>) -> Self {
        let namespaces = NamespaceSet::new();
        let mut envelope = Self::create();
        envelope.body = Some(Self::create_body(body, &namespaces));
        envelope.header = Self::create_header(header, &namespaces);
        envelope
    }

    pub fn create_body(content: Option<Content>, namespaces: &NamespaceSet) -> SoapBody {
        SoapBody::with_namespaces(content, namespaces)
    }

    pub fn create_fault_body(fault: impl Into<Fault>, namespaces: &NamespaceSet) -> SoapBody {
        let mut body = SoapBody::with_namespaces(None, namespaces);
        body.set_fault(Some(fault.into()));
        body
    }

    /// En-tête à partir d'un contenu ; sans contenu ni namespace, aucun
    /// en-tête n'est créé.
    pub fn create_header(content: Option<Content>, namespaces: &NamespaceSet) -> Option<SoapHeader> {
        if content.is_none() && namespaces.is_empty() {
            return None;
        }
        Some(SoapHeader::with_namespaces(content, namespaces))
    }

    pub fn header(&self) -> Option<&SoapHeader> {
        self.header.as_ref()
    }

    pub fn header_mut(&mut self) -> Option<&mut SoapHeader> {
        self.header.as_mut()
    }

    pub fn body(&self) -> Option<&SoapBody> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut SoapBody> {
        self.body.as_mut()
    }

    pub fn set_header(&mut self, header: Option<SoapHeader>) -> &mut Self {
        self.header = header;
        self
    }

    pub fn set_body(&mut self, body: impl Into<SoapBody>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Place un Fault dans le corps, créé au besoin
    pub fn set_fault(&mut self, fault: impl Into<Fault>) -> &mut Self {
        self.body
            .get_or_insert_with(SoapBody::new)
            .set_fault(Some(fault.into()));
        self
    }

    pub fn set_exclude_xml_declaration(&mut self, exclude: bool) -> &mut Self {
        self.exclude_xml_declaration = exclude;
        self
    }

    pub fn exclude_xml_declaration(&self) -> bool {
        self.exclude_xml_declaration
    }

    pub fn header_content(&self) -> Option<&Content> {
        self.header.as_ref().and_then(|header| header.content())
    }

    pub fn body_content(&self) -> Option<&Content> {
        self.body.as_ref().and_then(|body| body.content())
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.body.as_ref().and_then(SoapBody::fault)
    }

    /// Contexte de rendu : namespace et préfixe de l'instance, sinon ceux de
    /// la configuration ; encodage UTF-8 par défaut.
    pub fn context(&self) -> Result<SoapContext> {
        self.container.resolve_context(&get_config())
    }

    /// Attributs de l'élément `Envelope` : la déclaration du namespace cible
    /// d'abord, puis les namespaces supplémentaires, puis les attributs libres
    /// (qui ne remplacent jamais la déclaration cible).
    fn envelope_attributes(&self, ctx: &SoapContext) -> String {
        let target = QualifiedNamespace::new(&ctx.prefix, ctx.namespace());
        let target_key = target.attribute_name();
        let mut entries: Vec<(String, String)> = vec![(target_key.clone(), target.uri)];

        let mut extra = self.container.state.namespaces.clone();
        if self.container.state.namespaces_sorted {
            extra.sort();
        }
        for namespace in &extra {
            if namespace.prefix == ctx.prefix {
                debug!(prefix=%namespace.prefix, uri=%namespace.uri, "Namespace shadows the envelope prefix, skipped");
                continue;
            }
            let key = namespace.attribute_name();
            if entries.iter().all(|(k, _)| *k != key) {
                entries.push((key, namespace.uri.clone()));
            }
        }

        for (key, value) in self.container.state.attributes.iter() {
            if key == target_key {
                continue;
            }
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => entries.push((key.to_string(), value.to_string())),
            }
        }

        entries
            .iter()
            .map(|(key, value)| format!(r#" {}="{}""#, key, quick_xml::escape::escape(value.as_str())))
            .collect()
    }

    /// Rendu complet dans le contexte `ctx`
    pub fn serialize_with(&mut self, ctx: &SoapContext) -> Result<String> {
        let declaration = !self.exclude_xml_declaration;
        self.render(ctx, declaration)
    }

    fn render(&mut self, ctx: &SoapContext, declaration: bool) -> Result<String> {
        let attributes = self.envelope_attributes(ctx);
        let Some(body) = self.body.as_mut() else {
            return Err(SoapError::missing_part("Body"));
        };
        let body_xml = body.serialize_with(ctx)?;
        let header_xml = match self.header.as_mut() {
            Some(header) => header.serialize_with(ctx)?,
            None => String::new(),
        };

        let mut xml = String::new();
        if declaration {
            xml.push_str(&format!(
                r#"<?xml version="1.0" encoding="{}"?>"#,
                ctx.encoding.web_name()
            ));
        }
        xml.push_str(&format!(
            "<{p}:Envelope{attributes}>{header_xml}{body_xml}</{p}:Envelope>",
            p = ctx.prefix
        ));
        let xml = binding::strip_nil_elements(&xml);
        trace!(version=%ctx.version, bytes = xml.len(), "SOAP envelope serialized");
        Ok(xml)
    }

    /// Lit une enveloppe.
    ///
    /// `hints` fournit les types candidats de chaque partie. Sans
    /// `target_namespace`, la version est celle de l'élément racine quand il
    /// porte un namespace SOAP connu, sinon celle de la configuration. Un
    /// corps absent est une erreur ; un en-tête absent ne l'est pas.
    pub fn parse<F>(xml: &str, hints: F, target_namespace: Option<&str>) -> Result<Self>
    where
        F: Fn(SoapEnvelopePart) -> Vec<ContentType>,
    {
        let document = binding::parse_document(xml)?;
        let namespace = match target_namespace {
            Some(namespace) => namespace.to_string(),
            None => detect_target_namespace(&document)
                .unwrap_or_else(|| get_config().target_namespace.clone()),
        };
        let version = SoapVersion::from_namespace(&namespace)?;

        let body = SoapBody::parse(
            &document,
            &hints(SoapEnvelopePart::Body),
            &hints(SoapEnvelopePart::Fault),
            true,
            Some(&namespace),
        )?
        .ok_or_else(|| SoapError::missing_part("Body"))?;
        let header = SoapHeader::parse(
            &document,
            &hints(SoapEnvelopePart::Header),
            false,
            Some(&namespace),
        )?;

        let mut envelope = Self::create();
        envelope.header = header;
        envelope.body = Some(body);
        envelope.set_target_namespace(version.namespace());
        if let Some(prefix) = document.prefix.as_deref() {
            envelope.set_prefix(prefix);
        }

        if let Some(declared) = document.namespaces.as_ref() {
            let own_prefix = document.prefix.as_deref().unwrap_or_default();
            let extra: NamespaceSet = declared
                .0
                .iter()
                .filter(|(prefix, uri)| {
                    !RESERVED_PREFIXES.contains(&prefix.as_str())
                        && !uri.is_empty()
                        && prefix.as_str() != own_prefix
                })
                .map(|(prefix, uri)| QualifiedNamespace::new(prefix.as_str(), uri.as_str()))
                .collect();
            envelope.set_namespaces(&extra);
        }

        debug!(version=%version, has_header = envelope.header.is_some(), "SOAP envelope parsed");
        Ok(envelope)
    }

    /// Variante de [`SoapEnvelope::parse`] qui n'échoue pas
    pub fn try_parse<F>(xml: &str, hints: F, target_namespace: Option<&str>) -> Option<Self>
    where
        F: Fn(SoapEnvelopePart) -> Vec<ContentType>,
    {
        error::swallow(Self::parse(xml, hints, target_namespace).map(Some))
    }

    /// Lit une enveloppe dont le corps est un `B`
    pub fn parse_body<B>(xml: &str) -> Result<Self>
    where
        B: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self::parse(
            xml,
            |part| match part {
                SoapEnvelopePart::Body => vec![ContentType::of::<B>()],
                _ => Vec::new(),
            },
            None,
        )
    }

    pub fn try_parse_body<B>(xml: &str) -> Option<Self>
    where
        B: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        error::swallow(Self::parse_body::<B>(xml).map(Some))
    }

    /// Lit une enveloppe dont l'en-tête est un `H` et le corps un `B`
    pub fn parse_typed<H, B>(xml: &str) -> Result<Self>
    where
        H: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
        B: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self::parse(
            xml,
            |part| match part {
                SoapEnvelopePart::Header => vec![ContentType::of::<H>()],
                SoapEnvelopePart::Body => vec![ContentType::of::<B>()],
                SoapEnvelopePart::Fault => Vec::new(),
            },
            None,
        )
    }

    pub fn try_parse_typed<H, B>(xml: &str) -> Option<Self>
    where
        H: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
        B: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        error::swallow(Self::parse_typed::<H, B>(xml).map(Some))
    }
}

/// Namespace de l'élément racine `Envelope`, s'il désigne une version connue
fn detect_target_namespace(document: &xmltree::Element) -> Option<String> {
    if document.name != "Envelope" {
        return None;
    }
    let namespace = document.namespace.as_deref()?;
    SoapVersion::from_namespace(namespace)
        .ok()
        .map(|_| namespace.to_string())
}

impl SoapPart for SoapEnvelope {
    fn container(&self) -> &SoapContainer {
        &self.container
    }

    fn container_mut(&mut self) -> &mut SoapContainer {
        &mut self.container
    }

    fn content(&self) -> Option<&Content> {
        self.body_content()
    }

    fn content_mut(&mut self) -> Option<&mut Content> {
        self.body.as_mut().and_then(|body| body.content_mut())
    }

    /// Écrit le contenu du corps, créé au besoin
    fn set_content(&mut self, content: Option<Content>) {
        self.body
            .get_or_insert_with(SoapBody::new)
            .set_content(content);
    }

    fn take_content(&mut self) -> Option<Content> {
        self.body.as_mut().and_then(|body| body.take_content())
    }
}

impl XmlSerializable for SoapEnvelope {
    fn state(&self) -> &SerializeState {
        &self.container.state
    }

    fn state_mut(&mut self) -> &mut SerializeState {
        &mut self.container.state
    }
}

impl SerializeXml for SoapEnvelope {
    fn serialize_xml(&mut self) -> Result<String> {
        if self.body.is_none() {
            return Err(SoapError::missing_part("Body"));
        }
        let ctx = self.context()?;
        self.serialize_with(&ctx)
    }
}

/// Enveloppe embarquée dans un document plus large : jamais de déclaration
/// XML, quel que soit `exclude_xml_declaration`.
impl SerializeXmlFragment for SoapEnvelope {
    fn serialize_xml_fragment(
        &mut self,
        namespaces: &NamespaceSet,
        encoding: Encoding,
    ) -> Result<String> {
        self.container.state.set_namespaces(namespaces);
        let ctx = self.context()?.with_encoding(encoding);
        self.render(&ctx, false)
    }
}

impl Serialize for SoapEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        if let Some(header) = &self.header {
            state.serialize_field("Header", header)?;
        }
        state.serialize_field("Body", &self.body)?;
        state.end()
    }
}

impl SerializeJson for SoapEnvelope {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use crate::soap::fault::{FaultCodeEnum, SoapFault};
    use crate::version::{SOAP11_NAMESPACE, SOAP12_NAMESPACE};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct GetPrice {
        item: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Auth {
        token: String,
    }

    #[derive(Debug, Clone, Serialize)]
    struct Quote {
        #[serde(rename = "@xsi:nil")]
        nil: bool,
    }

    fn ctx() -> SoapContext {
        SoapContext::new(SoapVersion::V12, "soap", Encoding::Utf8)
    }

    #[test]
    fn test_missing_body() {
        let mut envelope = SoapEnvelope::create();
        assert!(envelope.serialize_xml().unwrap_err().is_missing_part());
        assert!(envelope.serialize_with(&ctx()).unwrap_err().is_missing_part());
    }

    #[test]
    fn test_document_shape() {
        let mut envelope = SoapEnvelope::from_content(
            Some(Content::object(GetPrice { item: "apple".into() })),
            None,
        );
        let xml = envelope.serialize_with(&ctx()).unwrap();
        assert_eq!(
            xml,
            format!(
                r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}"><soap:Body><GetPrice><item>apple</item></GetPrice></soap:Body></soap:Envelope>"#
            )
        );
    }

    #[test]
    fn test_nil_elements_are_stripped() {
        let mut envelope = SoapEnvelope::with_body(Content::sequence([
            ContentItem::object(GetPrice { item: "a".into() }),
            ContentItem::object(Quote { nil: true }),
        ]));
        let xml = envelope.serialize_with(&ctx()).unwrap();
        assert!(xml.contains("<GetPrice><item>a</item></GetPrice></soap:Body>"), "{xml}");
        assert!(!xml.contains("Quote"));
    }

    #[test]
    fn test_exclude_declaration_and_encoding() {
        let mut envelope = SoapEnvelope::with_body(Content::object(GetPrice { item: "a".into() }));
        envelope.set_exclude_xml_declaration(true);
        let xml = envelope.serialize_with(&ctx()).unwrap();
        assert!(xml.starts_with("<soap:Envelope"));

        envelope.set_exclude_xml_declaration(false);
        let xml = envelope
            .serialize_with(&ctx().with_encoding(Encoding::Iso8859_1))
            .unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="iso-8859-1"?>"#));
    }

    #[test]
    fn test_fragment_has_no_declaration() {
        let mut envelope = SoapEnvelope::with_body(Content::object(GetPrice { item: "a".into() }));
        let namespaces: NamespaceSet = [("m", "urn:market")].into_iter().collect();
        let xml = envelope
            .serialize_xml_fragment(&namespaces, Encoding::Iso8859_1)
            .unwrap();
        assert_eq!(
            xml,
            format!(
                r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}" xmlns:m="urn:market"><soap:Body><GetPrice><item>a</item></GetPrice></soap:Body></soap:Envelope>"#
            )
        );
        assert!(envelope.namespaces().contains("m", "urn:market"));
        assert!(!envelope.exclude_xml_declaration());
    }

    #[test]
    fn test_envelope_attributes_order() {
        let mut envelope = SoapEnvelope::with_body(Content::object(GetPrice { item: "a".into() }));
        envelope.set_namespaces(&[("z", "urn:z"), ("a", "urn:a")].into_iter().collect());
        envelope.set_namespaces(&[("soap", "urn:shadow")].into_iter().collect());
        envelope.attributes_mut().insert("xmlns:soap", "urn:ignored");
        envelope.attributes_mut().insert("xmlns:z", "urn:z2");
        envelope.attributes_mut().insert("id", "m1");

        let xml = envelope.serialize_with(&ctx()).unwrap();
        let expected = format!(
            r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}" xmlns:a="urn:a" xmlns:z="urn:z2" id="m1">"#
        );
        assert!(xml.contains(&expected), "{xml}");
    }

    #[test]
    fn test_create_header_rule() {
        assert!(SoapEnvelope::create_header(None, &NamespaceSet::new()).is_none());
        let namespaces: NamespaceSet = [("m", "urn:m")].into_iter().collect();
        assert!(SoapEnvelope::create_header(None, &namespaces).is_some());
    }

    #[test]
    fn test_content_shortcut_creates_body() {
        let mut envelope = SoapEnvelope::create();
        assert!(envelope.content().is_none());
        envelope.set_content(Some(Content::object(GetPrice { item: "kiwi".into() })));
        assert_eq!(envelope.content_as::<GetPrice>().unwrap().item, "kiwi");
        assert!(envelope.body().is_some());
    }

    #[test]
    fn test_round_trip_typed() {
        let mut envelope = SoapEnvelope::from_content(
            Some(Content::object(GetPrice { item: "fig".into() })),
            Some(Content::object(Auth { token: "t0k".into() })),
        );
        let xml = envelope.serialize_xml().unwrap();
        let parsed = SoapEnvelope::parse_typed::<Auth, GetPrice>(&xml).unwrap();
        assert_eq!(
            parsed.header_content().unwrap().downcast_ref::<Auth>(),
            Some(&Auth { token: "t0k".into() })
        );
        assert_eq!(parsed.content_as::<GetPrice>().unwrap().item, "fig");
    }

    #[test]
    fn test_round_trip_renamed_body() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename = "getPrice")]
        struct LowerGetPrice {
            item: String,
        }

        let mut envelope = SoapEnvelope::with_body(Content::object(LowerGetPrice { item: "fig".into() }));
        let xml = envelope.serialize_xml().unwrap();
        assert!(xml.contains("<soap:Body><getPrice><item>fig</item></getPrice></soap:Body>"));

        let parsed = SoapEnvelope::parse_body::<LowerGetPrice>(&xml).unwrap();
        assert_eq!(parsed.content_as::<LowerGetPrice>().unwrap().item, "fig");
    }

    #[test]
    fn test_parse_detects_soap11() {
        let xml = format!(
            r#"<s:Envelope xmlns:s="{SOAP11_NAMESPACE}" xmlns:m="urn:m"><s:Body><GetPrice><item>x</item></GetPrice></s:Body></s:Envelope>"#
        );
        let envelope = SoapEnvelope::parse_body::<GetPrice>(&xml).unwrap();
        assert_eq!(envelope.target_namespace(), Some(SOAP11_NAMESPACE));
        assert_eq!(envelope.prefix(), Some("s"));
        assert!(envelope.namespaces().contains("m", "urn:m"));
        assert_eq!(envelope.namespaces().len(), 1);
    }

    #[test]
    fn test_parse_missing_body() {
        let xml = format!(r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}"/>"#);
        assert!(SoapEnvelope::parse_body::<GetPrice>(&xml).unwrap_err().is_missing_part());
        assert!(SoapEnvelope::try_parse_body::<GetPrice>(&xml).is_none());
        assert!(error::take_last_parse_error().unwrap().is_missing_part());
    }

    #[test]
    fn test_parse_explicit_namespace_mismatch() {
        let xml = format!(
            r#"<soap:Envelope xmlns:soap="{SOAP12_NAMESPACE}"><soap:Body><GetPrice><item>x</item></GetPrice></soap:Body></soap:Envelope>"#
        );
        let hints = |_: SoapEnvelopePart| vec![ContentType::of::<GetPrice>()];
        assert!(SoapEnvelope::parse(&xml, hints, Some(SOAP11_NAMESPACE)).is_err());
        assert!(SoapEnvelope::parse(&xml, hints, Some("urn:bogus")).unwrap_err().is_version_error());
    }

    #[test]
    fn test_fault_envelope() {
        let mut envelope = SoapEnvelope::create();
        envelope.set_fault(SoapFault::new(FaultCodeEnum::Sender, [("Bad request", "en")]));
        let xml = envelope.serialize_with(&ctx()).unwrap();
        assert_eq!(xml.matches("xmlns:soap").count(), 1);

        let parsed = SoapEnvelope::parse(&xml, |_| Vec::new(), None).unwrap();
        assert!(parsed.body_content().is_none());
        let fault = parsed.fault().unwrap().as_v12().unwrap();
        assert_eq!(fault.reason.text_for("en"), Some("Bad request"));
    }
}
