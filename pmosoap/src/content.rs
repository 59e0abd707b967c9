//! # Contenu des parties SOAP
//!
//! Le contenu d'un Header, d'un Body ou d'un Detail de Fault est ouvert : il
//! peut s'agir de n'importe quel objet sérialisable, d'un objet qui sait se
//! sérialiser lui-même en fragment, ou d'une séquence ordonnée des deux.
//!
//! ## Fonctionnalités
//!
//! - ✅ [`ContentItem`] : valeur typée effacée, récupérable par downcast
//! - ✅ [`Content`] : valeur unique ou séquence ordonnée
//! - ✅ [`serialize_content`] : rendu à trois cas (fragment, séquence, objet)
//! - ✅ [`ContentType`] : registre candidat (racine attendue → décodeur)
//! - ✅ [`parse_content`] : résolution par essais successifs, premier qui réussit

use std::any::{Any, type_name};
use std::fmt;

use serde::{Serialize, Serializer, de::DeserializeOwned};
use tracing::{debug, trace};
use xmltree::Element;

use crate::binding::{self, ContainerName};
use crate::encoding::Encoding;
use crate::error::Result;
use crate::namespaces::NamespaceSet;
use crate::serialize::SerializeXmlFragment;

trait ContentValue: Send + Sync + fmt::Debug {
    fn inner(&self) -> &dyn Any;
    fn inner_mut(&mut self) -> &mut dyn Any;
    fn into_inner(self: Box<Self>) -> Box<dyn Any>;
    fn type_name(&self) -> &'static str;
    fn fragment_mut(&mut self) -> Option<&mut dyn SerializeXmlFragment>;
    fn serialize_generic(&self, namespaces: &NamespaceSet) -> Result<String>;
    fn to_json(&self) -> Result<serde_json::Value>;
    fn clone_value(&self) -> Box<dyn ContentValue>;
}

#[derive(Debug)]
struct Plain<T>(T);

#[derive(Debug)]
struct Fragment<F>(F);

impl<T> ContentValue for Plain<T>
where
    T: Serialize + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn inner(&self) -> &dyn Any {
        &self.0
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }

    fn into_inner(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.0)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn fragment_mut(&mut self) -> Option<&mut dyn SerializeXmlFragment> {
        None
    }

    fn serialize_generic(&self, namespaces: &NamespaceSet) -> Result<String> {
        binding::serialize_fragment(&self.0, namespaces)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.0)?)
    }

    fn clone_value(&self) -> Box<dyn ContentValue> {
        Box::new(Plain(self.0.clone()))
    }
}

impl<F> ContentValue for Fragment<F>
where
    F: SerializeXmlFragment + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn inner(&self) -> &dyn Any {
        &self.0
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }

    fn into_inner(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.0)
    }

    fn type_name(&self) -> &'static str {
        type_name::<F>()
    }

    fn fragment_mut(&mut self) -> Option<&mut dyn SerializeXmlFragment> {
        Some(&mut self.0)
    }

    fn serialize_generic(&self, namespaces: &NamespaceSet) -> Result<String> {
        binding::serialize_fragment(&self.0, namespaces)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.0)?)
    }

    fn clone_value(&self) -> Box<dyn ContentValue> {
        Box::new(Fragment(self.0.clone()))
    }
}

/// Élément de contenu : une valeur dont le type concret est effacé
pub struct ContentItem(Box<dyn ContentValue>);

impl ContentItem {
    /// Objet sérialisé par le moteur de liaison générique
    pub fn object<T>(value: T) -> Self
    where
        T: Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self(Box::new(Plain(value)))
    }

    /// Objet qui fournit sa propre sérialisation en fragment
    pub fn fragment<F>(value: F) -> Self
    where
        F: SerializeXmlFragment + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self(Box::new(Fragment(value)))
    }

    /// Nom du type concret
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.0.inner().is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.inner().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.inner_mut().downcast_mut::<T>()
    }

    /// Récupère la valeur concrète si le type correspond
    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.0.into_inner().downcast::<T>().ok().map(|value| *value)
    }

    /// Rendu en fragment : la sérialisation propre de l'objet si elle existe,
    /// sinon le moteur générique.
    pub fn render(&mut self, namespaces: &NamespaceSet, encoding: Encoding) -> Result<String> {
        match self.0.fragment_mut() {
            Some(fragment) => fragment.serialize_xml_fragment(namespaces, encoding),
            None => self.0.serialize_generic(namespaces),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.0.to_json()
    }
}

impl Clone for ContentItem {
    fn clone(&self) -> Self {
        Self(self.0.clone_value())
    }
}

impl fmt::Debug for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl Serialize for ContentItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let value = self.to_json().map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }
}

/// Contenu d'une partie SOAP
#[derive(Debug, Clone)]
pub enum Content {
    Single(ContentItem),
    Sequence(Vec<ContentItem>),
}

impl Content {
    pub fn object<T>(value: T) -> Self
    where
        T: Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self::Single(ContentItem::object(value))
    }

    pub fn fragment<F>(value: F) -> Self
    where
        F: SerializeXmlFragment + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self::Single(ContentItem::fragment(value))
    }

    pub fn sequence(items: impl IntoIterator<Item = ContentItem>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// Règle de repliement : aucun élément → `None`, un seul → `Single`,
    /// plusieurs → `Sequence` dans l'ordre donné.
    pub fn from_items(mut items: Vec<ContentItem>) -> Option<Self> {
        match items.len() {
            0 => None,
            1 => items.pop().map(Self::Single),
            _ => Some(Self::Sequence(items)),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Sequence(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        let items: &[ContentItem] = match self {
            Self::Single(item) => std::slice::from_ref(item),
            Self::Sequence(items) => items,
        };
        items.iter()
    }

    pub fn into_items(self) -> Vec<ContentItem> {
        match self {
            Self::Single(item) => vec![item],
            Self::Sequence(items) => items,
        }
    }

    /// Valeur concrète d'un contenu unique
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Single(item) => item.downcast_ref(),
            Self::Sequence(_) => None,
        }
    }

    /// Éléments de la séquence (ou l'élément unique) qui sont des `T`
    pub fn items_of<T: 'static>(&self) -> Vec<&T> {
        self.iter().filter_map(|item| item.downcast_ref::<T>()).collect()
    }
}

impl From<ContentItem> for Content {
    fn from(item: ContentItem) -> Self {
        Self::Single(item)
    }
}

impl From<Vec<ContentItem>> for Content {
    fn from(items: Vec<ContentItem>) -> Self {
        Self::Sequence(items)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Single(item) => Serialize::serialize(item, serializer),
            Self::Sequence(items) => items.serialize(serializer),
        }
    }
}

/// Rendu d'un contenu, dans l'ordre de priorité :
/// 1. objet capable de se sérialiser en fragment (l'encodage lui est transmis) ;
/// 2. séquence, élément par élément, concaténés dans l'ordre ;
/// 3. objet ordinaire, via le moteur générique.
///
/// Un contenu absent donne une chaîne vide.
pub fn serialize_content(
    content: Option<&mut Content>,
    namespaces: &NamespaceSet,
    encoding: Encoding,
) -> Result<String> {
    let Some(content) = content else {
        return Ok(String::new());
    };
    match content {
        Content::Single(item) => item.render(namespaces, encoding),
        Content::Sequence(items) => {
            let mut xml = String::new();
            for item in items.iter_mut() {
                xml.push_str(&item.render(namespaces, encoding)?);
            }
            Ok(xml)
        }
    }
}

type Decoder = fn(&str) -> Result<ContentItem>;

/// Type candidat pour la résolution d'un contenu
#[derive(Debug, Clone)]
pub struct ContentType {
    type_name: &'static str,
    root: Option<String>,
    decode: Decoder,
}

impl ContentType {
    /// Candidat dont la racine attendue est celle que serde écrit pour `T` :
    /// le nom de la structure, `#[serde(rename)]` compris. Une énumération
    /// n'a pas de contrôle de racine (la racine est le nom de la variante).
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            root: default_root::<T>(),
            decode: decode_object::<T>,
        }
    }

    /// Candidat sans contrôle de racine : tout élément que `T` sait lire
    pub fn any<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            root: None,
            ..Self::of::<T>()
        }
    }

    /// Candidat dont les instances décodées gardent leur sérialisation propre
    pub fn fragment_of<F>() -> Self
    where
        F: SerializeXmlFragment
            + DeserializeOwned
            + Serialize
            + Clone
            + fmt::Debug
            + Send
            + Sync
            + 'static,
    {
        Self {
            type_name: type_name::<F>(),
            root: default_root::<F>(),
            decode: decode_fragment::<F>,
        }
    }

    /// Remplace le nom de racine attendu
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Contrôle de racine sur le nom local de l'élément
    pub fn accepts(&self, element: &Element) -> bool {
        self.root.as_deref().is_none_or(|root| element.name == root)
    }

    /// Essaie de décoder `element` (dont `xml` est le rendu)
    pub fn try_decode(&self, element: &Element, xml: &str) -> Option<ContentItem> {
        if !self.accepts(element) {
            return None;
        }
        match (self.decode)(xml) {
            Ok(item) => {
                trace!(element=%element.name, candidate=self.type_name, "Content element resolved");
                Some(item)
            }
            Err(e) => {
                trace!(element=%element.name, candidate=self.type_name, error=%e, "Candidate rejected");
                None
            }
        }
    }
}

fn decode_object<T>(xml: &str) -> Result<ContentItem>
where
    T: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
{
    binding::deserialize_fragment::<T>(xml).map(ContentItem::object)
}

fn decode_fragment<F>(xml: &str) -> Result<ContentItem>
where
    F: SerializeXmlFragment + DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static,
{
    binding::deserialize_fragment::<F>(xml).map(ContentItem::fragment)
}

fn default_root<T: DeserializeOwned>() -> Option<String> {
    match binding::container_name::<T>() {
        ContainerName::Named(name) => Some(name.to_string()),
        ContainerName::Enum => None,
        ContainerName::Unknown => Some(short_type_name::<T>().to_string()),
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Résout les enfants directs de `element` contre les candidats `types`.
///
/// Pour chaque enfant, le premier candidat (dans l'ordre donné) qui décode
/// l'élément l'emporte, même si un candidat suivant correspondrait mieux.
/// Un enfant qu'aucun candidat ne décode est ignoré. Le résultat suit la
/// règle de [`Content::from_items`].
pub fn parse_content(element: &Element, types: &[ContentType]) -> Option<Content> {
    if types.is_empty() {
        return None;
    }

    let mut items = Vec::new();
    for child in binding::child_elements(element) {
        let xml = match binding::element_to_string(child) {
            Ok(xml) => xml,
            Err(e) => {
                debug!(element=%child.name, error=%e, "Cannot render content element, dropped");
                continue;
            }
        };
        match types.iter().find_map(|ct| ct.try_decode(child, &xml)) {
            Some(item) => items.push(item),
            None => debug!(element=%child.name, "No candidate type for content element, dropped"),
        }
    }
    Content::from_items(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Loose {
        #[serde(default)]
        text: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Stamp {
        value: String,
        #[serde(skip)]
        seen: Option<Encoding>,
    }

    impl SerializeXmlFragment for Stamp {
        fn serialize_xml_fragment(
            &mut self,
            namespaces: &NamespaceSet,
            encoding: Encoding,
        ) -> Result<String> {
            self.seen = Some(encoding);
            Ok(format!(
                "<stamp ns=\"{}\">{}</stamp>",
                namespaces.len(),
                self.value
            ))
        }
    }

    fn note(text: &str) -> Note {
        Note { text: text.into() }
    }

    #[test]
    fn test_absent_content_is_empty() {
        let xml = serialize_content(None, &NamespaceSet::new(), Encoding::Utf8).unwrap();
        assert_eq!(xml, "");
    }

    #[test]
    fn test_fragment_capability_wins_and_receives_encoding() {
        let mut content = Content::fragment(Stamp {
            value: "v".into(),
            seen: None,
        });
        let namespaces: NamespaceSet = [("m", "urn:m")].into_iter().collect();

        let xml = serialize_content(Some(&mut content), &namespaces, Encoding::Utf16).unwrap();
        assert_eq!(xml, r#"<stamp ns="1">v</stamp>"#);
        assert_eq!(
            content.downcast_ref::<Stamp>().unwrap().seen,
            Some(Encoding::Utf16)
        );
    }

    #[test]
    fn test_sequence_mixes_fragments_and_objects() {
        let mut content = Content::sequence([
            ContentItem::object(note("a")),
            ContentItem::fragment(Stamp {
                value: "b".into(),
                seen: None,
            }),
            ContentItem::object(note("c")),
        ]);

        let xml = serialize_content(Some(&mut content), &NamespaceSet::new(), Encoding::Utf8).unwrap();
        assert_eq!(
            xml,
            r#"<Note><text>a</text></Note><stamp ns="0">b</stamp><Note><text>c</text></Note>"#
        );
    }

    #[test]
    fn test_plain_object_gets_namespaces() {
        let mut content = Content::object(note("x"));
        let namespaces: NamespaceSet = [("m", "urn:m")].into_iter().collect();
        let xml = serialize_content(Some(&mut content), &namespaces, Encoding::Utf8).unwrap();
        assert_eq!(xml, r#"<Note xmlns:m="urn:m"><text>x</text></Note>"#);
    }

    #[test]
    fn test_parse_content_collapsing() {
        let none = binding::parse_document("<Body><Other/></Body>").unwrap();
        assert!(parse_content(&none, &[ContentType::of::<Note>()]).is_none());

        let one = binding::parse_document("<Body><Note><text>a</text></Note><Other/></Body>").unwrap();
        let content = parse_content(&one, &[ContentType::of::<Note>()]).unwrap();
        assert_eq!(content.downcast_ref::<Note>(), Some(&note("a")));

        let many = binding::parse_document(
            "<Body><Note><text>a</text></Note><Other/><Note><text>b</text></Note></Body>",
        )
        .unwrap();
        let content = parse_content(&many, &[ContentType::of::<Note>()]).unwrap();
        assert!(content.is_sequence());
        assert_eq!(content.items_of::<Note>(), vec![&note("a"), &note("b")]);
    }

    #[test]
    fn test_parse_content_without_candidates() {
        let element = binding::parse_document("<Body><Note><text>a</text></Note></Body>").unwrap();
        assert!(parse_content(&element, &[]).is_none());
    }

    #[test]
    fn test_first_matching_candidate_wins() {
        let element = binding::parse_document("<Body><Note><text>a</text></Note></Body>").unwrap();

        let content = parse_content(
            &element,
            &[ContentType::any::<Loose>(), ContentType::of::<Note>()],
        )
        .unwrap();
        assert!(content.downcast_ref::<Loose>().is_some());

        let content = parse_content(
            &element,
            &[ContentType::of::<Note>(), ContentType::any::<Loose>()],
        )
        .unwrap();
        assert!(content.downcast_ref::<Note>().is_some());
    }

    #[test]
    fn test_with_root_and_short_name() {
        assert_eq!(ContentType::of::<Note>().root(), Some("Note"));
        assert_eq!(short_type_name::<Vec<Note>>(), "Vec");
        assert_eq!(
            ContentType::of::<Note>().with_root("Memo").root(),
            Some("Memo")
        );
    }

    #[test]
    fn test_renamed_type_resolves_by_serde_root() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename = "getQuote")]
        struct GetQuote {
            symbol: String,
        }

        let candidate = ContentType::of::<GetQuote>();
        assert_eq!(candidate.root(), Some("getQuote"));

        let mut content = Content::object(GetQuote { symbol: "ACME".into() });
        let xml = serialize_content(Some(&mut content), &NamespaceSet::new(), Encoding::Utf8).unwrap();
        let body = binding::parse_document(&format!("<Body>{xml}</Body>")).unwrap();
        let parsed = parse_content(&body, &[candidate]).unwrap();
        assert_eq!(
            parsed.downcast_ref::<GetQuote>(),
            Some(&GetQuote { symbol: "ACME".into() })
        );
    }

    #[test]
    fn test_downcast_and_json() {
        let item = ContentItem::object(note("z"));
        assert!(item.is::<Note>());
        assert_eq!(item.to_json().unwrap(), serde_json::json!({"text": "z"}));

        assert!(item.clone().downcast::<Loose>().is_none());
        assert_eq!(item.downcast::<Note>(), Some(note("z")));
    }
}
