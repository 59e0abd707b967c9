//! Moteur de liaison XML
//!
//! Façade unique sur les deux bibliothèques XML du crate :
//! - `quick-xml` + `serde` pour les objets typés ([`serialize`],
//!   [`serialize_fragment`], [`deserialize`], [`can_deserialize`]) ;
//! - `xmltree` pour les arbres d'éléments (parsing de documents et de
//!   fragments, recherche, émission).
//!
//! On y trouve aussi les deux post-traitements textuels appliqués aux
//! documents produits : suppression des attributs de l'élément ouvrant
//! ([`strip_element_attributes`]) et des éléments `xsi:nil`
//! ([`strip_nil_elements`]).

use std::any::type_name;

use quick_xml::escape::escape;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, DeserializeOwned, Visitor};
use serde::Serialize;
use tracing::trace;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::config::get_config;
use crate::encoding::Encoding;
use crate::error::{Result, SoapError};
use crate::namespaces::NamespaceSet;
use crate::version::namespaces_match;

/// Sérialise un objet en document XML complet (avec déclaration)
pub fn serialize<T: Serialize + ?Sized>(
    value: &T,
    namespaces: &NamespaceSet,
    encoding: Encoding,
) -> Result<String> {
    let fragment = serialize_fragment(value, namespaces)?;
    let document = format!(
        r#"<?xml version="1.0" encoding="{}"?>{}"#,
        encoding.web_name(),
        fragment
    );
    Ok(strip_nil_elements(&document))
}

/// Sérialise un objet en fragment, les namespaces étant déclarés sur
/// l'élément racine.
pub fn serialize_fragment<T: Serialize + ?Sized>(
    value: &T,
    namespaces: &NamespaceSet,
) -> Result<String> {
    let xml = quick_xml::se::to_string(value)?;
    Ok(inject_namespaces(&xml, namespaces))
}

/// Ajoute les déclarations `xmlns` manquantes à l'élément racine de `xml`
pub fn inject_namespaces(xml: &str, namespaces: &NamespaceSet) -> String {
    if namespaces.is_empty() {
        return xml.to_string();
    }
    let Some((name_end, tag_end)) = root_start_tag(xml) else {
        return xml.to_string();
    };

    let start_tag = &xml[..tag_end];
    let mut declarations = String::new();
    for ns in namespaces {
        let attribute = ns.attribute_name();
        if start_tag.contains(&format!(" {attribute}=")) {
            continue;
        }
        declarations.push_str(&format!(" {}=\"{}\"", attribute, escape(ns.uri.as_str())));
    }

    let mut out = String::with_capacity(xml.len() + declarations.len());
    out.push_str(&xml[..name_end]);
    out.push_str(&declarations);
    out.push_str(&xml[name_end..]);
    out
}

// (fin du nom, position du '>') de la première balise ouvrante
fn root_start_tag(xml: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    loop {
        let open = pos + xml[pos..].find('<')?;
        let rest = &xml[open + 1..];
        if rest.starts_with('?') || rest.starts_with('!') {
            pos = open + 1 + rest.find('>')? + 1;
            continue;
        }
        let name_len = rest.find(|c: char| c.is_whitespace() || c == '/' || c == '>')?;
        let name_end = open + 1 + name_len;
        let tag_end = name_end + xml[name_end..].find('>')?;
        return Some((name_end, tag_end));
    }
}

/// Indique si `xml` peut être lu comme une instance dont la racine est `root`.
///
/// Sans nom de racine, tout document bien formé est accepté.
pub fn can_deserialize(xml: &str, root: Option<&str>) -> bool {
    match parse_document(xml) {
        Ok(element) => root.is_none_or(|name| element.name == name),
        Err(_) => false,
    }
}

/// Désérialise `xml` en `T`.
///
/// Si la racine ne correspond pas, retourne `Ok(None)`, ou une erreur
/// [`SoapError::CannotDeserialize`] quand `throw_if_cannot_deserialize` (ou à
/// défaut la configuration globale) le demande.
pub fn deserialize<T: DeserializeOwned>(
    xml: &str,
    root: Option<&str>,
    throw_if_cannot_deserialize: Option<bool>,
) -> Result<Option<T>> {
    if xml.trim().is_empty() {
        return Ok(None);
    }
    if !can_deserialize(xml, root) {
        let throw = throw_if_cannot_deserialize
            .unwrap_or_else(|| get_config().throw_if_cannot_deserialize);
        if throw {
            return Err(SoapError::CannotDeserialize(type_name::<T>().to_string()));
        }
        trace!(target_type = type_name::<T>(), "Document root does not match");
        return Ok(None);
    }
    deserialize_fragment(xml).map(Some)
}

/// Désérialise `xml` en `T` sans contrôle du nom de la racine
pub fn deserialize_fragment<T: DeserializeOwned>(xml: &str) -> Result<T> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Parse un document ; une déclaration XML éventuelle est ignorée
/// (l'étiquette d'encodage ne décrit pas une `&str`).
pub fn parse_document(xml: &str) -> Result<Element> {
    let body = strip_xml_declaration(xml.trim());
    Ok(Element::parse(body.as_bytes())?)
}

fn strip_xml_declaration(xml: &str) -> &str {
    let is_declaration = xml
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("<?xml"));
    if is_declaration {
        if let Some(end) = xml.find("?>") {
            return xml[end + 2..].trim_start();
        }
    }
    xml
}

/// Parse un fragment dans lequel `prefix` est lié à `uri`, et retourne son
/// premier élément.
pub fn parse_fragment(xml: &str, prefix: &str, uri: &str) -> Result<Element> {
    let document = format!(r#"<document xmlns:{prefix}="{uri}">{xml}</document>"#);
    let root = Element::parse(document.as_bytes())?;
    root.children
        .into_iter()
        .find_map(|node| match node {
            XMLNode::Element(element) => Some(element),
            _ => None,
        })
        .ok_or_else(|| SoapError::format("XML fragment contains no element"))
}

/// Émet un élément sans déclaration ni indentation
pub fn element_to_string(element: &Element) -> Result<String> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .perform_indent(false)
        .write_document_declaration(false)
        .normalize_empty_elements(false);
    element.write_with_config(&mut buf, config)?;
    String::from_utf8(buf).map_err(|e| SoapError::format(e.to_string()))
}

/// Recherche en profondeur (pré-ordre, `root` compris) du premier élément
/// de nom local `name` dans `namespace`.
///
/// `None` désigne un élément non qualifié. Un `/` final du namespace est
/// toléré.
pub fn find_element<'a>(
    root: &'a Element,
    name: &str,
    namespace: Option<&str>,
) -> Option<&'a Element> {
    if root.name == name && namespaces_match(root.namespace.as_deref(), namespace) {
        return Some(root);
    }
    child_elements(root).find_map(|child| find_element(child, name, namespace))
}

/// Enfants directs de type élément
pub fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

/// Nom de conteneur déclaré par serde pour un type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerName {
    /// Structure : nom (après `#[serde(rename)]`) écrit comme racine
    Named(&'static str),
    /// Énumération : la racine écrite est le nom de la variante
    Enum,
    /// Aucun conteneur (scalaire, séquence, map)
    Unknown,
}

/// Nom de racine que quick-xml écrira pour `T`.
///
/// Le nom est celui que serde transmet au désérialiseur (`deserialize_struct`
/// et apparentés), donc `#[serde(rename = "...")]` compris.
pub fn container_name<T: DeserializeOwned>() -> ContainerName {
    let mut name = ContainerName::Unknown;
    // le désérialiseur échoue toujours une fois le nom relevé
    let _ = <T as de::Deserialize>::deserialize(NameCapture { name: &mut name });
    name
}

struct NameCapture<'a> {
    name: &'a mut ContainerName,
}

impl NameCapture<'_> {
    fn captured<V>(self, name: ContainerName) -> std::result::Result<V, de::value::Error> {
        *self.name = name;
        Err(de::Error::custom("container name captured"))
    }
}

impl<'de> de::Deserializer<'de> for NameCapture<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> std::result::Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a named container"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.captured(ContainerName::Named(name))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.captured(ContainerName::Named(name))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.captured(ContainerName::Named(name))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.captured(ContainerName::Named(name))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.captured(ContainerName::Enum)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit seq tuple map identifier ignored_any
    }
}

/// Texte d'un élément (vide si absent)
pub fn element_text(element: &Element) -> String {
    element
        .get_text()
        .map(|text| text.into_owned())
        .unwrap_or_default()
}

/// Balise ouvrante : nom, attributs (valeurs entre guillemets pouvant
/// contenir `>`), marque d'élément vide.
static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<([A-Za-z_][\w.:-]*)((?:\s+[^\s=/>]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/?)>"#,
    )
    .expect("Invalid start tag pattern")
});

static NIL_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<[\w:.-]+\s+\w+:nil="true"(\s+xmlns:\w+="http://www\.w3\.org/2001/XMLSchema-instance")?\s*/>"#,
    )
    .expect("Invalid nil element pattern")
});

/// Retire les attributs (dont les déclarations `xmlns`) de la première
/// balise ouvrante `prefix:name`.
pub fn strip_element_attributes(xml: &str, name: &str, prefix: Option<&str>) -> String {
    let qname = match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{name}"),
        _ => name.to_string(),
    };
    let found = START_TAG
        .captures_iter(xml)
        .find(|caps| &caps[1] == qname.as_str());
    let Some((start, end, empty)) = found.and_then(|caps| {
        let whole = caps.get(0)?;
        Some((whole.start(), whole.end(), caps[3].to_string()))
    }) else {
        return xml.to_string();
    };
    format!("{}<{}{}>{}", &xml[..start], qname, empty, &xml[end..])
}

/// Supprime les éléments vides marqués `xsi:nil="true"`
pub fn strip_nil_elements(xml: &str) -> String {
    NIL_ELEMENT.replace_all(xml, "").into_owned()
}
