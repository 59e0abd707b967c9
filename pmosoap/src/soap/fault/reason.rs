//! `Reason` d'un Fault SOAP 1.2

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use xmltree::{Element, XMLNode};

use super::ElementForm;
use crate::binding::{child_elements, element_text};
use crate::config::get_config;
use crate::error::{Result, SoapError};

/// Texte d'explication dans une langue donnée
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReasonText {
    pub value: String,
    pub lang: String,
}

impl ReasonText {
    /// Texte dans la langue par défaut (voir [`default_lang`])
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: default_lang(),
        }
    }

    pub fn with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: lang.into(),
        }
    }

    pub(crate) fn to_element(&self, form: &ElementForm) -> Element {
        let mut element = form.text_element("Text", &self.value);
        element
            .attributes
            .insert("xml:lang".to_string(), self.lang.clone());
        element
    }

    pub(crate) fn from_element(element: &Element) -> Self {
        // le préfixe `xml:` n'est pas toujours conservé par le parseur
        let lang = element
            .attributes
            .get("lang")
            .or_else(|| element.attributes.get("xml:lang"))
            .cloned()
            .unwrap_or_else(default_lang);
        Self {
            value: element_text(element),
            lang,
        }
    }
}

impl fmt::Display for ReasonText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = get_config();
        let prefix = config.prefix();
        write!(
            f,
            r#"<{prefix}:Text xml:lang="{}">{}</{prefix}:Text>"#,
            quick_xml::escape::escape(self.lang.as_str()),
            quick_xml::escape::escape(self.value.as_str())
        )
    }
}

impl From<&str> for ReasonText {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ReasonText {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<V: Into<String>, L: Into<String>> From<(V, L)> for ReasonText {
    fn from((value, lang): (V, L)) -> Self {
        Self::with_lang(value, lang)
    }
}

/// Langue par défaut : `reason_lang` de la configuration, sinon la locale du
/// processus (`LC_ALL`, `LC_MESSAGES`, `LANG`) normalisée (`fr_FR.UTF-8` →
/// `fr-fr`), sinon `en`.
pub fn default_lang() -> String {
    if let Some(lang) = get_config().reason_lang.as_deref() {
        let lang = lang.trim();
        if !lang.is_empty() {
            return lang.to_lowercase();
        }
    }
    locale_lang().unwrap_or_else(|| "en".to_string())
}

fn locale_lang() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .and_then(|value| normalize_locale(&value))
}

fn normalize_locale(locale: &str) -> Option<String> {
    let tag = locale.split(['.', '@']).next().unwrap_or(locale).trim();
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag.replace('_', "-").to_lowercase())
}

/// Liste ordonnée des textes de `Reason`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultReason {
    texts: Vec<ReasonText>,
}

impl FaultReason {
    pub fn new(texts: impl IntoIterator<Item = impl Into<ReasonText>>) -> Self {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, text: impl Into<ReasonText>) {
        self.texts.push(text.into());
    }

    pub fn texts(&self) -> &[ReasonText] {
        &self.texts
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Texte dans la langue demandée, sinon le premier
    pub fn text_for(&self, lang: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|text| text.lang.eq_ignore_ascii_case(lang))
            .or_else(|| self.texts.first())
            .map(|text| text.value.as_str())
    }

    pub(crate) fn to_element(&self, form: &ElementForm) -> Result<Element> {
        if self.texts.is_empty() {
            return Err(SoapError::missing_part("Fault/Reason/Text"));
        }
        let mut element = form.element("Reason");
        for text in &self.texts {
            element
                .children
                .push(XMLNode::Element(text.to_element(form)));
        }
        Ok(element)
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let mut texts = Vec::new();
        for child in child_elements(element) {
            match child.name.as_str() {
                "Text" => texts.push(ReasonText::from_element(child)),
                other => {
                    debug!(element = %other, parent = "Reason", "Unknown fault child, skipped")
                }
            }
        }
        Ok(Self { texts })
    }
}
