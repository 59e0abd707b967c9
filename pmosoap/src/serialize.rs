//! Contrat de sérialisation commun aux parties SOAP
//!
//! [`SerializeState`] porte l'état propre à chaque instance (encodage,
//! namespaces, attributs). Les traits séparent le document complet
//! ([`SerializeXml`]), le fragment embarquable ([`SerializeXmlFragment`]) et
//! le passage JSON ([`SerializeJson`]).

use serde::Serialize;

use crate::attributes::AttributeBag;
use crate::encoding::Encoding;
use crate::error::Result;
use crate::namespaces::NamespaceSet;

/// État de sérialisation d'une instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializeState {
    /// Encodage explicite ; `None` laisse le parent ou la configuration décider
    pub encoding: Option<Encoding>,
    pub namespaces: NamespaceSet,
    /// Trier les namespaces sur la clé `prefix + uri` à chaque fusion
    pub namespaces_sorted: bool,
    pub attributes: AttributeBag,
}

impl SerializeState {
    pub fn sorted() -> Self {
        Self {
            namespaces_sorted: true,
            ..Self::default()
        }
    }

    /// Fusionne `args` dans les namespaces courants (sans doublon), trie si
    /// demandé, puis remplace l'ensemble de l'instance.
    ///
    /// Un ensemble vide ne modifie rien.
    pub fn set_namespaces(&mut self, args: &NamespaceSet) {
        if args.is_empty() {
            return;
        }
        let mut merged = self.namespaces.clone();
        merged.merge(args);
        if self.namespaces_sorted {
            merged.sort();
        }
        self.namespaces = merged;
    }

    /// Encodage effectif : celui de l'instance, sinon `fallback`
    pub fn encoding_or(&self, fallback: Encoding) -> Encoding {
        self.encoding.unwrap_or(fallback)
    }
}

/// Accès à l'état de sérialisation
pub trait XmlSerializable {
    fn state(&self) -> &SerializeState;

    fn state_mut(&mut self) -> &mut SerializeState;

    fn namespaces(&self) -> &NamespaceSet {
        &self.state().namespaces
    }

    /// Voir [`SerializeState::set_namespaces`]
    fn set_namespaces(&mut self, args: &NamespaceSet) {
        self.state_mut().set_namespaces(args);
    }

    fn encoding(&self) -> Option<Encoding> {
        self.state().encoding
    }

    fn set_encoding(&mut self, encoding: Encoding) {
        self.state_mut().encoding = Some(encoding);
    }

    fn attributes(&self) -> &AttributeBag {
        &self.state().attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeBag {
        &mut self.state_mut().attributes
    }
}

/// Sérialisation en document XML complet
pub trait SerializeXml {
    fn serialize_xml(&mut self) -> Result<String>;
}

/// Sérialisation en fragment XML (sans déclaration), destiné à être inséré
/// dans un document plus large.
///
/// L'implémentation fusionne d'abord `namespaces` dans son propre état.
/// `encoding` est celui du conteneur parent.
pub trait SerializeXmlFragment {
    fn serialize_xml_fragment(
        &mut self,
        namespaces: &NamespaceSet,
        encoding: Encoding,
    ) -> Result<String>;
}

/// Passage JSON
pub trait SerializeJson: Serialize {
    fn serialize_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_namespaces_merges_and_sorts() {
        let mut state = SerializeState::sorted();
        state.set_namespaces(&[("z", "urn:z")].into_iter().collect());
        state.set_namespaces(&[("a", "urn:a"), ("z", "urn:z")].into_iter().collect());

        let prefixes: Vec<&str> = state.namespaces.iter().map(|ns| ns.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["a", "z"]);
    }

    #[test]
    fn test_set_namespaces_keeps_insertion_order_when_unsorted() {
        let mut state = SerializeState::default();
        state.set_namespaces(&[("z", "urn:z"), ("a", "urn:a")].into_iter().collect());
        state.set_namespaces(&NamespaceSet::new());

        let prefixes: Vec<&str> = state.namespaces.iter().map(|ns| ns.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["z", "a"]);
    }

    #[test]
    fn test_encoding_fallback() {
        let mut state = SerializeState::default();
        assert_eq!(state.encoding_or(Encoding::Utf16), Encoding::Utf16);
        state.encoding = Some(Encoding::UsAscii);
        assert_eq!(state.encoding_or(Encoding::Utf16), Encoding::UsAscii);
    }
}
