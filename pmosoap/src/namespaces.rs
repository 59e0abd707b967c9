//! Déclarations de namespaces XML
//!
//! Un [`NamespaceSet`] conserve l'ordre d'insertion et dédoublonne par la clé
//! composite `prefix + uri`. Le tri éventuel est stable sur cette même clé.

/// Couple (préfixe, URI) d'une déclaration `xmlns`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedNamespace {
    pub prefix: String,
    pub uri: String,
}

impl QualifiedNamespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// Clé de dédoublonnage et de tri
    pub fn key(&self) -> String {
        format!("{}{}", self.prefix, self.uri)
    }

    /// Nom de l'attribut de déclaration (`xmlns` ou `xmlns:prefix`)
    pub fn attribute_name(&self) -> String {
        if self.prefix.trim().is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.prefix)
        }
    }
}

impl<P: Into<String>, U: Into<String>> From<(P, U)> for QualifiedNamespace {
    fn from((prefix, uri): (P, U)) -> Self {
        Self::new(prefix, uri)
    }
}

/// Ensemble ordonné de déclarations de namespaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceSet {
    items: Vec<QualifiedNamespace>,
}

impl NamespaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une déclaration si la clé `prefix + uri` n'est pas déjà présente.
    ///
    /// Retourne `true` si la déclaration a été ajoutée.
    pub fn insert(&mut self, ns: impl Into<QualifiedNamespace>) -> bool {
        let ns = ns.into();
        let key = ns.key();
        if self.items.iter().any(|existing| existing.key() == key) {
            return false;
        }
        self.items.push(ns);
        true
    }

    /// Fusionne `other` à la suite, en conservant l'ordre et sans doublon
    pub fn merge(&mut self, other: &NamespaceSet) {
        for ns in &other.items {
            self.insert(ns.clone());
        }
    }

    /// Tri stable sur la clé composite
    pub fn sort(&mut self) {
        self.items.sort_by_key(QualifiedNamespace::key);
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// URI associée à un préfixe
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri.as_str())
    }

    pub fn contains(&self, prefix: &str, uri: &str) -> bool {
        self.items
            .iter()
            .any(|ns| ns.prefix == prefix && ns.uri == uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualifiedNamespace> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Into<QualifiedNamespace>> FromIterator<T> for NamespaceSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = NamespaceSet::new();
        for ns in iter {
            set.insert(ns);
        }
        set
    }
}

impl<'a> IntoIterator for &'a NamespaceSet {
    type Item = &'a QualifiedNamespace;
    type IntoIter = std::slice::Iter<'a, QualifiedNamespace>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
