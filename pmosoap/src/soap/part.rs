use std::fmt;

/// Partie d'une enveloppe pour laquelle des types candidats sont demandés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapEnvelopePart {
    Header,
    Body,
    /// Detail du Fault porté par le Body
    Fault,
}

impl fmt::Display for SoapEnvelopePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "Header"),
            Self::Body => write!(f, "Body"),
            Self::Fault => write!(f, "Fault"),
        }
    }
}
