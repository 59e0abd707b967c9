//! # Configuration de pmosoap
//!
//! Valeurs par défaut partagées par tout le processus : namespace cible
//! (donc version du protocole), préfixe de l'enveloppe, encodage annoncé,
//! langue des textes de Reason.
//!
//! La configuration est construite à partir :
//! - du YAML par défaut intégré au crate
//! - d'un fichier YAML optionnel désigné par `PMOSOAP_CONFIG`
//! - de variables d'environnement `PMOSOAP_CONFIG__SOAP__<CLE>`
//!
//! Chaque opération lit un instantané ([`get_config`]) au moment de l'appel ;
//! un [`set_config`] concurrent ne modifie donc jamais un appel en cours.

use std::str::FromStr;
use std::{env, fmt, fs, sync::Arc};

use anyhow::Context;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encoding::Encoding;
use crate::error::{Result, SoapError};
use crate::version::{SOAP12_NAMESPACE, SoapVersion};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmosoap.yaml");

const ENV_CONFIG_FILE: &str = "PMOSOAP_CONFIG";
const ENV_PREFIX: &str = "PMOSOAP_CONFIG__";

lazy_static! {
    static ref CONFIG: RwLock<Arc<SoapConfig>> = RwLock::new(Arc::new(load_or_default()));
}

/// Valeurs par défaut du protocole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapConfig {
    /// Namespace de l'enveloppe (SOAP 1.1 ou 1.2)
    pub target_namespace: String,
    /// Préfixe utilisé pour les éléments de l'enveloppe
    pub namespace_prefix: String,
    /// Encodage annoncé dans la déclaration XML
    pub encoding: Encoding,
    /// Langue par défaut des textes de Reason
    pub reason_lang: Option<String>,
    /// Lever une erreur quand un document ne correspond pas au type demandé
    pub throw_if_cannot_deserialize: bool,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            target_namespace: SOAP12_NAMESPACE.to_string(),
            namespace_prefix: "soap".to_string(),
            encoding: Encoding::Utf8,
            reason_lang: None,
            throw_if_cannot_deserialize: false,
        }
    }
}

/// Surcharge partielle : seules les clés présentes remplacent les valeurs
/// courantes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SoapOverrides {
    target_namespace: Option<String>,
    namespace_prefix: Option<String>,
    encoding: Option<Encoding>,
    reason_lang: Option<String>,
    throw_if_cannot_deserialize: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    soap: SoapOverrides,
}

impl SoapOverrides {
    /// Lit les variables `PMOSOAP_CONFIG__SOAP__<CLE>` ; une valeur
    /// illisible est ignorée.
    fn from_env() -> Self {
        Self {
            target_namespace: env_override("target_namespace"),
            namespace_prefix: env_override("namespace_prefix"),
            encoding: env_override("encoding").and_then(|raw| parse_override("encoding", &raw)),
            reason_lang: env_override("reason_lang"),
            throw_if_cannot_deserialize: env_override("throw_if_cannot_deserialize")
                .and_then(|raw| parse_override("throw_if_cannot_deserialize", &raw)),
        }
    }

    fn apply(self, config: &mut SoapConfig) {
        if let Some(namespace) = self.target_namespace {
            config.target_namespace = namespace;
        }
        if let Some(prefix) = self.namespace_prefix {
            config.namespace_prefix = prefix;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(lang) = self.reason_lang {
            config.reason_lang = Some(lang);
        }
        if let Some(throw) = self.throw_if_cannot_deserialize {
            config.throw_if_cannot_deserialize = throw;
        }
    }
}

fn env_override(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}SOAP__{}", key.to_uppercase())).ok()
}

fn parse_override<T: FromStr>(key: &str, raw: &str) -> Option<T>
where
    T::Err: fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = raw, error = %e, "Ignoring SOAP config override");
            None
        }
    }
}

impl SoapConfig {
    /// Charge la configuration : défauts intégrés, fichier optionnel,
    /// puis overrides d'environnement.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::from_yaml(DEFAULT_CONFIG)?;

        if let Ok(path) = env::var(ENV_CONFIG_FILE) {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read SOAP config file {path}"))?;
            let file: OverrideFile = serde_yaml::from_str(&data)?;
            file.soap.apply(&mut config);
            info!(config_file=%path, "Loaded SOAP config file");
        } else {
            debug!("No SOAP config file, using default embedded config");
        }

        SoapOverrides::from_env().apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Construit la configuration depuis un document YAML `soap: {...}`
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ConfigFile {
            #[serde(default)]
            soap: SoapConfig,
        }
        let file: ConfigFile = serde_yaml::from_str(yaml)?;
        Ok(file.soap)
    }

    /// Version du protocole désignée par le namespace cible
    pub fn version(&self) -> Result<SoapVersion> {
        SoapVersion::from_namespace(&self.target_namespace)
    }

    /// Préfixe effectif (rogné)
    pub fn prefix(&self) -> &str {
        self.namespace_prefix.trim()
    }

    /// Vérifie le namespace cible et le préfixe
    pub fn validate(&self) -> Result<()> {
        self.version()?;
        let prefix = self.prefix();
        if prefix.is_empty() || prefix.contains(':') || prefix.contains(char::is_whitespace) {
            return Err(SoapError::format(format!(
                "invalid namespace prefix {:?}",
                self.namespace_prefix
            )));
        }
        Ok(())
    }
}

fn load_or_default() -> SoapConfig {
    match SoapConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Invalid SOAP configuration, falling back to defaults");
            SoapConfig::default()
        }
    }
}

/// Instantané de la configuration courante
pub fn get_config() -> Arc<SoapConfig> {
    CONFIG.read().clone()
}

/// Remplace la configuration globale après validation.
///
/// À réserver à l'initialisation du processus.
pub fn set_config(config: SoapConfig) -> Result<()> {
    config.validate()?;
    info!(target_namespace=%config.target_namespace, prefix=%config.namespace_prefix, "SOAP configuration updated");
    *CONFIG.write() = Arc::new(config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::SOAP11_NAMESPACE;

    #[test]
    fn test_embedded_defaults() {
        let config = SoapConfig::from_yaml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, SoapConfig::default());
        assert_eq!(config.version().unwrap(), SoapVersion::V12);
    }

    #[test]
    fn test_file_overrides_only_present_keys() {
        let mut config = SoapConfig::from_yaml(DEFAULT_CONFIG).unwrap();
        let file: OverrideFile = serde_yaml::from_str(&format!(
            "soap:\n  namespace_prefix: env\n  target_namespace: {SOAP11_NAMESPACE}\n  reason_lang: fr-fr\n"
        ))
        .unwrap();
        file.soap.apply(&mut config);

        assert_eq!(config.namespace_prefix, "env");
        assert_eq!(config.version().unwrap(), SoapVersion::V11);
        assert_eq!(config.reason_lang.as_deref(), Some("fr-fr"));
        assert_eq!(config.encoding, Encoding::Utf8);
        assert!(!config.throw_if_cannot_deserialize);
    }

    #[test]
    fn test_parse_override_values() {
        assert_eq!(parse_override::<bool>("throw", " true"), Some(true));
        assert_eq!(parse_override::<Encoding>("encoding", "ISO-8859-1"), Some(Encoding::Iso8859_1));
        assert_eq!(parse_override::<bool>("throw", "maybe"), None);
    }

    #[test]
    fn test_set_config_rejects_invalid_values() {
        let before = get_config();

        let bad_ns = SoapConfig {
            target_namespace: "urn:example:not-soap".into(),
            ..SoapConfig::default()
        };
        assert!(matches!(
            set_config(bad_ns),
            Err(SoapError::UnsupportedVersion(_))
        ));

        let bad_prefix = SoapConfig {
            namespace_prefix: "so ap".into(),
            ..SoapConfig::default()
        };
        assert!(matches!(set_config(bad_prefix), Err(SoapError::Format(_))));

        assert_eq!(*get_config(), *before);
    }
}
