//! Extension pour intégrer Zeno.fm dans irconfig
//!
//! Ce module fournit le trait `ZenoConfigExt` qui ajoute à `irconfig::Config`
//! la configuration du fournisseur Zeno.fm:
//!
//! - URL de base des flux audio
//! - URL de base de l'abonnement aux métadonnées
//! - Politique de reconnexion du canal de métadonnées
//!
//! # Exemple
//!
//! ```no_run
//! use irconfig::get_config;
//! use irzeno::ZenoConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! let resolver = config.zeno_endpoint_resolver()?;
//! let policy = config.get_zeno_reconnect_policy()?;
//! println!("Streams from {} ({} retries)", resolver.stream_base(), policy.max_retries);
//! # Ok(())
//! # }
//! ```

use crate::channel::ReconnectPolicy;
use crate::endpoints::{EndpointResolver, DEFAULT_METADATA_BASE, DEFAULT_STREAM_BASE};
use anyhow::Result;
use irconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

const STREAM_BASE: &[&str] = &["sources", "zeno", "stream_base"];
const METADATA_BASE: &[&str] = &["sources", "zeno", "metadata_base"];
const RECONNECT_MAX_RETRIES: &[&str] = &["sources", "zeno", "reconnect", "max_retries"];
const RECONNECT_INITIAL_DELAY: &[&str] = &["sources", "zeno", "reconnect", "initial_delay_ms"];
const RECONNECT_MAX_DELAY: &[&str] = &["sources", "zeno", "reconnect", "max_delay_ms"];
const RECONNECT_IDLE_TIMEOUT: &[&str] = &["sources", "zeno", "reconnect", "idle_timeout_ms"];

/// Trait d'extension pour gérer la configuration Zeno.fm dans irconfig
///
/// # Auto-persist des valeurs par défaut
///
/// Les getters d'URL persistent automatiquement la valeur par défaut si la
/// clé n'existe pas encore.
pub trait ZenoConfigExt {
    /// Récupère l'URL de base des flux (défaut: `https://stream.zeno.fm/`)
    fn get_zeno_stream_base(&self) -> Result<String>;

    /// Définit l'URL de base des flux
    fn set_zeno_stream_base(&self, base: &str) -> Result<()>;

    /// Récupère l'URL de base des métadonnées
    fn get_zeno_metadata_base(&self) -> Result<String>;

    /// Définit l'URL de base des métadonnées
    fn set_zeno_metadata_base(&self, base: &str) -> Result<()>;

    /// Récupère la politique de reconnexion
    ///
    /// Les valeurs absentes ou invalides retombent sur
    /// `ReconnectPolicy::default()` champ par champ.
    fn get_zeno_reconnect_policy(&self) -> Result<ReconnectPolicy>;

    /// Enregistre la politique de reconnexion
    fn set_zeno_reconnect_policy(&self, policy: &ReconnectPolicy) -> Result<()>;

    /// Construit un `EndpointResolver` à partir des URLs configurées
    ///
    /// Échoue si une des URLs de base est invalide.
    fn zeno_endpoint_resolver(&self) -> Result<EndpointResolver>;
}

impl ZenoConfigExt for Config {
    fn get_zeno_stream_base(&self) -> Result<String> {
        match self.get_value(STREAM_BASE) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            _ => {
                self.set_zeno_stream_base(DEFAULT_STREAM_BASE)?;
                Ok(DEFAULT_STREAM_BASE.to_string())
            }
        }
    }

    fn set_zeno_stream_base(&self, base: &str) -> Result<()> {
        self.set_value(STREAM_BASE, Value::String(base.to_string()))
    }

    fn get_zeno_metadata_base(&self) -> Result<String> {
        match self.get_value(METADATA_BASE) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            _ => {
                self.set_zeno_metadata_base(DEFAULT_METADATA_BASE)?;
                Ok(DEFAULT_METADATA_BASE.to_string())
            }
        }
    }

    fn set_zeno_metadata_base(&self, base: &str) -> Result<()> {
        self.set_value(METADATA_BASE, Value::String(base.to_string()))
    }

    fn get_zeno_reconnect_policy(&self) -> Result<ReconnectPolicy> {
        let default = ReconnectPolicy::default();
        let max_retries = self.get_u64(RECONNECT_MAX_RETRIES, default.max_retries as u64);

        Ok(ReconnectPolicy {
            max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
            initial_delay: Duration::from_millis(
                self.get_u64(RECONNECT_INITIAL_DELAY, default.initial_delay.as_millis() as u64),
            ),
            max_delay: Duration::from_millis(
                self.get_u64(RECONNECT_MAX_DELAY, default.max_delay.as_millis() as u64),
            ),
            idle_timeout: Duration::from_millis(
                self.get_u64(RECONNECT_IDLE_TIMEOUT, default.idle_timeout.as_millis() as u64),
            ),
        })
    }

    fn set_zeno_reconnect_policy(&self, policy: &ReconnectPolicy) -> Result<()> {
        self.set_u64(RECONNECT_MAX_RETRIES, policy.max_retries as u64)?;
        self.set_u64(RECONNECT_INITIAL_DELAY, policy.initial_delay.as_millis() as u64)?;
        self.set_u64(RECONNECT_MAX_DELAY, policy.max_delay.as_millis() as u64)?;
        self.set_u64(RECONNECT_IDLE_TIMEOUT, policy.idle_timeout.as_millis() as u64)
    }

    fn zeno_endpoint_resolver(&self) -> Result<EndpointResolver> {
        let resolver =
            EndpointResolver::new(self.get_zeno_stream_base()?, self.get_zeno_metadata_base()?)?;
        Ok(resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(dir: &TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_from_embedded_yaml() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        assert_eq!(config.get_zeno_stream_base().unwrap(), DEFAULT_STREAM_BASE);
        assert_eq!(config.get_zeno_metadata_base().unwrap(), DEFAULT_METADATA_BASE);
        assert_eq!(
            config.get_zeno_reconnect_policy().unwrap(),
            ReconnectPolicy::default()
        );
    }

    #[test]
    fn test_custom_bases_feed_the_resolver() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set_zeno_stream_base("http://127.0.0.1:9000/s/").unwrap();
        config.set_zeno_metadata_base("http://127.0.0.1:9000/m/").unwrap();

        let endpoints = config.zeno_endpoint_resolver().unwrap().resolve("abc").unwrap();
        assert_eq!(endpoints.stream_url, "http://127.0.0.1:9000/s/abc");
        assert_eq!(endpoints.metadata_url, "http://127.0.0.1:9000/m/abc");
    }

    #[test]
    fn test_reconnect_policy_round_trip_persists() {
        let dir = TempDir::new().unwrap();
        let policy = ReconnectPolicy {
            max_retries: 0,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            idle_timeout: Duration::ZERO,
        };
        load(&dir).set_zeno_reconnect_policy(&policy).unwrap();

        // Reload from disk
        assert_eq!(load(&dir).get_zeno_reconnect_policy().unwrap(), policy);
    }

    #[test]
    fn test_invalid_base_fails_resolver() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        config.set_zeno_stream_base("not a url").unwrap();
        assert!(config.zeno_endpoint_resolver().is_err());
    }
}
