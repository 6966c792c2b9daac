//! Extension pour intégrer le lecteur dans irconfig
//!
//! Ce module fournit le trait `PlayerConfigExt` qui ajoute à
//! `irconfig::Config` la configuration du lecteur:
//!
//! - Volume initial
//! - Processus de sortie audio (commande, arguments, délai de démarrage)
//! - Contrôles média de l'OS (activation, noms affichés)
//! - Widget (activation, fichier d'état)
//!
//! La méthode `player_service_builder` assemble un `PlaybackServiceBuilder`
//! complet à partir de ces valeurs et de `ZenoConfigExt`.
//!
//! # Exemple
//!
//! ```no_run
//! use irconfig::get_config;
//! use irplayer::PlayerConfigExt;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let service = config.player_service_builder()?.build()?;
//! println!("{:?}", service.state());
//! # Ok(())
//! # }
//! ```

use crate::process_output::{ProcessSettings, DEFAULT_COMMAND, DEFAULT_START_GRACE};
use crate::service::PlaybackServiceBuilder;
use crate::widget::FileWidgetBridge;
use anyhow::Result;
use irconfig::Config;
use irzeno::ZenoConfigExt;
use serde_yaml::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const VOLUME: &[&str] = &["player", "volume"];
const OUTPUT_COMMAND: &[&str] = &["player", "output", "command"];
const OUTPUT_ARGS: &[&str] = &["player", "output", "args"];
const OUTPUT_VOLUME_ARG: &[&str] = &["player", "output", "volume_arg"];
const OUTPUT_START_GRACE: &[&str] = &["player", "output", "start_grace_ms"];
const MEDIA_ENABLED: &[&str] = &["player", "media_controls", "enabled"];
const MEDIA_DISPLAY_NAME: &[&str] = &["player", "media_controls", "display_name"];
const MEDIA_DBUS_NAME: &[&str] = &["player", "media_controls", "dbus_name"];
const WIDGET_ENABLED: &[&str] = &["player", "widget", "enabled"];
const WIDGET_FILE: &[&str] = &["player", "widget", "file"];

/// Default media session display name
pub const DEFAULT_DISPLAY_NAME: &str = "Indian Radio";

/// Default D-Bus name (MPRIS)
pub const DEFAULT_DBUS_NAME: &str = "indianradio";

/// Default widget state file, relative to the configuration directory
pub const DEFAULT_WIDGET_FILE: &str = "widget/now_playing.json";

/// Trait d'extension pour gérer la configuration du lecteur dans irconfig
pub trait PlayerConfigExt {
    /// Volume initial, borné à `0.0..=1.0` (défaut: 1.0)
    fn get_player_volume(&self) -> Result<f32>;

    /// Enregistre le volume initial
    fn set_player_volume(&self, volume: f32) -> Result<()>;

    /// Paramètres du processus de sortie audio
    ///
    /// Une liste `args` absente retombe sur les arguments par défaut; une
    /// liste vide est respectée. Un `volume_arg` vide désactive le volume.
    fn get_player_process_settings(&self) -> Result<ProcessSettings>;

    /// Enregistre les paramètres du processus de sortie audio
    fn set_player_process_settings(&self, settings: &ProcessSettings) -> Result<()>;

    /// Vérifie si les contrôles média de l'OS sont activés (défaut: true)
    fn get_media_controls_enabled(&self) -> Result<bool>;

    /// Active ou désactive les contrôles média
    fn set_media_controls_enabled(&self, enabled: bool) -> Result<()>;

    /// Nom affiché par l'OS
    fn get_media_controls_display_name(&self) -> Result<String>;

    /// Nom D-Bus (MPRIS)
    fn get_media_controls_dbus_name(&self) -> Result<String>;

    /// Vérifie si le widget est activé (défaut: true)
    fn get_widget_enabled(&self) -> Result<bool>;

    /// Active ou désactive le widget
    fn set_widget_enabled(&self, enabled: bool) -> Result<()>;

    /// Chemin absolu du fichier d'état du widget (répertoire parent créé)
    fn get_widget_file(&self) -> Result<PathBuf>;

    /// Construit un `PlaybackServiceBuilder` configuré
    ///
    /// L'échec de l'enregistrement des contrôles média n'est pas fatal: le
    /// service est construit sans.
    fn player_service_builder(&self) -> Result<PlaybackServiceBuilder>;
}

impl PlayerConfigExt for Config {
    fn get_player_volume(&self) -> Result<f32> {
        Ok((self.get_f64(VOLUME, 1.0) as f32).clamp(0.0, 1.0))
    }

    fn set_player_volume(&self, volume: f32) -> Result<()> {
        self.set_f64(VOLUME, volume.clamp(0.0, 1.0) as f64)
    }

    fn get_player_process_settings(&self) -> Result<ProcessSettings> {
        let default = ProcessSettings::default();

        let volume_arg = match self.get_value(OUTPUT_VOLUME_ARG) {
            Ok(Value::String(s)) if s.trim().is_empty() => None,
            Ok(Value::String(s)) => Some(s),
            Ok(Value::Null) => None,
            _ => default.volume_arg,
        };

        Ok(ProcessSettings {
            command: self.get_string(OUTPUT_COMMAND, DEFAULT_COMMAND),
            args: self.get_string_list(OUTPUT_ARGS).unwrap_or(default.args),
            volume_arg,
            start_grace: Duration::from_millis(
                self.get_u64(OUTPUT_START_GRACE, DEFAULT_START_GRACE.as_millis() as u64),
            ),
        })
    }

    fn set_player_process_settings(&self, settings: &ProcessSettings) -> Result<()> {
        self.set_value(OUTPUT_COMMAND, Value::String(settings.command.clone()))?;
        self.set_string_list(OUTPUT_ARGS, &settings.args)?;
        self.set_value(
            OUTPUT_VOLUME_ARG,
            Value::String(settings.volume_arg.clone().unwrap_or_default()),
        )?;
        self.set_u64(OUTPUT_START_GRACE, settings.start_grace.as_millis() as u64)
    }

    fn get_media_controls_enabled(&self) -> Result<bool> {
        Ok(self.get_bool(MEDIA_ENABLED, true))
    }

    fn set_media_controls_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(MEDIA_ENABLED, Value::Bool(enabled))
    }

    fn get_media_controls_display_name(&self) -> Result<String> {
        Ok(self.get_string(MEDIA_DISPLAY_NAME, DEFAULT_DISPLAY_NAME))
    }

    fn get_media_controls_dbus_name(&self) -> Result<String> {
        Ok(self.get_string(MEDIA_DBUS_NAME, DEFAULT_DBUS_NAME))
    }

    fn get_widget_enabled(&self) -> Result<bool> {
        Ok(self.get_bool(WIDGET_ENABLED, true))
    }

    fn set_widget_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(WIDGET_ENABLED, Value::Bool(enabled))
    }

    fn get_widget_file(&self) -> Result<PathBuf> {
        self.get_managed_file(WIDGET_FILE, DEFAULT_WIDGET_FILE)
    }

    fn player_service_builder(&self) -> Result<PlaybackServiceBuilder> {
        let output = crate::process_output::ProcessOutput::new(self.get_player_process_settings()?);

        let mut builder = PlaybackServiceBuilder::new()
            .resolver(self.zeno_endpoint_resolver()?)
            .reconnect_policy(self.get_zeno_reconnect_policy()?)
            .audio_output(Box::new(output))
            .volume(self.get_player_volume()?);

        if self.get_widget_enabled()? {
            let file = self.get_widget_file()?;
            tracing::info!("Widget state file: {}", file.display());
            builder = builder.widget_bridge(Arc::new(FileWidgetBridge::new(file)));
        }

        if self.get_media_controls_enabled()? {
            builder = with_media_controls(
                builder,
                &self.get_media_controls_display_name()?,
                &self.get_media_controls_dbus_name()?,
            );
        }

        Ok(builder)
    }
}

#[cfg(feature = "media-controls")]
fn with_media_controls(
    builder: PlaybackServiceBuilder,
    display_name: &str,
    dbus_name: &str,
) -> PlaybackServiceBuilder {
    match crate::media_session::OsMediaSession::new(display_name, dbus_name, builder.handle()) {
        Ok(session) => builder.media_session(Box::new(session)),
        Err(e) => {
            tracing::warn!("Media controls unavailable: {}", e);
            builder
        }
    }
}

#[cfg(not(feature = "media-controls"))]
fn with_media_controls(
    builder: PlaybackServiceBuilder,
    _display_name: &str,
    _dbus_name: &str,
) -> PlaybackServiceBuilder {
    tracing::info!("Media controls enabled in configuration but not compiled in");
    builder
}
