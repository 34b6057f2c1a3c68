//! Startup configuration: the settings file and the setup code.
//!
//! Settings are read from a TOML file whose sections all fall back to defaults:
//!
//! ```toml
//! [server]
//! setup_code = "482-91-376"
//! strict_setup_code = true
//!
//! [accessory]
//! name = "Living Room Blind"
//! manufacturer = "Example"
//! serial_number = "0001"
//! model = "WC1"
//! firmware_revision = "1.0"
//!
//! [window_covering]
//! optional = ["name", "obstruction_detected"]
//! ```
//!
//! The setup code is never compiled in. `HOMEKIT_SETUP_CODE` overrides the file,
//! and a random code is generated when neither provides one.

use std::{fmt, fs, path::Path, str::FromStr, sync::Arc};

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    constants::{
        DEFAULT_EVENT_CAPACITY, INVALID_SETUP_CODES, MAX_EVENT_CAPACITY, SETUP_CODE_ENV,
        SETUP_CODE_LEN,
    },
    data_model::{
        accessory::{Accessory, AccessoryInformation, IdentifyHandler},
        characteristic::CharacteristicType,
        handler::Handler,
        profile::window_covering,
    },
    interaction_model::Dispatcher,
    registry::Registry,
    Error, Result,
};

/// The 8-digit pairing password, kept in its `XXX-XX-XXX` form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupCode(heapless::String<SETUP_CODE_LEN>);

impl SetupCode {
    /// A random code that is not one of the forbidden trivial ones
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let digits = format!("{:08}", rng.gen_range(0..100_000_000u32));
            if let Ok(code) = Self::from_digits(&digits) {
                if !code.is_trivial() {
                    return code;
                }
            }
        }
    }

    fn from_digits(digits: &str) -> Result<Self> {
        let invalid = || Error::InvalidSetupCode(digits.to_string());
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut code = heapless::String::new();
        for part in [&digits[..3], "-", &digits[3..5], "-", &digits[5..]] {
            code.push_str(part).map_err(|_| invalid())?;
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether HAP forbids this code for being easy to guess
    pub fn is_trivial(&self) -> bool {
        INVALID_SETUP_CODES.contains(&self.as_str())
    }
}

impl FromStr for SetupCode {
    type Err = Error;

    /// Accepts `XXX-XX-XXX` or the bare 8 digits
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = match s.len() {
            SETUP_CODE_LEN => {
                let bytes = s.as_bytes();
                if bytes[3] != b'-' || bytes[6] != b'-' {
                    return Err(Error::InvalidSetupCode(s.to_string()));
                }
                s.replace('-', "")
            }
            _ => s.to_string(),
        };
        Self::from_digits(&digits).map_err(|_| Error::InvalidSetupCode(s.to_string()))
    }
}

impl fmt::Display for SetupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default = "window_covering::information")]
    pub accessory: AccessoryInformation,
    #[serde(default)]
    pub window_covering: WindowCoveringSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            accessory: window_covering::information(),
            window_covering: WindowCoveringSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub setup_code: Option<String>,
    /// Reject trivial setup codes instead of warning about them
    #[serde(default)]
    pub strict_setup_code: bool,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_accessory_id")]
    pub accessory_id: u64,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_accessory_id() -> u64 {
    1
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            setup_code: None,
            strict_setup_code: false,
            event_capacity: default_event_capacity(),
            accessory_id: default_accessory_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowCoveringSettings {
    /// Enabled optional characteristics, e.g. `"obstruction_detected"`
    #[serde(default = "default_optional")]
    pub optional: Vec<CharacteristicType>,
    /// Percent moved per motor step
    #[serde(default = "default_step_percent")]
    pub step_percent: u8,
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
}

fn default_optional() -> Vec<CharacteristicType> {
    window_covering::DEFAULT_OPTIONAL.to_vec()
}

fn default_step_percent() -> u8 {
    10
}

fn default_step_interval_ms() -> u64 {
    500
}

impl Default for WindowCoveringSettings {
    fn default() -> Self {
        Self {
            optional: default_optional(),
            step_percent: default_step_percent(),
            step_interval_ms: default_step_interval_ms(),
        }
    }
}

impl FromStr for Settings {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Settings {
    /// Rejects values that parse but cannot drive a server
    pub fn validate(&self) -> Result<()> {
        let capacity = self.server.event_capacity;
        if !(1..=MAX_EVENT_CAPACITY).contains(&capacity) {
            return Err(Error::InvalidSettings(format!(
                "event_capacity {capacity} must be between 1 and {MAX_EVENT_CAPACITY}"
            )));
        }
        let step = self.window_covering.step_percent;
        if !(1..=100).contains(&step) {
            return Err(Error::InvalidSettings(format!(
                "step_percent {step} must be between 1 and 100"
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = fs::read_to_string(path)?.parse()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// The setup code from the environment, then the settings file, else a random one
    pub fn resolve_setup_code(&self) -> Result<SetupCode> {
        self.setup_code_from(std::env::var(SETUP_CODE_ENV).ok())
    }

    fn setup_code_from(&self, env: Option<String>) -> Result<SetupCode> {
        let provided = env
            .map(|code| (code, SETUP_CODE_ENV))
            .or_else(|| self.server.setup_code.clone().map(|code| (code, "settings")));
        let Some((raw, source)) = provided else {
            let code = SetupCode::random();
            info!("No setup code provisioned, generated {code}");
            return Ok(code);
        };
        let code: SetupCode = raw.parse()?;
        if code.is_trivial() {
            if self.server.strict_setup_code {
                return Err(Error::InvalidSetupCode(format!(
                    "{code} from {source} is trivially guessable"
                )));
            }
            warn!("Setup code from {source} is trivially guessable, pick another one");
        }
        debug!("Using setup code from {source}");
        Ok(code)
    }

    /// The window covering described by these settings
    pub fn window_covering(&self, identify: Arc<dyn IdentifyHandler>) -> Result<Accessory> {
        window_covering::accessory(
            self.server.accessory_id,
            &self.accessory,
            &self.window_covering.optional,
            identify,
        )
    }

    pub fn server_config(&self, accessories: Vec<Accessory>) -> Result<ServerConfig> {
        self.validate()?;
        Ok(ServerConfig {
            setup_code: self.resolve_setup_code()?,
            accessories,
            event_capacity: self.server.event_capacity,
        })
    }
}

/// Everything an accessory server needs at startup
#[derive(Debug)]
pub struct ServerConfig {
    pub setup_code: SetupCode,
    pub accessories: Vec<Accessory>,
    pub event_capacity: usize,
}

impl ServerConfig {
    /// Registers the accessories and wraps them in a dispatcher running `handler`
    pub fn into_dispatcher<H: Handler>(self, handler: H) -> Result<Dispatcher<H>> {
        let mut registry = Registry::new();
        registry.register(self.accessories)?;
        Ok(Dispatcher::with_capacity(
            registry,
            handler,
            self.event_capacity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::accessory::LogIdentify;

    #[test]
    fn setup_code_format() {
        let code: SetupCode = "482-91-376".parse().unwrap();
        assert_eq!(code.as_str(), "482-91-376");
        assert!(!code.is_trivial());
        assert_eq!("48291376".parse::<SetupCode>().unwrap(), code);

        for invalid in ["48-291-376", "482-91-37", "482-91-37a", "482913760", ""] {
            assert!(
                matches!(invalid.parse::<SetupCode>(), Err(Error::InvalidSetupCode(_))),
                "{invalid}"
            );
        }
        assert!("111-11-111".parse::<SetupCode>().unwrap().is_trivial());
        assert!("12345678".parse::<SetupCode>().unwrap().is_trivial());
    }

    #[test]
    fn random_codes_are_valid() {
        for _ in 0..100 {
            let code = SetupCode::random();
            assert!(!code.is_trivial());
            assert_eq!(code.to_string().parse::<SetupCode>().unwrap(), code);
        }
    }

    #[test]
    fn environment_overrides_settings() {
        let settings: Settings = "[server]\nsetup_code = \"482-91-376\"".parse().unwrap();
        assert_eq!(settings.setup_code_from(None).unwrap().as_str(), "482-91-376");
        assert_eq!(
            settings
                .setup_code_from(Some("031-45-154".into()))
                .unwrap()
                .as_str(),
            "031-45-154"
        );
        assert!(settings.setup_code_from(Some("nope".into())).is_err());
    }

    #[test]
    fn trivial_codes_rejected_only_when_strict() {
        let mut settings = Settings::default();
        settings.server.setup_code = Some("123-45-678".into());
        assert!(settings.setup_code_from(None).is_ok());

        settings.server.strict_setup_code = true;
        assert!(matches!(
            settings.setup_code_from(None),
            Err(Error::InvalidSetupCode(_))
        ));
    }

    #[test]
    fn missing_code_is_generated() {
        let settings = Settings::default();
        let code = settings.setup_code_from(None).unwrap();
        assert!(!code.is_trivial());
    }

    #[test]
    fn sections_fall_back_to_defaults() {
        let settings: Settings = "".parse().unwrap();
        assert_eq!(settings.accessory.name, "WindowCovering-01");
        assert_eq!(settings.server.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(
            settings.window_covering.optional,
            window_covering::DEFAULT_OPTIONAL
        );

        let settings: Settings = r#"
            [accessory]
            name = "Blind"
            manufacturer = "Example"
            serial_number = "0001"
            model = "WC1"
            firmware_revision = "2.0"

            [window_covering]
            optional = ["obstruction_detected", "hold_position"]
            step_percent = 5
        "#
        .parse()
        .unwrap();
        assert_eq!(settings.accessory.name, "Blind");
        assert_eq!(
            settings.window_covering.optional,
            vec![
                CharacteristicType::ObstructionDetected,
                CharacteristicType::HoldPosition
            ]
        );
        assert_eq!(settings.window_covering.step_percent, 5);
        assert_eq!(settings.window_covering.step_interval_ms, 500);
    }

    #[test]
    fn malformed_settings_are_reported() {
        assert!(matches!("[server".parse::<Settings>(), Err(Error::Toml(_))));
        assert!(matches!(
            "[window_covering]\noptional = [\"brightness_level\"]".parse::<Settings>(),
            Err(Error::Toml(_))
        ));
        assert!(matches!(
            Settings::load("/nonexistent/homekit.toml"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        for toml in [
            "[window_covering]\nstep_percent = 0",
            "[window_covering]\nstep_percent = 101",
            "[server]\nevent_capacity = 0",
            "[server]\nevent_capacity = 1000000000",
        ] {
            assert!(
                matches!(toml.parse::<Settings>(), Err(Error::InvalidSettings(_))),
                "{toml}"
            );
        }
        let settings: Settings = "[server]\nevent_capacity = 4096".parse().unwrap();
        assert_eq!(settings.server.event_capacity, MAX_EVENT_CAPACITY);
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn settings_build_a_dispatcher() {
        let mut settings = Settings::default();
        settings.server.setup_code = Some("482-91-376".into());
        let accessory = settings.window_covering(Arc::new(LogIdentify)).unwrap();
        let config = settings.server_config(vec![accessory]).unwrap();
        let dispatcher = config.into_dispatcher(window_covering::WindowCoveringHandler).unwrap();
        assert!(dispatcher.registry().is_initialized());
        assert_eq!(
            dispatcher.registry().accessory(1).unwrap().name(),
            Some("WindowCovering-01")
        );
    }
}
