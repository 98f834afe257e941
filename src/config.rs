//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, RxError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bind: BindConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
}

/// A7105 wiring
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RadioConfig {
    #[serde(default = "default_spi_device")]
    pub spi_device: String,

    #[serde(default = "default_spi_speed_hz")]
    pub spi_speed_hz: u32,

    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: String,

    /// Chip select line
    #[serde(default = "default_cs_line")]
    pub cs_line: u32,

    /// GIO1 (packet ready) line
    #[serde(default = "default_gio_line")]
    pub gio_line: u32,

    /// Give up on calibration after this many polls; unbounded when unset
    #[serde(default)]
    pub calibration_max_polls: Option<u32>,
}

/// DSM serial output
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_port")]
    pub port: String,
}

/// Bind identity persistence
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_identity_path")]
    pub identity_path: String,
}

/// Bind entry
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BindConfig {
    /// Enter bind mode regardless of the stored identity
    #[serde(default)]
    pub force: bool,

    /// Jumper input; low at boot forces bind
    #[serde(default)]
    pub jumper_line: Option<u32>,
}

/// Status LED
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub led_line: Option<u32>,
}

// Default value functions
fn default_spi_device() -> String { "/dev/spidev0.0".to_string() }
fn default_spi_speed_hz() -> u32 { 4_000_000 }
fn default_gpio_chip() -> String { "/dev/gpiochip0".to_string() }
fn default_cs_line() -> u32 { 8 }
fn default_gio_line() -> u32 { 25 }

fn default_output_port() -> String { "/dev/ttyAMA0".to_string() }

fn default_identity_path() -> String { "/var/lib/flysky-rx/identity.bin".to_string() }

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            spi_device: default_spi_device(),
            spi_speed_hz: default_spi_speed_hz(),
            gpio_chip: default_gpio_chip(),
            cs_line: default_cs_line(),
            gio_line: default_gio_line(),
            calibration_max_polls: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { port: default_output_port() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { identity_path: default_identity_path() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radio: RadioConfig::default(),
            output: OutputConfig::default(),
            storage: StorageConfig::default(),
            bind: BindConfig::default(),
            indicator: IndicatorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flysky_rx::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    pub fn validate(&self) -> Result<()> {
        // Validate paths
        for (name, value) in [
            ("spi_device", &self.radio.spi_device),
            ("gpio_chip", &self.radio.gpio_chip),
            ("port", &self.output.port),
            ("identity_path", &self.storage.identity_path),
        ] {
            if value.is_empty() {
                return Err(invalid(format!("{} cannot be empty", name)));
            }
        }

        // The A7105 SPI interface is specified up to 10 MHz
        if self.radio.spi_speed_hz < 100_000 || self.radio.spi_speed_hz > 10_000_000 {
            return Err(invalid("spi_speed_hz must be between 100000 and 10000000"));
        }

        if self.radio.calibration_max_polls == Some(0) {
            return Err(invalid("calibration_max_polls must be greater than 0"));
        }

        // Validate GPIO lines are distinct
        let mut lines = vec![("cs_line", self.radio.cs_line), ("gio_line", self.radio.gio_line)];
        if let Some(line) = self.bind.jumper_line {
            lines.push(("jumper_line", line));
        }
        if let Some(line) = self.indicator.led_line {
            lines.push(("led_line", line));
        }
        for (i, &(name, line)) in lines.iter().enumerate() {
            if let Some(&(other, _)) = lines[..i].iter().find(|&&(_, l)| l == line) {
                return Err(invalid(format!("{} and {} both use GPIO line {}", other, name, line)));
            }
        }

        Ok(())
    }
}

fn invalid<T: std::fmt::Display>(msg: T) -> RxError {
    RxError::Config(toml::de::Error::custom(msg))
}
