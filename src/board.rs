//! # Linux Board Support
//!
//! Wires the A7105 to a Linux host: `spidev` for the SPI bus and GPIO
//! character-device lines for chip select, GIO1, the bind jumper and the
//! status LED.

use std::sync::atomic::AtomicBool;

use embedded_hal::digital::InputPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevBus};
use tracing::{debug, info};

use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::dsm::scheduler::OutputTransport;
use crate::error::{Result, RxError};
use crate::indicator::OptionalPin;
use crate::protocol::frame::NetworkIdentity;
use crate::radio::{SpiChipTransport, SpinLimit, A7105};
use crate::runtime::Firmware;
use crate::storage::FilePageStore;

/// GPIO consumer label
const CONSUMER: &str = "flysky-rx";

/// Radio transport on a Linux host
pub type HostTransport = SpiChipTransport<SpidevBus, CdevPin>;

/// Opened and initialised hardware
pub struct Board {
    pub radio: A7105<HostTransport>,
    pub ready: CdevPin,
    pub led: OptionalPin<CdevPin>,
    /// Bind jumper was fitted at boot
    pub jumper_fitted: bool,
}

impl Board {
    /// Open every line named in `config` and bring the radio up
    pub fn open(config: &Config) -> Result<Self> {
        let radio_cfg = &config.radio;

        let mut spi = SpidevBus::open(&radio_cfg.spi_device)
            .map_err(|e| RxError::Transport(format!("open {}: {:?}", radio_cfg.spi_device, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(radio_cfg.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0
            .configure(&options)
            .map_err(|e| RxError::Transport(format!("configure {}: {}", radio_cfg.spi_device, e)))?;
        debug!("SPI {} at {} Hz", radio_cfg.spi_device, radio_cfg.spi_speed_hz);

        let mut chip = Chip::new(&radio_cfg.gpio_chip)
            .map_err(|e| RxError::Gpio(format!("open {}: {}", radio_cfg.gpio_chip, e)))?;

        let cs = request(&mut chip, radio_cfg.cs_line, LineRequestFlags::OUTPUT, 1)?;
        let ready = request(&mut chip, radio_cfg.gio_line, LineRequestFlags::INPUT, 0)?;

        let led = match config.indicator.led_line {
            // Active low: start dark
            Some(line) => OptionalPin(Some(request(&mut chip, line, LineRequestFlags::OUTPUT, 1)?)),
            None => OptionalPin(None),
        };

        let jumper_fitted = match config.bind.jumper_line {
            Some(line) => {
                let mut jumper = request(&mut chip, line, LineRequestFlags::INPUT, 0)?;
                jumper
                    .is_low()
                    .map_err(|e| RxError::Gpio(format!("bind jumper: {:?}", e)))?
            }
            None => false,
        };

        let transport = SpiChipTransport::new(spi, cs)?;
        let mut radio = A7105::new(transport)
            .with_calibration_limit(SpinLimit(radio_cfg.calibration_max_polls));
        radio.init_flysky()?;
        info!("A7105 ready on {}", radio_cfg.spi_device);

        Ok(Self { radio, ready, led, jumper_fitted })
    }
}

fn request(chip: &mut Chip, line: u32, flags: LineRequestFlags, default: u8) -> Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(flags, default, CONSUMER))
        .map_err(|e| RxError::Gpio(format!("line {}: {}", line, e)))?;
    CdevPin::new(handle).map_err(|e| RxError::Gpio(format!("line {}: {:?}", line, e)))
}

/// Bring the hardware up and run the receive loop until bind or shutdown
///
/// Blocks the calling thread.
pub fn run<O: OutputTransport>(config: &Config, output: O, shutdown: &AtomicBool) -> Result<Option<NetworkIdentity>> {
    let board = Board::open(config)?;
    let store = FilePageStore::open(&config.storage.identity_path)?;
    let bind_requested = config.bind.force || board.jumper_fitted;

    let mut firmware = Firmware::start(
        board.radio,
        board.ready,
        board.led,
        store,
        output,
        MonotonicClock::new(),
        bind_requested,
    )?;
    firmware.run(shutdown)
}
