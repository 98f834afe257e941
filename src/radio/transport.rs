//! Trait abstraction for byte-level access to the A7105 to enable testing

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use tracing::trace;

use crate::error::{Result, RxError};

/// Byte-level SPI primitives of the radio chip
///
/// The A7105 talks 3-wire SPI: one bidirectional data line whose direction
/// must be switched to input while the chip shifts register contents out.
pub trait ChipTransport {
    /// Assert chip select
    fn select(&mut self) -> Result<()>;

    /// Release chip select
    fn deselect(&mut self) -> Result<()>;

    /// Clock one byte out and return the byte clocked in
    fn exchange(&mut self, byte: u8) -> Result<u8>;

    /// Switch the shared data line between driving (false) and listening (true)
    fn set_data_input(&mut self, _input: bool) -> Result<()> {
        Ok(())
    }
}

/// [`ChipTransport`] over an `embedded-hal` SPI bus and a GPIO chip select
///
/// Expects the chip's SDIO to be bridged onto MOSI through a series resistor
/// and wired straight to MISO, so the master never has to turn the line
/// around and [`ChipTransport::set_data_input`] stays a no-op.
pub struct SpiChipTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiChipTransport<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Wrap a bus and chip select line; chip select is released immediately
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self> {
        cs.set_high().map_err(|e| RxError::Gpio(format!("chip select: {:?}", e)))?;
        Ok(Self { spi, cs })
    }

    /// Give back the bus and pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> ChipTransport for SpiChipTransport<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    fn select(&mut self) -> Result<()> {
        self.cs.set_low().map_err(|e| RxError::Gpio(format!("chip select: {:?}", e)))
    }

    fn deselect(&mut self) -> Result<()> {
        // Wait for the last byte to leave the shifter before releasing CS
        self.spi
            .flush()
            .map_err(|e| RxError::Transport(format!("flush: {:?}", e)))?;
        self.cs.set_high().map_err(|e| RxError::Gpio(format!("chip select: {:?}", e)))
    }

    fn exchange(&mut self, byte: u8) -> Result<u8> {
        let mut buf = [byte];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(|e| RxError::Transport(format!("transfer: {:?}", e)))?;
        trace!("spi 0x{:02X} -> 0x{:02X}", byte, buf[0]);
        Ok(buf[0])
    }
}

#[cfg(test)]
pub mod mocks {
    //! Register-level model of an A7105 for driver and receiver tests

    use super::*;
    use crate::radio::regs::{Reg, Strobe, CALC_START, MODE_CRC_ERROR, READ_FLAG};
    use embedded_hal::digital::{ErrorType, InputPin};
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    /// Chip mode as observed from strobes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FakeMode {
        Idle,
        Standby,
        Receiving,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Command {
        None,
        Write(u8),
        Read(u8),
        Strobe,
    }

    /// Observable chip state
    pub struct ChipModel {
        pub regs: [u8; 0x40],
        pub id: [u8; 4],
        pub mode: FakeMode,
        /// Channel register value at every RX strobe, in order
        pub rx_channels: Vec<u8>,
        /// Every strobe received, in order
        pub strobes: Vec<u8>,
        /// Number of CALC reads that still report "busy"; `None` never finishes
        pub calibration_polls: Option<u32>,
        pub fifo: Vec<u8>,
        pub read_ptr: usize,
        pub packet_pending: bool,
        pub crc_error: bool,
        pub selected: bool,
        pub data_input: bool,
        command: Command,
        burst_index: usize,
    }

    impl ChipModel {
        fn new() -> Self {
            Self {
                regs: [0; 0x40],
                id: [0; 4],
                mode: FakeMode::Idle,
                rx_channels: Vec::new(),
                strobes: Vec::new(),
                calibration_polls: Some(3),
                fifo: Vec::new(),
                read_ptr: 0,
                packet_pending: false,
                crc_error: false,
                selected: false,
                data_input: false,
                command: Command::None,
                burst_index: 0,
            }
        }

        fn strobe(&mut self, command: u8) {
            self.strobes.push(command);
            match command {
                c if c == Strobe::Standby.command() => {
                    self.mode = FakeMode::Standby;
                    self.packet_pending = false;
                }
                c if c == Strobe::Idle.command() => self.mode = FakeMode::Idle,
                c if c == Strobe::ResetReadPointer.command() => self.read_ptr = 0,
                c if c == Strobe::Rx.command() => {
                    self.mode = FakeMode::Receiving;
                    self.packet_pending = false;
                    self.crc_error = false;
                    self.rx_channels.push(self.regs[Reg::Channel.addr() as usize]);
                }
                _ => {}
            }
        }

        fn write(&mut self, reg: u8, value: u8) {
            match reg {
                r if r == Reg::Mode.addr() && value == 0x00 => {
                    // Soft reset
                    self.regs = [0; 0x40];
                    self.mode = FakeMode::Idle;
                }
                r if r == Reg::IdData.addr() => {
                    if self.burst_index < 4 {
                        self.id[self.burst_index] = value;
                    }
                }
                r if r == Reg::FifoData.addr() => {}
                r => {
                    self.regs[r as usize] = value;
                }
            }
            self.burst_index += 1;
        }

        fn read(&mut self, reg: u8) -> u8 {
            let value = match reg {
                r if r == Reg::Mode.addr() => {
                    if self.crc_error {
                        MODE_CRC_ERROR
                    } else {
                        0
                    }
                }
                r if r == Reg::Calc.addr() => {
                    if self.regs[r as usize] & CALC_START == 0 {
                        0
                    } else {
                        match self.calibration_polls {
                            Some(0) => {
                                self.regs[r as usize] = 0;
                                0
                            }
                            Some(n) => {
                                self.calibration_polls = Some(n - 1);
                                CALC_START
                            }
                            None => CALC_START,
                        }
                    }
                }
                r if r == Reg::IdData.addr() => self.id.get(self.burst_index).copied().unwrap_or(0xFF),
                r if r == Reg::FifoData.addr() => {
                    let byte = self.fifo.get(self.read_ptr).copied().unwrap_or(0);
                    self.read_ptr += 1;
                    byte
                }
                r => self.regs[r as usize],
            };
            self.burst_index += 1;
            value
        }
    }

    /// Shared handle to a [`ChipModel`]; clone one copy into the driver
    #[derive(Clone)]
    pub struct FakeA7105 {
        pub model: Rc<RefCell<ChipModel>>,
    }

    impl FakeA7105 {
        pub fn new() -> Self {
            Self { model: Rc::new(RefCell::new(ChipModel::new())) }
        }

        /// Land a packet in the FIFO as if received on the current channel
        pub fn deliver(&self, frame: &[u8], crc_ok: bool) {
            let mut model = self.model.borrow_mut();
            assert_eq!(model.mode, FakeMode::Receiving, "packet delivered to a chip not in RX");
            model.fifo = frame.to_vec();
            model.read_ptr = 0;
            model.crc_error = !crc_ok;
            model.packet_pending = true;
        }

        /// GIO1 ("wait to receive" output), low outside RX and while a packet is pending
        pub fn gio(&self) -> FakeGio {
            FakeGio { model: self.model.clone() }
        }

        pub fn rx_channels(&self) -> Vec<u8> {
            self.model.borrow().rx_channels.clone()
        }

        pub fn strobes(&self) -> Vec<u8> {
            self.model.borrow().strobes.clone()
        }

        pub fn registers(&self) -> [u8; 0x40] {
            self.model.borrow().regs
        }

        pub fn never_finish_calibration(&self) {
            self.model.borrow_mut().calibration_polls = None;
        }
    }

    impl ChipTransport for FakeA7105 {
        fn select(&mut self) -> Result<()> {
            let mut model = self.model.borrow_mut();
            assert!(!model.selected, "chip selected twice");
            model.selected = true;
            model.command = Command::None;
            model.burst_index = 0;
            Ok(())
        }

        fn deselect(&mut self) -> Result<()> {
            let mut model = self.model.borrow_mut();
            model.selected = false;
            Ok(())
        }

        fn exchange(&mut self, byte: u8) -> Result<u8> {
            let mut model = self.model.borrow_mut();
            assert!(model.selected, "exchange without chip select");
            match model.command {
                Command::None => {
                    if byte & 0x80 != 0 {
                        model.command = Command::Strobe;
                        model.strobe(byte);
                    } else if byte & READ_FLAG != 0 {
                        model.command = Command::Read(byte & !READ_FLAG);
                    } else {
                        model.command = Command::Write(byte);
                    }
                    Ok(0)
                }
                Command::Write(reg) => {
                    assert!(!model.data_input, "write while data line is an input");
                    model.write(reg, byte);
                    Ok(0)
                }
                Command::Read(reg) => {
                    assert!(model.data_input, "read while data line is an output");
                    Ok(model.read(reg))
                }
                Command::Strobe => Ok(0),
            }
        }

        fn set_data_input(&mut self, input: bool) -> Result<()> {
            self.model.borrow_mut().data_input = input;
            Ok(())
        }
    }

    /// Data-ready pin backed by the model
    pub struct FakeGio {
        model: Rc<RefCell<ChipModel>>,
    }

    impl ErrorType for FakeGio {
        type Error = Infallible;
    }

    impl InputPin for FakeGio {
        fn is_high(&mut self) -> std::result::Result<bool, Self::Error> {
            self.is_low().map(|low| !low)
        }

        fn is_low(&mut self) -> std::result::Result<bool, Self::Error> {
            let model = self.model.borrow();
            Ok(model.mode != FakeMode::Receiving || model.packet_pending)
        }
    }
}
