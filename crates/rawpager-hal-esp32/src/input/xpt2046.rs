use embedded_hal::{digital::InputPin, spi::SpiDevice};

// Control bytes: start bit, channel, 12-bit differential mode. The low
// power-down bits keep the ADC on between samples; the final read powers
// down and re-arms the PENIRQ line.
const CMD_Z1: u8 = 0xB1;
const CMD_Z2: u8 = 0xC1;
const CMD_X: u8 = 0x91;
const CMD_Y: u8 = 0xD1;
const CMD_POWER_DOWN: u8 = 0xD0;

const ADC_MAX: u16 = 4095;
const SAMPLE_PAIRS: usize = 3;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TouchConfig {
    pressure_threshold: u16,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            pressure_threshold: 400,
        }
    }
}

impl TouchConfig {
    pub const fn with_pressure_threshold(mut self, pressure_threshold: u16) -> Self {
        self.pressure_threshold = pressure_threshold;
        self
    }

    pub const fn pressure_threshold(&self) -> u16 {
        self.pressure_threshold
    }
}

/// One filtered pen-down reading in raw ADC units.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TouchSample {
    pub raw_x: u16,
    pub raw_y: u16,
    pub pressure: u16,
}

#[derive(Debug)]
pub enum TouchError<SpiErr, IrqErr> {
    Spi(SpiErr),
    Irq(IrqErr),
}

type TouchResult<SpiErr, IrqErr, T> = Result<T, TouchError<SpiErr, IrqErr>>;

/// XPT2046 resistive touch controller on its own SPI device plus PENIRQ.
#[derive(Debug)]
pub struct Xpt2046<SPI, IRQ> {
    spi: SPI,
    irq: IRQ,
    config: TouchConfig,
}

impl<SPI, IRQ> Xpt2046<SPI, IRQ>
where
    SPI: SpiDevice<u8>,
    IRQ: InputPin,
{
    pub fn new(spi: SPI, irq: IRQ, config: TouchConfig) -> Self {
        Self { spi, irq, config }
    }

    pub fn release(self) -> (SPI, IRQ) {
        (self.spi, self.irq)
    }

    /// Returns a sample while the pen is down and pressed firmly enough.
    ///
    /// PENIRQ is checked first so an idle panel costs one pin read.
    pub fn read(&mut self) -> TouchResult<SPI::Error, IRQ::Error, Option<TouchSample>> {
        if self.irq.is_high().map_err(TouchError::Irq)? {
            return Ok(None);
        }

        let z1 = self.sample(CMD_Z1)?;
        let z2 = self.sample(CMD_Z2)?;
        let pressure = pressure(z1, z2);
        if pressure < self.config.pressure_threshold {
            self.sample(CMD_POWER_DOWN)?;
            return Ok(None);
        }

        // First conversion after switching channels is noisy.
        self.sample(CMD_X)?;
        let mut xs = [0u16; SAMPLE_PAIRS];
        let mut ys = [0u16; SAMPLE_PAIRS];
        for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
            *x = self.sample(CMD_X)?;
            *y = self.sample(CMD_Y)?;
        }
        self.sample(CMD_POWER_DOWN)?;

        Ok(Some(TouchSample {
            raw_x: best_two_average(xs[0], xs[1], xs[2]),
            raw_y: best_two_average(ys[0], ys[1], ys[2]),
            pressure,
        }))
    }

    fn sample(&mut self, command: u8) -> TouchResult<SPI::Error, IRQ::Error, u16> {
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &[command, 0, 0])
            .map_err(TouchError::Spi)?;
        Ok(u16::from_be_bytes([rx[1], rx[2]]) >> 3)
    }
}

fn pressure(z1: u16, z2: u16) -> u16 {
    (z1 + ADC_MAX).saturating_sub(z2)
}

/// Averages the two closest of three readings, dropping the outlier.
fn best_two_average(a: u16, b: u16, c: u16) -> u16 {
    let ab = a.abs_diff(b);
    let ac = a.abs_diff(c);
    let bc = b.abs_diff(c);

    let (first, second) = if ab <= ac && ab <= bc {
        (a, b)
    } else if ac <= bc {
        (a, c)
    } else {
        (b, c)
    };
    ((first as u32 + second as u32) / 2) as u16
}
