// Bit-banged SPI with a reset pulse and a logic-analyser trigger on D7.
use mpsse_bridge::{spi::SoftSpi, spi::SpiBus, DeviceSelector, OpenOptions, PinState, Result};
use std::{thread, time::Duration};

fn main() -> Result<()> {
    env_logger::init();

    let mut spi = SoftSpi::open_default(&DeviceSelector::ft232h(), OpenOptions::default(), 100_000)?;

    spi.set_reset(PinState::Low)?;
    thread::sleep(Duration::from_millis(10));
    spi.set_reset(PinState::High)?;

    spi.trigger_pulse()?;
    spi.write(&[0xA5, 0x5A])?;
    let rx = spi.transfer(&[0x9F, 0x00])?;
    println!("Received {:02X?}", rx);

    spi.close()
}
