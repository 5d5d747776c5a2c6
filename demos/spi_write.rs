// Reads the JEDEC ID of a SPI flash on D0-D3, then writes a short pattern
// with chip select toggled per transfer.
use mpsse_bridge::{
    spi::{ChipSelect, ChipSelectPolicy, HardwareSpi, SpiBus, SpiConfig, SpiMode},
    DeviceSelector, OpenOptions, Result,
};

fn main() -> Result<()> {
    env_logger::init();

    let mut spi = HardwareSpi::open_default(&DeviceSelector::ft232h(), OpenOptions::default())?;
    spi.configure(&SpiConfig {
        chip_select: ChipSelect::Default,
        clock_hz: 5_000_000,
        mode: SpiMode::Mode0,
        cs_policy: ChipSelectPolicy::per_transfer(),
        ..SpiConfig::default()
    })?;

    let id = spi.transfer(&[0x9F, 0x00, 0x00, 0x00])?;
    println!("JEDEC ID: {:02X?}", &id[1..]);

    // Several commands under one assertion.
    spi.take_control_of_cs();
    spi.assert_chip_select()?;
    spi.write(&[0x06])?;
    spi.write(&[0x01, 0x02, 0x03, 0x04])?;
    spi.deassert_chip_select()?;
    spi.release_control_of_cs();

    spi.close()
}
