// Blinks C0 (ACBUS0) on an FT232H.
use mpsse_bridge::{DeviceSelector, GpioDirection, GpioPin, Mpsse, MpsseConfig, OpenOptions, Result};
use std::{thread, time::Duration};

fn main() -> Result<()> {
    env_logger::init();

    let mut mpsse = Mpsse::open_device(
        &DeviceSelector::ft232h(),
        OpenOptions::default(),
        MpsseConfig::relaxed(),
    )?;
    println!("MPSSE synced, clock {:?}", mpsse.clock());

    let pin = GpioPin::C0;
    mpsse.config_pin(pin, GpioDirection::Output)?;

    for i in 0..10 {
        println!("Blink {} on {}", i, pin);
        mpsse.output_high(pin)?;
        thread::sleep(Duration::from_millis(250));
        mpsse.output_low(pin)?;
        thread::sleep(Duration::from_millis(250));
    }

    println!("{}", mpsse);
    mpsse.close()
}
