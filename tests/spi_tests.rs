//! Hardware and bit-banged SPI framing against a mock transport.

mod common;

use common::{fast_config, gpio_push, is_gpio_push, open_mpsse, open_mpsse_with, MockTransport};
use mpsse_bridge::spi::{
    BitOrder, ChipSelect, ChipSelectPolicy, HardwareSpi, SoftSpi, SpiBus, SpiConfig, SpiMode,
};
use mpsse_bridge::{ClockConfig, Error, GpioPin, MpsseConfig, PinState};

// D0 SCK, D1 MOSI and D3 CS as outputs; D2 MISO as input.
const SPI_DIR: u16 = 0x000B;
const CS_HIGH: u16 = 0x0008;

fn hardware_spi(mock: &MockTransport, config: SpiConfig) -> HardwareSpi<MockTransport> {
    let mut spi = HardwareSpi::new(open_mpsse(mock));
    spi.configure(&config).unwrap();
    mock.clear_writes();
    spi
}

fn per_transfer_config() -> SpiConfig {
    SpiConfig {
        chip_select: ChipSelect::Default,
        cs_policy: ChipSelectPolicy::per_transfer(),
        ..SpiConfig::default()
    }
}

// --- Hardware SPI ---

#[test]
fn test_configure_sequence() {
    let mock = MockTransport::new();
    let mut spi = HardwareSpi::new(open_mpsse(&mock));
    spi.configure(&per_transfer_config()).unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            gpio_push(0x0001, 0x0000), // SCK idle low first
            gpio_push(0x0009, CS_HIGH),
            vec![0x8A, 0x97, 0x8D],
            vec![0x86, 29, 0x00],
            gpio_push(SPI_DIR, CS_HIGH),
        ]
    );
}

#[test]
fn test_configure_mode2_idles_high() {
    let mock = MockTransport::new();
    let mut spi = HardwareSpi::new(open_mpsse(&mock));
    spi.configure(&SpiConfig {
        mode: SpiMode::Mode2,
        ..SpiConfig::default()
    })
    .unwrap();

    let writes = mock.writes();
    assert_eq!(writes[0], gpio_push(0x0001, 0x0001));
    assert_eq!(writes.last().unwrap(), &gpio_push(0x0003, 0x0001));
}

#[test]
fn test_write_brackets_chip_select() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());
    spi.write(&[0x01, 0x02]).unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            gpio_push(SPI_DIR, 0x0000),
            vec![0x10, 0x01, 0x00],
            vec![0x01, 0x02],
            gpio_push(SPI_DIR, CS_HIGH),
        ]
    );
}

#[test]
fn test_constant_assert_leaves_cs_alone() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(
        &mock,
        SpiConfig {
            chip_select: ChipSelect::Default,
            ..SpiConfig::default()
        },
    );
    spi.write(&[0xAA]).unwrap();
    assert_eq!(mock.writes(), vec![vec![0x10, 0x00, 0x00], vec![0xAA]]);
}

#[test]
fn test_manual_cs_control() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());

    spi.take_control_of_cs();
    spi.assert_chip_select().unwrap();
    spi.write(&[0x01]).unwrap();
    spi.write(&[0x02]).unwrap();
    spi.deassert_chip_select().unwrap();
    spi.release_control_of_cs();

    let pushes = mock.gpio_pushes();
    assert_eq!(
        pushes,
        vec![gpio_push(SPI_DIR, 0x0000), gpio_push(SPI_DIR, CS_HIGH)]
    );

    mock.clear_writes();
    spi.write(&[0x03]).unwrap();
    assert_eq!(mock.gpio_pushes().len(), 2);
}

#[test]
fn test_active_high_chip_select() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(
        &mock,
        SpiConfig {
            chip_select: ChipSelect::Pin(GpioPin::C1),
            cs_policy: ChipSelectPolicy {
                active_low: false,
                ..ChipSelectPolicy::per_transfer()
            },
            ..SpiConfig::default()
        },
    );
    spi.write(&[0x55]).unwrap();

    let dir = 0x0203; // D0, D1 and C1 out
    let pushes = mock.gpio_pushes();
    assert_eq!(pushes, vec![gpio_push(dir, 0x0200), gpio_push(dir, 0x0000)]);
}

#[test]
fn test_no_chip_select_is_noop() {
    for chip_select in [ChipSelect::None, ChipSelect::Hardware] {
        let mock = MockTransport::new();
        let mut spi = hardware_spi(
            &mock,
            SpiConfig {
                chip_select,
                cs_policy: ChipSelectPolicy::per_transfer(),
                ..SpiConfig::default()
            },
        );
        spi.assert_chip_select().unwrap();
        spi.write(&[0x01]).unwrap();
        spi.deassert_chip_select().unwrap();
        assert!(mock.gpio_pushes().is_empty());
    }
}

#[test]
fn test_write_opcodes_per_mode_and_order() {
    let cases = [
        (SpiMode::Mode0, BitOrder::MsbFirst, 0x10),
        (SpiMode::Mode1, BitOrder::MsbFirst, 0x11),
        (SpiMode::Mode2, BitOrder::LsbFirst, 0x18),
        (SpiMode::Mode3, BitOrder::LsbFirst, 0x19),
    ];
    for (mode, bit_order, expected) in cases {
        let mock = MockTransport::new();
        let mut spi = hardware_spi(
            &mock,
            SpiConfig {
                mode,
                bit_order,
                ..SpiConfig::default()
            },
        );
        spi.write(&[0x00]).unwrap();
        assert_eq!(mock.writes()[0][0], expected, "{mode:?} {bit_order:?}");
    }
}

#[test]
fn test_read_command_and_response() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, SpiConfig::default());
    mock.push_response(&[0xDE, 0xAD, 0xBE]);

    assert_eq!(spi.read(3).unwrap(), vec![0xDE, 0xAD, 0xBE]);
    assert_eq!(mock.writes(), vec![vec![0x24, 0x02, 0x00, 0x87]]);
}

#[test]
fn test_transfer_single_command() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());
    mock.push_response(&[0x00, 0xEF, 0x40]);

    let rx = spi.transfer(&[0x9F, 0x00, 0x00]).unwrap();
    assert_eq!(rx, vec![0x00, 0xEF, 0x40]);
    assert_eq!(
        mock.writes(),
        vec![
            gpio_push(SPI_DIR, 0x0000),
            vec![0x34, 0x02, 0x00, 0x9F, 0x00, 0x00, 0x87],
            gpio_push(SPI_DIR, CS_HIGH),
        ]
    );
}

#[test]
fn test_transfer_mode3_lsb_opcode() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(
        &mock,
        SpiConfig {
            mode: SpiMode::Mode3,
            bit_order: BitOrder::LsbFirst,
            ..SpiConfig::default()
        },
    );
    mock.push_response(&[0x00]);
    spi.transfer(&[0x00]).unwrap();
    assert_eq!(mock.writes()[0][0], 0x39);
}

#[test]
fn test_transfer_length_limits() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());

    assert!(matches!(spi.write(&[]), Err(Error::ArgumentOutOfRange(_))));
    assert!(matches!(spi.read(0), Err(Error::ArgumentOutOfRange(_))));
    let too_big = vec![0u8; 65537];
    assert!(matches!(
        spi.transfer(&too_big),
        Err(Error::OperationTooLarge {
            max: 65536,
            actual: 65537
        })
    ));
    assert!(mock.writes().is_empty());

    let max = vec![0u8; 65536];
    spi.write(&max).unwrap();
    assert_eq!(mock.writes()[1], vec![0x10, 0xFF, 0xFF]);
}

#[test]
fn test_trigger_pin() {
    let mock = MockTransport::new();
    let mut spi = HardwareSpi::new(open_mpsse(&mock));
    spi.enable_trigger();
    spi.configure(&SpiConfig::default()).unwrap();
    mock.clear_writes();

    spi.trigger_pulse().unwrap();
    assert_eq!(
        mock.writes(),
        vec![gpio_push(0x0083, 0x0080), gpio_push(0x0083, 0x0000)]
    );
}

#[test]
fn test_close_rejects_further_io() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, SpiConfig::default());
    spi.close().unwrap();
    assert!(mock.state().closed);
    assert!(matches!(spi.write(&[0x01]), Err(Error::DeviceNotOpen)));
}

#[test]
fn test_usable_as_trait_object() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, SpiConfig::default());
    let bus: &mut dyn SpiBus = &mut spi;
    bus.write(&[0x06]).unwrap();
    assert_eq!(mock.writes().len(), 2);
}

// --- Software SPI ---

// D0, D1, D3, D4 and D7 as outputs.
const SOFT_DIR: u16 = 0x009B;
// CS de-asserted, reset released.
const SOFT_IDLE: u16 = 0x0018;

fn soft_spi(mock: &MockTransport, bit_order: BitOrder) -> SoftSpi<MockTransport> {
    let mut spi = SoftSpi::new(open_mpsse(mock));
    spi.configure(&SpiConfig {
        clock_hz: 100_000,
        bit_order,
        cs_policy: ChipSelectPolicy::per_transfer(),
        ..SpiConfig::default()
    })
    .unwrap();
    mock.clear_writes();
    spi
}

#[test]
fn test_soft_configure() {
    let mock = MockTransport::new();
    let mut spi = SoftSpi::new(open_mpsse(&mock));
    spi.configure(&SpiConfig {
        clock_hz: 250_000,
        cs_policy: ChipSelectPolicy::per_transfer(),
        ..SpiConfig::default()
    })
    .unwrap();

    assert_eq!(mock.writes(), vec![gpio_push(SOFT_DIR, SOFT_IDLE)]);
    assert_eq!(mock.state().pacing, Some(250_000));
    assert!(spi.is_pin_high(GpioPin::D4));
    assert!(!spi.is_pin_high(GpioPin::D0));
}

#[test]
fn test_soft_write_byte_24_pushes() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    spi.write_byte(0xA5).unwrap();

    let writes = mock.writes();
    assert_eq!(writes.len(), 24);
    assert!(writes.iter().all(|w| is_gpio_push(w)));

    let bits = [1, 0, 1, 0, 0, 1, 0, 1];
    for (i, bit) in bits.iter().enumerate() {
        let data = if *bit == 1 { 0x0002 } else { 0x0000 };
        let level = SOFT_IDLE | data;
        // SCK is still high from the previous bit when the data changes.
        let held_clock = if i > 0 { 0x0001 } else { 0x0000 };
        assert_eq!(
            writes[3 * i],
            gpio_push(SOFT_DIR, level | held_clock),
            "bit {i} data"
        );
        assert_eq!(writes[3 * i + 1], gpio_push(SOFT_DIR, level), "bit {i} fall");
        assert_eq!(
            writes[3 * i + 2],
            gpio_push(SOFT_DIR, level | 0x0001),
            "bit {i} rise"
        );
    }
    assert_eq!(
        spi.mpsse().registers().level_of(GpioPin::D0),
        PinState::Low
    );
}

#[test]
fn test_soft_write_lsb_first() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::LsbFirst);
    spi.write_byte(0x01).unwrap();

    let writes = mock.writes();
    assert_eq!(writes[0], gpio_push(SOFT_DIR, SOFT_IDLE | 0x0002));
    assert_eq!(writes[3], gpio_push(SOFT_DIR, SOFT_IDLE | 0x0001));
}

#[test]
fn test_soft_transfer_byte_samples_miso() {
    for (order, expected) in [(BitOrder::MsbFirst, 0x80), (BitOrder::LsbFirst, 0x01)] {
        let mock = MockTransport::new();
        let mut spi = soft_spi(&mock, order);
        mock.push_response(&[0x04, 0x00]);
        for _ in 1..8 {
            mock.push_response(&[0x00, 0x00]);
        }
        assert_eq!(spi.transfer_byte(0x00).unwrap(), expected, "{order:?}");

        let reads = mock
            .writes()
            .into_iter()
            .filter(|w| w == &vec![0x81, 0x83])
            .count();
        assert_eq!(reads, 8);
    }
}

#[test]
fn test_soft_bus_write_brackets_cs() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    spi.write(&[0x00, 0xFF]).unwrap();

    let writes = mock.writes();
    assert_eq!(writes.len(), 1 + 48 + 1);
    assert_eq!(writes[0], gpio_push(SOFT_DIR, 0x0010));
    assert_eq!(writes[49], gpio_push(SOFT_DIR, SOFT_IDLE | 0x0002));
}

#[test]
fn test_soft_read_clocks_zeros() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    for _ in 0..16 {
        mock.push_response(&[0x04, 0x00]);
    }
    assert_eq!(spi.read(2).unwrap(), vec![0xFF, 0xFF]);
    assert!(mock
        .gpio_pushes()
        .iter()
        .all(|push| push[1] & 0x02 == 0));
}

#[test]
fn test_soft_reset_and_trigger() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);

    spi.set_reset(PinState::Low).unwrap();
    assert!(!spi.is_pin_high(GpioPin::D4));

    mock.clear_writes();
    spi.trigger_pulse().unwrap();
    assert_eq!(
        mock.writes(),
        vec![gpio_push(SOFT_DIR, 0x0088), gpio_push(SOFT_DIR, 0x0008)]
    );
    assert!(!spi.is_pin_high(GpioPin::D7));
}

// --- Error propagation ---

#[test]
fn test_set_clock_keeps_clock_modes() {
    let mock = MockTransport::new();
    let config = MpsseConfig {
        clock: ClockConfig::new(1_000_000).adaptive(true).three_phase(true),
        ..fast_config()
    };
    let mut spi = HardwareSpi::new(open_mpsse_with(&mock, config));
    spi.configure(&SpiConfig::default()).unwrap();
    assert!(mock.writes().contains(&vec![0x8A, 0x96, 0x8C]));

    mock.clear_writes();
    spi.set_clock(100_000).unwrap();
    let [low, high] = 199u16.to_le_bytes(); // 299 * 2 / 3
    assert_eq!(
        mock.writes(),
        vec![vec![0x8A, 0x96, 0x8C], vec![0x86, low, high]]
    );
    let clock = spi.mpsse().clock().unwrap();
    assert!(clock.adaptive && clock.three_phase);
    assert_eq!(clock.frequency_hz, 100_000);
}

#[test]
fn test_hardware_write_stops_on_transport_error() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());
    mock.fail_write_after(1); // the clock-bytes command

    assert!(matches!(spi.write(&[0x01, 0x02]), Err(Error::Io(_))));
    // CS went low, nothing after the failed command.
    assert_eq!(mock.writes(), vec![gpio_push(SPI_DIR, 0x0000)]);
}

#[test]
fn test_hardware_short_write_propagates() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, SpiConfig::default());
    mock.set_short_write(Some(2));

    assert!(matches!(
        spi.write(&[0x01, 0x02]),
        Err(Error::ShortWrite {
            expected: 3,
            actual: 2
        })
    ));
    assert_eq!(mock.writes().len(), 1);

    mock.clear_writes();
    assert!(matches!(
        spi.read(4),
        Err(Error::ShortWrite {
            expected: 4,
            actual: 2
        })
    ));
    assert_eq!(mock.reads(), 1); // only the sync echo at bring-up
}

#[test]
fn test_hardware_read_times_out() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, SpiConfig::default());

    match spi.read(3) {
        Err(Error::PollTimeout {
            expected, received, ..
        }) => {
            assert_eq!(expected, 3);
            assert_eq!(received, 0);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_hardware_transfer_timeout_leaves_cs_asserted() {
    let mock = MockTransport::new();
    let mut spi = hardware_spi(&mock, per_transfer_config());
    mock.push_response(&[0xEF]);

    assert!(matches!(
        spi.transfer(&[0x9F, 0x00, 0x00]),
        Err(Error::PollTimeout {
            expected: 3,
            received: 1,
            ..
        })
    ));
    assert_eq!(mock.gpio_pushes(), vec![gpio_push(SPI_DIR, 0x0000)]);
}

#[test]
fn test_soft_write_byte_aborts_remaining_edges() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    mock.fail_write_after(4); // falling edge of the second bit

    assert!(matches!(spi.write_byte(0xA5), Err(Error::Io(_))));
    assert_eq!(mock.writes().len(), 4);
    assert!(spi.write_byte(0xA5).is_err());
    assert_eq!(mock.writes().len(), 4);
}

#[test]
fn test_soft_write_byte_short_write() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    mock.set_short_write(Some(0));

    assert!(matches!(
        spi.write_byte(0xA5),
        Err(Error::ShortWrite {
            expected: 6,
            actual: 0
        })
    ));
    assert_eq!(mock.writes().len(), 1);
}

#[test]
fn test_soft_transfer_byte_times_out_without_sample() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);

    assert!(matches!(
        spi.transfer_byte(0xFF),
        Err(Error::PollTimeout {
            expected: 2,
            received: 0,
            ..
        })
    ));
    // One bit's three edges and the bank read command, then nothing.
    let writes = mock.writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[3], vec![0x81, 0x83]);
}

#[test]
fn test_soft_bus_transfer_error_skips_deassert() {
    let mock = MockTransport::new();
    let mut spi = soft_spi(&mock, BitOrder::MsbFirst);
    mock.fail_write_after(2); // second edge of the first bit

    assert!(matches!(spi.transfer(&[0x01, 0x02]), Err(Error::Io(_))));
    let pushes = mock.gpio_pushes();
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0], gpio_push(SOFT_DIR, 0x0010)); // CS asserted
}
