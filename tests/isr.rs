mod common;

use common::{DataInPin, DataOutPin, ClockPin, Line, SimClock, config};
use embedded_hal_mock::eh1::delay::NoopDelay;
use gblink::timer::{
    global_link_poll_sequence, global_link_start_receive, global_link_timer_tick,
};
use gblink::{BitValue, Error, init_link_driver, setup_link_driver, tick_link_timer};

init_link_driver!(ClockPin, DataOutPin, DataInPin, NoopDelay, SimClock);

#[test]
fn test_interrupt_driven_receive() {
    let line = Line::new();
    {
        let mut console = line.console();
        // 0b110 = 6
        let _ = console.send_value(6, 20_000);
    }

    assert_eq!(
        global_link_start_receive(&LINK_DRIVER),
        Err(Error::NotInitialized)
    );
    assert_eq!(
        global_link_poll_sequence(&LINK_DRIVER),
        Err(nb::Error::Other(Error::NotInitialized))
    );
    // ticking an empty slot is a no-op
    tick_link_timer!();

    let (clk, dout, din, clock) = line.pins();
    setup_link_driver!(clk, dout, din, NoopDelay::new(), clock, Some(config())).unwrap();
    global_link_start_receive(&LINK_DRIVER).unwrap();

    let mut ticks = 0;
    let stream = loop {
        match global_link_poll_sequence(&LINK_DRIVER) {
            Ok(stream) => break stream,
            Err(nb::Error::WouldBlock) => {
                if ticks % 2 == 0 {
                    tick_link_timer!();
                } else {
                    global_link_timer_tick(&LINK_DRIVER);
                }
                ticks += 1;
            }
            Err(nb::Error::Other(err)) => panic!("receive failed: {err}"),
        }
    };

    assert_eq!(
        stream.as_slice(),
        &[BitValue::One, BitValue::One, BitValue::Zero, BitValue::Timeout]
    );
    assert_eq!(stream.value(), Some(6));
    // ~1.6 s of pulses and gaps, then the 5 s deadline
    assert!(ticks > 1_000);
    assert_eq!(
        global_link_poll_sequence(&LINK_DRIVER),
        Err(nb::Error::Other(Error::NotReceiving))
    );
}
