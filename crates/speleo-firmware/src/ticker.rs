//! 1 kHz timer interrupt behind the millisecond clock.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::Blocking;
use esp_hal::handler;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use esp_hal::timer::timg::Timer;

use speleo_core::clock::MillisCounter;

/// Milliseconds since boot or since the last wake from sleep.
pub static MILLIS: MillisCounter = MillisCounter::new();

static TICKER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

#[handler]
fn on_tick() {
    critical_section::with(|cs| {
        if let Some(timer) = TICKER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    MILLIS.increment();
}

/// Starts the periodic interrupt on `timer`. The timer is owned by the
/// interrupt from here on.
pub fn start(timer: Timer<'static>) -> Result<(), esp_hal::timer::Error> {
    let mut periodic = PeriodicTimer::new(timer);
    periodic.set_interrupt_handler(on_tick);
    periodic.listen();
    periodic.start(Duration::from_millis(1))?;
    critical_section::with(|cs| TICKER.replace(cs, Some(periodic)));
    Ok(())
}
