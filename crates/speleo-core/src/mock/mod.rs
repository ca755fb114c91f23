//! Simulated hardware for host builds
//!
//! Everything here shares one virtual time base, [`SimClock`], so a test or
//! the simulator can step the whole device deterministically: the sensor's
//! measurement cadence, the button script and every blocking delay move the
//! same clock.
//!
//! Handles are cheap `Rc` clones; keep one to inspect or steer a part after
//! handing another to the [`Monitor`](crate::app::Monitor).

mod board;
mod button;
mod clock;
mod journal;
mod sensor;

pub use board::{MockBoard, MockDisplay};
pub use button::ScriptedButton;
pub use clock::{SimClock, SimDelay};
pub use journal::{Journal, JournalEntry};
pub use sensor::{SimBusError, SimulatedScd4x};
