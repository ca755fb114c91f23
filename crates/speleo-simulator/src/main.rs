//! Desktop simulator for the speleo CO₂ monitor.
//!
//! Runs the real [`Monitor`] state machine from speleo-core against the
//! simulated SCD4x from its `mock` module. By default the panel is rendered
//! in an SDL2 window via `embedded-graphics-simulator`; with `--headless` a
//! fixed scenario is played on virtual time and the text screen is logged.
//!
//! # Key bindings
//!
//! | Key     | Action                              |
//! |---------|-------------------------------------|
//! | Space   | The device button (hold for long)   |
//! | Up/Down | Raise/lower the simulated CO₂ level |
//! | B / N   | Lower/raise the battery voltage     |
//! | Q       | Quit                                |

mod window_board;

use log::{error, info};

use speleo_core::config::MonitorConfig;
use speleo_core::mock::{MockBoard, ScriptedButton, SimClock, SimDelay, SimulatedScd4x};
use speleo_core::{Monitor, Scd4x};

use window_board::{KeyButton, WindowBoard};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting speleo simulator");

    if std::env::args().any(|arg| arg == "--headless") {
        run_scenario();
    } else {
        run_window();
    }

    info!("Simulator exiting");
}

// ---------------------------------------------------------------------------
// Interactive window
// ---------------------------------------------------------------------------

fn run_window() {
    info!("Keys: Space=button  Up/Down=CO2  B/N=battery  Q=Quit");

    let clock = SimClock::new();
    let sensor = SimulatedScd4x::new(clock.clone());
    let button = KeyButton::default();
    let board = WindowBoard::new(clock.clone(), sensor.clone(), button.clone());
    let mut monitor = Monitor::new(
        Scd4x::new(sensor, SimDelay::new(clock)),
        board,
        button,
        MonitorConfig::default(),
    );

    match monitor.boot() {
        Ok(variant) => info!("Booted with {}", variant.name()),
        Err(e) => {
            error!("Boot failed: {}", e);
            return;
        }
    }

    while !monitor.board().quit_requested() {
        monitor.board_mut().frame();
        monitor.step();
    }
}

// ---------------------------------------------------------------------------
// Headless scenario
// ---------------------------------------------------------------------------

/// Steps the monitor every 10 ms of virtual time.
fn run_for(clock: &SimClock, monitor: &mut HeadlessMonitor, ms: u64) {
    let end = clock.now_ms() + ms;
    while clock.now_ms() < end {
        clock.advance_ms(10);
        monitor.step();
    }
}

type HeadlessMonitor = Monitor<SimulatedScd4x, SimDelay, ScriptedButton, MockBoard>;

fn snapshot(label: &str, monitor: &HeadlessMonitor) {
    info!(
        "{} ({:?}):\n{}",
        label,
        monitor.state(),
        monitor.board().frame().render()
    );
}

fn run_scenario() {
    let clock = SimClock::new();
    let sensor = SimulatedScd4x::new(clock.clone());
    let button = ScriptedButton::new(clock.clone());
    let mut monitor = Monitor::new(
        Scd4x::new(sensor.clone(), SimDelay::new(clock.clone())),
        MockBoard::new(clock.clone()),
        button.clone(),
        MonitorConfig::default(),
    );

    if let Err(e) = monitor.boot() {
        error!("Boot failed: {}", e);
        return;
    }
    if let Some(splash) = monitor.board().screen_history().last() {
        info!("Splash:\n{}", splash);
    }

    // Grace period, then a stuffy passage and back out into fresh air.
    sensor.set_co2_ppm(900);
    run_for(&clock, &mut monitor, 30_000);
    snapshot("Warming up", &monitor);

    let mut climb: Vec<u16> = (0..20).map(|i| 900 + i * 600).collect();
    climb.extend((0..40).map(|i| 12_300u16.saturating_sub(i * 300)));
    sensor.script_co2(&climb);
    run_for(&clock, &mut monitor, 200_000);
    snapshot("Peak", &monitor);
    run_for(&clock, &mut monitor, 400_000);
    snapshot("Recovered", &monitor);
    info!("Tones so far: {:?}", monitor.board().tones());

    // Into the menu and set the altitude to 300 m.
    button.press_in(0, 200);
    run_for(&clock, &mut monitor, 400);
    for _ in 0..3 {
        button.press_in(0, 200);
        run_for(&clock, &mut monitor, 400);
    }
    button.press_in(0, 1200);
    run_for(&clock, &mut monitor, 1500);
    for _ in 0..3 {
        button.press_in(0, 200);
        run_for(&clock, &mut monitor, 400);
    }
    button.press_in(0, 1200);
    run_for(&clock, &mut monitor, 1500);
    snapshot("Menu", &monitor);
    info!("Sensor altitude: {} m", sensor.altitude());

    // Menu times out back to Measuring.
    run_for(&clock, &mut monitor, 12_000);
    snapshot("Back to measuring", &monitor);
}
