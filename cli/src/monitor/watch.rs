use color_eyre::eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::chooser::expand_home;
use crate::monitor::StateCoordinator;

/// Runs the watch loop on its own single-threaded runtime until the user
/// quits or the process is interrupted.
pub fn run_monitor(coordinator: StateCoordinator) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_monitor_loop(coordinator))
}

async fn run_monitor_loop(mut coordinator: StateCoordinator) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Watch starting");

    coordinator.request_permission();
    coordinator.set_tracking(true);

    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    print_command_help();

    loop {
        tokio::select! {
            maybe_state = coordinator.next_state(), if coordinator.is_tracking() => {
                match maybe_state {
                    Some(state) => coordinator.handle_state(state),
                    None => {
                        warn!("state stream ended, tracking disabled");
                        coordinator.set_tracking(false);
                    }
                }
            }
            line = stdin_lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(&mut coordinator, line.trim()) {
                            break;
                        }
                    }
                    Ok(None) => {
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin closed");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    coordinator.shutdown();
    info!("Watch stopped");
    Ok(())
}

/// Applies one line from the terminal. Returns `false` when the user asked
/// to quit.
fn handle_command(coordinator: &mut StateCoordinator, command: &str) -> bool {
    let (verb, rest) = match command.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (command, ""),
    };

    match verb {
        "" => {}
        "sound" if !rest.is_empty() => coordinator.set_sound_from(&expand_home(rest)),
        "sound" => println!("usage: sound <path-to-file>"),
        "reset" => coordinator.reset_sound(),
        "pause" => coordinator.set_tracking(false),
        "resume" => coordinator.set_tracking(true),
        "status" => print_status(coordinator),
        "help" | "?" => print_command_help(),
        "quit" | "q" | "exit" => return false,
        other => println!("unknown command: {} (try 'help')", other),
    }

    true
}

fn print_status(coordinator: &StateCoordinator) {
    let sound = coordinator
        .sound_name()
        .unwrap_or_else(|| "built-in tone".to_string());
    println!(
        "tracking: {}  alarm: {}  sound: {}",
        if coordinator.is_tracking() { "on" } else { "off" },
        if coordinator.is_alarm_on() {
            "ringing"
        } else {
            "quiet"
        },
        sound
    );
}

fn print_command_help() {
    println!("Commands: sound <path> | reset | pause | resume | status | help | quit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use tether_platform::{BatteryState, ChargeStatus, PowerError, PowerObserver, Subscription};

    use crate::chooser::{ChooserError, SoundChooser};
    use crate::config::RepeatPolicy;
    use crate::monitor::{AlarmSignal, ChargeTracker};
    use crate::notify::SilentGateway;
    use crate::sound::{PlaybackError, PulsePlayer, SoundAsset, SoundStore};

    struct QuietPlayer;

    #[async_trait]
    impl PulsePlayer for QuietPlayer {
        async fn play(&self, _asset: Option<&SoundAsset>) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn stop(&self) {}
    }

    struct NoChooser;

    impl SoundChooser for NoChooser {
        fn choose(&mut self) -> Result<Option<PathBuf>, ChooserError> {
            Ok(None)
        }
    }

    /// Observer that hands its delivery channel to the test.
    struct ChannelObserver {
        plugged: Arc<AtomicBool>,
        handle: Arc<Mutex<Option<mpsc::Sender<BatteryState>>>>,
    }

    impl PowerObserver for ChannelObserver {
        fn is_plugged_in(&self) -> bool {
            self.plugged.load(Ordering::SeqCst)
        }

        fn subscribe(
            &mut self,
            tx: mpsc::Sender<BatteryState>,
        ) -> Result<Subscription, PowerError> {
            *self.handle.lock().unwrap() = Some(tx);
            let (stop_tx, _stop_rx) = std::sync::mpsc::channel();
            Ok(Subscription::new(stop_tx))
        }
    }

    struct Scenario {
        coordinator: StateCoordinator,
        plugged: Arc<AtomicBool>,
        handle: Arc<Mutex<Option<mpsc::Sender<BatteryState>>>>,
        dir: tempfile::TempDir,
    }

    fn scenario() -> Scenario {
        let dir = tempfile::tempdir().unwrap();
        let plugged = Arc::new(AtomicBool::new(true));
        let handle = Arc::new(Mutex::new(None));

        let observer = ChannelObserver {
            plugged: Arc::clone(&plugged),
            handle: Arc::clone(&handle),
        };
        let tracker = ChargeTracker::new(Box::new(observer), RepeatPolicy::DedupeConsecutive);
        let alarm = AlarmSignal::new(Arc::new(QuietPlayer));
        let store = SoundStore::at(dir.path().join("sound"));

        Scenario {
            coordinator: StateCoordinator::new(
                tracker,
                alarm,
                store,
                Box::new(SilentGateway),
                Box::new(NoChooser),
            ),
            plugged,
            handle,
            dir,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_unplug_replug_cycle_drives_the_alarm() {
        let mut s = scenario();
        s.coordinator.set_tracking(true);
        let tx = s.handle.lock().unwrap().take().unwrap();

        // Unplugged and draining: the alarm comes up.
        s.plugged.store(false, Ordering::SeqCst);
        tx.try_send(BatteryState::now(ChargeStatus::NotCharging)).unwrap();
        let state = s.coordinator.next_state().await.unwrap();
        s.coordinator.handle_state(state);
        assert!(s.coordinator.is_alarm_on());

        // Plugged back in and topped up: the alarm goes quiet.
        s.plugged.store(true, Ordering::SeqCst);
        tx.try_send(BatteryState::now(ChargeStatus::Full)).unwrap();
        let state = s.coordinator.next_state().await.unwrap();
        s.coordinator.handle_state(state);
        assert!(!s.coordinator.is_alarm_on());

        // Shutdown closes the session for good.
        s.coordinator.shutdown();
        assert!(!s.coordinator.is_tracking());
        assert_eq!(s.coordinator.next_state().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_commands_end_the_loop_and_others_do_not() {
        let mut s = scenario();
        assert!(!handle_command(&mut s.coordinator, "quit"));
        assert!(!handle_command(&mut s.coordinator, "q"));
        assert!(!handle_command(&mut s.coordinator, "exit"));
        assert!(handle_command(&mut s.coordinator, ""));
        assert!(handle_command(&mut s.coordinator, "status"));
        assert!(handle_command(&mut s.coordinator, "bogus"));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_commands_toggle_tracking() {
        let mut s = scenario();
        s.coordinator.set_tracking(true);
        assert!(s.coordinator.is_tracking());

        assert!(handle_command(&mut s.coordinator, "pause"));
        assert!(!s.coordinator.is_tracking());

        assert!(handle_command(&mut s.coordinator, "resume"));
        assert!(s.coordinator.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn sound_and_reset_commands_manage_the_custom_sound() {
        let mut s = scenario();
        let source = s.dir.path().join("ding.wav");
        fs::write(&source, b"RIFFfake").unwrap();

        let line = format!("sound {}", source.display());
        assert!(handle_command(&mut s.coordinator, &line));
        assert!(s.coordinator.has_custom_sound());
        assert_eq!(s.coordinator.sound_name().as_deref(), Some("ding.wav"));

        assert!(handle_command(&mut s.coordinator, "reset"));
        assert!(!s.coordinator.has_custom_sound());
        assert_eq!(s.coordinator.sound_name(), None);
    }
}
