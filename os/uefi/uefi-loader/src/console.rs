//! # Console UX
//!
//! Banner, screen clearing, and the halt-path key wait. Everything here is
//! best-effort: console failures never abort a boot that could otherwise
//! proceed, and none of these functions may be called after the first
//! `ExitBootServices` attempt.

use crate::config::{ClearPolicy, LoaderConfig};
use uefi::{boot, system};

/// Clears the screen and prints the banner, in the configured order.
pub fn greet(config: &LoaderConfig) {
    match config.clear {
        ClearPolicy::BeforeBanner => {
            clear();
            banner();
        }
        ClearPolicy::AfterBanner => {
            banner();
            clear();
        }
        ClearPolicy::Never => banner(),
    }
}

fn clear() {
    let _ = system::with_stdout(|stdout| stdout.clear());
}

fn banner() {
    uefi::println!();
    uefi::println!("========================================");
    uefi::println!("  UEFI boot stub");
    uefi::println!("========================================");
    uefi::println!();
}

/// Blocks until the operator presses a key. Used on the halt path so the
/// diagnostic stays readable before control returns to the firmware.
pub fn wait_for_key() {
    let event = system::with_stdin(|stdin| stdin.wait_for_key_event());
    if let Some(event) = event {
        let mut events = [event];
        let _ = boot::wait_for_event(&mut events);
    }
    let _ = system::with_stdin(uefi::proto::console::text::Input::read_key);
}
