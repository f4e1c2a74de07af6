//! Debug toggles whose effect is strictly logging.

use std::sync::atomic::{AtomicBool, Ordering};

static PRINT_STAKE_MODIFIER: AtomicBool = AtomicBool::new(false);
static DEBUG: AtomicBool = AtomicBool::new(false);

/// Enables the per-round selection log and the selection-map dump.
pub fn set_print_stake_modifier(enabled: bool) {
    PRINT_STAKE_MODIFIER.store(enabled, Ordering::Relaxed);
}

pub fn print_stake_modifier() -> bool {
    PRINT_STAKE_MODIFIER.load(Ordering::Relaxed)
}

pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}
