//! Edge detection on the raw device status byte.

use std::time::Instant;

/// Bit positions of the two signals inside the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalMap {
    pub pressed_bit: u8,
    pub power_down_bit: u8,
}

impl Default for SignalMap {
    fn default() -> Self {
        Self {
            pressed_bit: 0,
            power_down_bit: 1,
        }
    }
}

impl SignalMap {
    pub fn is_pressed(&self, status: u8) -> bool {
        bit_set(status, self.pressed_bit)
    }

    pub fn is_power_down(&self, status: u8) -> bool {
        bit_set(status, self.power_down_bit)
    }
}

fn bit_set(status: u8, bit: u8) -> bool {
    bit < 8 && status & (1 << bit) != 0
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Active { started: Instant },
}

/// What a single status observation produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transitions {
    /// The press signal went high
    pub cycle_started: bool,
    /// The press signal went low; duration of the cycle in whole seconds
    pub cycle_completed: Option<u32>,
    /// The power-down signal went high
    pub power_down: bool,
}

/// Two-state machine turning press/release levels into cycle durations.
#[derive(Debug, Clone)]
pub struct CycleEventDetector {
    signals: SignalMap,
    state: CycleState,
    power_down_level: bool,
}

impl CycleEventDetector {
    pub fn new(signals: SignalMap) -> Self {
        Self {
            signals,
            state: CycleState::Idle,
            power_down_level: false,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Feed one status byte observed at `now`.
    pub fn observe(&mut self, status: u8, now: Instant) -> Transitions {
        let mut transitions = Transitions::default();
        let pressed = self.signals.is_pressed(status);

        match (self.state, pressed) {
            (CycleState::Idle, true) => {
                self.state = CycleState::Active { started: now };
                transitions.cycle_started = true;
            }
            (CycleState::Active { started }, false) => {
                let secs = now.saturating_duration_since(started).as_secs();
                self.state = CycleState::Idle;
                transitions.cycle_completed = Some(u32::try_from(secs).unwrap_or(u32::MAX));
            }
            _ => {}
        }

        let power_down = self.signals.is_power_down(status);
        transitions.power_down = power_down && !self.power_down_level;
        self.power_down_level = power_down;

        transitions
    }
}
