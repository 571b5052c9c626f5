//! # Gesture Translator
//!
//! Turns raw pointer input into player commands.
//!
//! Taps run through a small state machine:
//!
//! ```text
//!   Idle ──tap──> SingleTapPending ──tap_delay──> Idle            (toggle controls)
//!   SingleTapPending ──tap──> MultiTapping                        (seek ±2 steps)
//!   MultiTapping ──tap, same side──> MultiTapping                 (one more step)
//!   MultiTapping ──tap, other side──> MultiTapping                (new baseline)
//!   MultiTapping ──seek_accumulation_reset──> Idle
//! ```
//!
//! Taps on the right half seek forward, taps on the left half seek backward.
//! Offsets accumulate from the position captured before the first tap of the
//! sequence. Vertical drags in the outer thirds adjust brightness (left) or
//! volume (right); pinches switch between fit and fill.

use crate::timer::TimerSlot;
use crate::types::VideoScaleMode;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// Scale delta a pinch must exceed before it switches the scale mode.
const PINCH_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

impl SeekDirection {
    fn from_tap(x: f32, width: f32) -> Self {
        if x >= width / 2.0 {
            SeekDirection::Forward
        } else {
            SeekDirection::Backward
        }
    }
}

/// Command produced by a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureCommand {
    ToggleControls,
    /// Seek to `target`; `offset_secs` is the accumulated offset for feedback.
    SeekTo { target: Duration, offset_secs: i64 },
    /// Fraction of the full range, positive upwards.
    AdjustVolume { delta: f32 },
    AdjustBrightness { delta: f32 },
    SetScaleMode(VideoScaleMode),
}

/// Player state a gesture is interpreted against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum TapState {
    Idle,
    SingleTapPending {
        direction: SeekDirection,
        baseline: Duration,
        generation: u64,
    },
    MultiTapping {
        direction: SeekDirection,
        baseline: Duration,
        taps: u32,
        generation: u64,
    },
}

/// What the caller must do after feeding a tap.
#[derive(Debug, Clone, PartialEq)]
pub enum TapAction {
    /// Arm the tap-delay timer for `generation`.
    AwaitSecondTap { generation: u64 },
    /// Apply `command` and (re)arm the reset timer for `generation`.
    Seek {
        command: GestureCommand,
        generation: u64,
    },
}

/// Timer-free tap state machine.
#[derive(Debug)]
pub struct GestureRecognizer {
    state: TapState,
    step: Duration,
    generation: u64,
}

fn clamp(target: i128, duration: Option<Duration>) -> Duration {
    let millis = target.max(0) as u128;
    let target = Duration::from_millis(millis.min(u64::MAX as u128) as u64);
    match duration {
        Some(duration) => target.min(duration),
        None => target,
    }
}

impl GestureRecognizer {
    pub fn new(step: Duration) -> Self {
        Self {
            state: TapState::Idle,
            step,
            generation: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == TapState::Idle
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn seek_command(
        &self,
        direction: SeekDirection,
        baseline: Duration,
        taps: u32,
        duration: Option<Duration>,
    ) -> GestureCommand {
        let offset_ms = self.step.as_millis() as i128 * taps as i128;
        let signed = match direction {
            SeekDirection::Forward => offset_ms,
            SeekDirection::Backward => -offset_ms,
        };
        GestureCommand::SeekTo {
            target: clamp(baseline.as_millis() as i128 + signed, duration),
            offset_secs: (signed / 1000) as i64,
        }
    }

    pub fn tap(&mut self, x: f32, width: f32, context: GestureContext) -> TapAction {
        let direction = SeekDirection::from_tap(x, width);

        if context.locked {
            // Locked controls only toggle; every tap restarts the delay window.
            let generation = self.next_generation();
            self.state = TapState::SingleTapPending {
                direction,
                baseline: context.position,
                generation,
            };
            return TapAction::AwaitSecondTap { generation };
        }

        let (baseline, taps) = match self.state.clone() {
            TapState::Idle => {
                let generation = self.next_generation();
                self.state = TapState::SingleTapPending {
                    direction,
                    baseline: context.position,
                    generation,
                };
                return TapAction::AwaitSecondTap { generation };
            }
            TapState::SingleTapPending {
                direction: first,
                baseline,
                ..
            } => {
                if first == direction {
                    (baseline, 2)
                } else {
                    (context.position, 1)
                }
            }
            TapState::MultiTapping {
                direction: current,
                baseline,
                taps,
                ..
            } => {
                if current == direction {
                    (baseline, taps + 1)
                } else {
                    (context.position, 1)
                }
            }
        };

        let generation = self.next_generation();
        self.state = TapState::MultiTapping {
            direction,
            baseline,
            taps,
            generation,
        };
        TapAction::Seek {
            command: self.seek_command(direction, baseline, taps, context.duration),
            generation,
        }
    }

    /// Tap-delay timer fired.
    pub fn tap_delay_elapsed(&mut self, generation: u64) -> Option<GestureCommand> {
        match self.state {
            TapState::SingleTapPending {
                generation: pending,
                ..
            } if pending == generation => {
                self.state = TapState::Idle;
                Some(GestureCommand::ToggleControls)
            }
            _ => None,
        }
    }

    /// Reset timer fired.
    pub fn reset_elapsed(&mut self, generation: u64) -> bool {
        match self.state {
            TapState::MultiTapping {
                generation: current,
                ..
            } if current == generation => {
                self.state = TapState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = TapState::Idle;
    }
}

/// Vertical drag starting at `start_x`; `dy` grows downwards.
pub fn drag(start_x: f32, width: f32, dy: f32, height: f32, locked: bool) -> Option<GestureCommand> {
    if locked || width <= 0.0 || height <= 0.0 {
        return None;
    }

    let delta = -dy / height;
    if start_x < width / 3.0 {
        Some(GestureCommand::AdjustBrightness { delta })
    } else if start_x > width * 2.0 / 3.0 {
        Some(GestureCommand::AdjustVolume { delta })
    } else {
        None
    }
}

/// Pinch with the gesture's cumulative `scale`.
pub fn pinch(scale: f32, current: VideoScaleMode, locked: bool) -> Option<GestureCommand> {
    if locked {
        return None;
    }

    let target = if scale > 1.0 + PINCH_THRESHOLD {
        VideoScaleMode::Fill
    } else if scale < 1.0 - PINCH_THRESHOLD {
        VideoScaleMode::Fit
    } else {
        return None;
    };

    (target != current).then_some(GestureCommand::SetScaleMode(target))
}

pub type GestureSink = Arc<dyn Fn(GestureCommand) + Send + Sync>;

/// [`GestureRecognizer`] driven by real timers.
///
/// Commands are delivered to the sink outside the recognizer lock.
pub struct GestureTranslator {
    recognizer: Mutex<GestureRecognizer>,
    tap_timer: TimerSlot,
    reset_timer: TimerSlot,
    tap_delay: Duration,
    reset_after: Duration,
    sink: GestureSink,
}

impl GestureTranslator {
    pub fn new(
        runtime: Handle,
        step: Duration,
        tap_delay: Duration,
        reset_after: Duration,
        sink: GestureSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            recognizer: Mutex::new(GestureRecognizer::new(step)),
            tap_timer: TimerSlot::new(runtime.clone()),
            reset_timer: TimerSlot::new(runtime),
            tap_delay,
            reset_after,
            sink,
        })
    }

    pub fn tap(self: &Arc<Self>, x: f32, width: f32, context: GestureContext) {
        let action = self.recognizer.lock().tap(x, width, context);
        trace!(?action, "Tap");

        match action {
            TapAction::AwaitSecondTap { generation } => {
                self.reset_timer.cancel();
                let weak = Arc::downgrade(self);
                self.tap_timer.arm(self.tap_delay, move || {
                    Self::with(weak, |this| {
                        let command = this.recognizer.lock().tap_delay_elapsed(generation);
                        if let Some(command) = command {
                            (this.sink)(command);
                        }
                    })
                });
            }
            TapAction::Seek {
                command,
                generation,
            } => {
                self.tap_timer.cancel();
                let weak = Arc::downgrade(self);
                self.reset_timer.arm(self.reset_after, move || {
                    Self::with(weak, |this| {
                        this.recognizer.lock().reset_elapsed(generation);
                    })
                });
                (self.sink)(command);
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.recognizer.lock().is_idle()
    }

    /// Abandon any tap sequence in progress.
    pub fn reset(&self) {
        self.tap_timer.cancel();
        self.reset_timer.cancel();
        self.recognizer.lock().reset();
    }

    fn with(weak: Weak<Self>, f: impl FnOnce(&Arc<Self>)) {
        if let Some(this) = weak.upgrade() {
            f(&this);
        }
    }
}
