use tracing::trace;

pub const LEN_MIN: f32 = 0.45;
pub const LEN_MAX: f32 = 1.0;

/// Animated parameters owned by the compositor.
///
/// `len` writes are clamped to `[LEN_MIN, LEN_MAX]`, amplitude to `[0, 1]`,
/// and time never moves backwards. Non-finite writes are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    amplitude: f32,
    len: f32,
    time: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            len: LEN_MAX,
            time: 0.0,
        }
    }
}

#[allow(clippy::len_without_is_empty)]
impl AnimationState {
    pub fn new(amplitude: f32, len: f32) -> Self {
        let mut state = Self::default();
        state.set_amplitude(amplitude);
        state.set_len(len);
        state
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn len(&self) -> f32 {
        self.len
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        if amplitude.is_finite() {
            self.amplitude = amplitude.clamp(0.0, 1.0);
        }
    }

    pub fn set_len(&mut self, len: f32) {
        if len.is_finite() {
            self.len = len.clamp(LEN_MIN, LEN_MAX);
        }
    }

    pub fn nudge_len(&mut self, delta: f32) {
        self.set_len(self.len + delta);
    }

    /// Moves time forward. Returns false when the sample is older than the
    /// current time and was ignored.
    pub fn advance(&mut self, time: f32) -> bool {
        if !time.is_finite() || time < self.time {
            trace!(current = self.time, sample = time, "ignoring stale time sample");
            return false;
        }
        self.time = time;
        true
    }
}
