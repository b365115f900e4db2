//! Controller sampling.
//!
//! The host hands over the raw held-button mask once per tick. Edge detection
//! and auto-repeat live here, in the consumer, not in the input source.

bitflags::bitflags! {
    /// Buttons held during one tick, in controller shift-register order.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        /// Confirm.
        const A      = 0b0000_0001;
        /// Cancel.
        const B      = 0b0000_0010;
        const SELECT = 0b0000_0100;
        const START  = 0b0000_1000;
        const UP     = 0b0001_0000;
        const DOWN   = 0b0010_0000;
        const LEFT   = 0b0100_0000;
        const RIGHT  = 0b1000_0000;

        const DIRECTIONS = Self::UP.bits() | Self::DOWN.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
        const ACKNOWLEDGE = Self::A.bits() | Self::B.bits();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepeatConfig {
    /// Ticks a direction must be held before it starts repeating.
    pub delay: u8,
    /// Ticks between repeats once repeating.
    pub period: u8,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self { delay: 16, period: 8 }
    }
}

/// Edge detector with auto-repeat for the directional pad.
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    last: Buttons,
    held_ticks: u16,
    repeat: RepeatConfig,
}

impl InputLatch {
    pub fn new(repeat: RepeatConfig) -> Self {
        Self { last: Buttons::empty(), held_ticks: 0, repeat }
    }

    /// Latch that treats everything already held as old, so a press carried
    /// over from a previous window does not fire again.
    pub fn primed(repeat: RepeatConfig, held: Buttons) -> Self {
        Self { last: held, held_ticks: 0, repeat }
    }

    /// Sample this tick's held mask and return the buttons that register.
    pub fn update(&mut self, held: Buttons) -> Buttons {
        let pressed = held & !self.last;

        let directions = held & Buttons::DIRECTIONS;
        let mut repeated = Buttons::empty();
        if !directions.is_empty() && directions == self.last & Buttons::DIRECTIONS {
            self.held_ticks = self.held_ticks.saturating_add(1);
            let delay = self.repeat.delay as u16;
            let period = self.repeat.period.max(1) as u16;
            if self.held_ticks >= delay && (self.held_ticks - delay) % period == 0 {
                repeated = directions;
            }
        } else {
            self.held_ticks = 0;
        }

        self.last = held;
        pressed | repeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_registers_once() {
        let mut latch = InputLatch::default();
        assert_eq!(latch.update(Buttons::A), Buttons::A);
        assert_eq!(latch.update(Buttons::A), Buttons::empty());
        assert_eq!(latch.update(Buttons::empty()), Buttons::empty());
        assert_eq!(latch.update(Buttons::A), Buttons::A);
    }

    #[test]
    fn held_direction_repeats_after_delay() {
        let mut latch = InputLatch::new(RepeatConfig { delay: 3, period: 2 });
        let fired: heapless::Vec<bool, 10> = (0..10)
            .map(|_| latch.update(Buttons::DOWN).contains(Buttons::DOWN))
            .collect();
        assert_eq!(
            fired.as_slice(),
            &[true, false, false, true, false, true, false, true, false, true]
        );
    }

    #[test]
    fn confirm_never_repeats() {
        let mut latch = InputLatch::new(RepeatConfig { delay: 1, period: 1 });
        latch.update(Buttons::A);
        for _ in 0..5 {
            assert!(!latch.update(Buttons::A).contains(Buttons::A));
        }
    }

    #[test]
    fn primed_latch_ignores_carried_press() {
        let mut latch = InputLatch::primed(RepeatConfig::default(), Buttons::A);
        assert_eq!(latch.update(Buttons::A), Buttons::empty());
    }
}
