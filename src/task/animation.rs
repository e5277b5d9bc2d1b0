//! # Animation
//! This module holds the ringing animation of a key.
//!
//! While the alarm rings the clock face wobbles on a 25 frame cycle and its color flips between the
//! base and the flash tone every 5 frames. A calm key does not animate at all.
use core::f32::consts::PI;
use embedded_graphics::pixelcolor::Rgb888;

/// Frames in one wobble cycle
pub const FRAME_COUNT: u8 = 25;

/// The flash color toggles every this many frames
const FLASH_PERIOD: u8 = 5;

/// Color of the clock face
pub const CLOCK_COLOR_BASE: Rgb888 = Rgb888::new(0x4c, 0x4c, 0x4c);

/// Color of the clock face while flashing
pub const CLOCK_COLOR_FLASH: Rgb888 = Rgb888::new(0xde, 0xe2, 0x00);

/// Largest rotation of the wobble, in degrees
const MAX_ROTATION_DEGREES: f32 = 20.0;

/// Largest change of scale of the wobble
const MAX_SCALE_CHANGE: f32 = 0.1;

/// The animation cursor of one key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderState {
    /// The alarm sound is playing
    ringing: bool,
    /// Position in the wobble cycle, `0..FRAME_COUNT`
    frame: u8,
    /// The clock face shows the flash color
    flash_on: bool,
}

impl RenderState {
    /// A calm key
    pub const fn new() -> Self {
        Self {
            ringing: false,
            frame: 0,
            flash_on: false,
        }
    }

    /// A ringing key at a given point of the animation
    pub const fn ringing_at(frame: u8, flash_on: bool) -> Self {
        Self {
            ringing: true,
            frame: frame % FRAME_COUNT,
            flash_on,
        }
    }

    /// Check if the alarm is ringing
    pub const fn is_ringing(&self) -> bool {
        self.ringing
    }

    /// Get the current frame
    pub const fn frame(&self) -> u8 {
        self.frame
    }

    /// Check if the flash color is showing
    pub const fn flash_on(&self) -> bool {
        self.flash_on
    }

    /// Start the animation
    pub const fn start_ringing(&mut self) {
        self.ringing = true;
    }

    /// Stop the animation and go back to the base look
    pub const fn stop_ringing(&mut self) {
        *self = Self::new();
    }

    /// Advance one frame. Returns true if the key needs a new image.
    pub const fn tick(&mut self) -> bool {
        if !self.ringing {
            self.frame = 0;
            self.flash_on = false;
            return false;
        }
        if self.frame % FLASH_PERIOD == 0 {
            self.flash_on = !self.flash_on;
        }
        self.frame = (self.frame + 1) % FRAME_COUNT;
        true
    }

    /// The color of the clock face
    pub const fn clock_color(&self) -> Rgb888 {
        if self.flash_on {
            CLOCK_COLOR_FLASH
        } else {
            CLOCK_COLOR_BASE
        }
    }

    /// Where in the wobble we are, -1 to 1. Always 0 while calm.
    pub fn wobble(&self) -> f32 {
        if !self.ringing {
            return 0.0;
        }
        (2.0 * PI / f32::from(FRAME_COUNT + 1) * f32::from(self.frame)).sin()
    }

    /// Scale of the clock face for this frame
    pub fn scale(&self) -> f32 {
        MAX_SCALE_CHANGE.mul_add(self.wobble(), 1.0)
    }

    /// Rotation of the clock face for this frame, in degrees
    pub fn rotation_degrees(&self) -> f32 {
        MAX_ROTATION_DEGREES * self.wobble()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_key_does_not_animate() {
        let mut state = RenderState::new();
        for _ in 0..10 {
            assert!(!state.tick());
        }
        assert_eq!(state, RenderState::new());
        assert_eq!(state.clock_color(), CLOCK_COLOR_BASE);
        assert!(state.wobble().abs() < f32::EPSILON);
        assert!((state.scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn flash_toggles_every_five_frames() {
        let mut state = RenderState::new();
        state.start_ringing();
        let mut flashes = Vec::new();
        for _ in 0..FRAME_COUNT {
            assert!(state.tick());
            flashes.push(state.flash_on());
        }
        // the cycle returns to frame 0
        assert_eq!(state.frame(), 0);
        assert_eq!(&flashes[..6], &[true, true, true, true, true, false]);
        assert_eq!(flashes.iter().filter(|on| **on).count(), 15);
    }

    #[test]
    fn stopping_resets_everything() {
        let mut state = RenderState::ringing_at(7, true);
        state.stop_ringing();
        assert_eq!(state, RenderState::new());
        assert!(!state.tick());
    }

    #[test]
    fn wobble_follows_the_sine() {
        let state = RenderState::ringing_at(6, false);
        let expected = (2.0 * PI / 26.0 * 6.0).sin();
        assert!((state.wobble() - expected).abs() < 1e-6);
        assert!(state.rotation_degrees() > 19.0);
        assert!(state.scale() > 1.09);
    }
}
