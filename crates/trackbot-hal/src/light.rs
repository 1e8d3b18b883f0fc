//! Generic `LightBar` trait for the RGB LED strip, plus the colour cycle the
//! remote's `Light` key steps through.

use trackbot_types::TrackError;

/// Preset colours supported by the LED board, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
    White,
}

impl LightColor {
    const CYCLE: [LightColor; 7] = [
        LightColor::Red,
        LightColor::Green,
        LightColor::Blue,
        LightColor::Yellow,
        LightColor::Purple,
        LightColor::Cyan,
        LightColor::White,
    ];

    /// Colour code understood by the LED board.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// An addressable LED bar driven as a single unit.
pub trait LightBar: Send {
    /// Show `color`, or switch the bar off with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::HardwareFault`] if the command cannot be applied.
    fn set_color(&mut self, color: Option<LightColor>) -> Result<(), TrackError>;
}

/// Off → red → green → … → white → off.
#[derive(Debug, Clone, Default)]
pub struct LightCycle {
    position: Option<usize>,
}

impl LightCycle {
    /// Step to the next colour and return what the bar should now show.
    pub fn advance(&mut self) -> Option<LightColor> {
        self.position = match self.position {
            None => Some(0),
            Some(i) if i + 1 < LightColor::CYCLE.len() => Some(i + 1),
            Some(_) => None,
        };
        self.current()
    }

    pub fn current(&self) -> Option<LightColor> {
        self.position.map(|i| LightColor::CYCLE[i])
    }

    pub fn reset(&mut self) {
        self.position = None;
    }
}
