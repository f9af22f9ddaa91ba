/// RGB color used for key flashes and indicators
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Configurations for on-the-fly macros
#[derive(Clone, Copy, Debug)]
pub struct OnTheFlyConfig {
    /// Flash LEDs to indicate recording and playback results
    pub color_effects: bool,
    /// Record trigger while a recording is in progress
    pub record_color: Rgb,
    /// The slot key of the recording in progress
    pub slot_color: Rgb,
    /// Recording finished
    pub success_color: Rgb,
    /// Recording could not be started or was aborted
    pub fail_color: Rgb,
    /// A macro was played
    pub play_color: Rgb,
    /// Nothing to play
    pub empty_color: Rgb,
    /// If false, modifiers never pick a slot. They pass through instead, so they modify the slot key picked next
    pub modifiers_as_slots: bool,
    /// Make the currently held modifiers part of the picked slot, so that `Shift+A` and `A` are different slots
    pub fold_modifiers: bool,
    /// Max nesting level of macros which play other macros, at most [`crate::PLAY_STACK_SIZE`]
    pub max_play_depth: u8,
}

impl Default for OnTheFlyConfig {
    fn default() -> Self {
        Self {
            color_effects: true,
            record_color: Rgb::new(0, 255, 0),
            slot_color: Rgb::new(255, 255, 255),
            success_color: Rgb::new(0, 200, 0),
            fail_color: Rgb::new(200, 0, 0),
            play_color: Rgb::new(0, 255, 0),
            empty_color: Rgb::new(255, 0, 0),
            modifiers_as_slots: false,
            fold_modifiers: true,
            max_play_depth: 8,
        }
    }
}
