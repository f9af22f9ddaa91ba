//! The on-the-fly macro state machine.

use heapless::Vec;

use crate::arena::{Entry, MacroArena, SlotId, SlotKey};
use crate::config::{OnTheFlyConfig, Rgb};
use crate::event::{KeyPos, KeyTransition, MacroEvent};
use crate::hid_state::HidModifiers;
use crate::host::{MacroHost, ModifierQuery};
use crate::keycode::KeyCode;
use crate::player::{PlaybackTarget, Player};
use crate::recorder::Recorder;
use crate::{MACRO_ARENA_SIZE, PLAY_STACK_SIZE};

/// What to do with an event after the macro controller saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessResult {
    /// The event is not for the macro controller, process it as a normal key event
    Continue(MacroEvent),
    /// The event was consumed
    Stop,
}

/// Slot picking state. Recording and playing are tracked separately, a recording continues in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroState {
    Idle,
    /// The record trigger was pressed, the next pressed key picks the slot to record into
    PickingSlotForRecord,
    /// The play trigger was pressed, the next pressed key picks the slot to play
    PickingSlotForPlay,
}

pub struct MacroController<const SIZE: usize = MACRO_ARENA_SIZE> {
    config: OnTheFlyConfig,
    arena: MacroArena<SIZE>,
    recorder: Recorder,
    state: MacroState,
    /// Nesting level of the macros being played, `0` when not playing
    play_depth: usize,
    /// Macros being played, the innermost last. The one being stepped is taken out
    players: Vec<Player, PLAY_STACK_SIZE>,
    /// Always a valid slot
    last_played: SlotId,
    record_trigger_pos: Option<KeyPos>,
    play_trigger_pos: Option<KeyPos>,
    /// Physical key of the slot being recorded
    recording_slot_pos: Option<KeyPos>,
}

impl<const SIZE: usize> MacroController<SIZE> {
    pub fn new(config: OnTheFlyConfig) -> Self {
        Self {
            config,
            arena: MacroArena::new(),
            recorder: Recorder::new(),
            state: MacroState::Idle,
            play_depth: 0,
            players: Vec::new(),
            last_played: SlotId::FIRST,
            record_trigger_pos: None,
            play_trigger_pos: None,
            recording_slot_pos: None,
        }
    }

    pub fn state(&self) -> MacroState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.play_depth > 0
    }

    pub fn last_played(&self) -> SlotId {
        self.last_played
    }

    pub fn arena(&self) -> &MacroArena<SIZE> {
        &self.arena
    }

    pub fn config(&self) -> &OnTheFlyConfig {
        &self.config
    }

    /// Process one key event.
    ///
    /// A picked macro only starts playing here, call [`Self::play_step`] until [`Self::is_playing`]
    /// turns `false` before processing the next event.
    pub fn process<H: MacroHost>(&mut self, event: MacroEvent, host: &mut H) -> ProcessResult {
        let injected = event.injected || self.is_playing();
        let pressed = event.is_pressed();

        if self.state == MacroState::PickingSlotForRecord && pressed {
            if self.passes_through_picking(event.key) {
                return ProcessResult::Continue(event);
            }
            self.state = MacroState::Idle;
            if event.key == KeyCode::MacroPlay {
                warn!("Cannot record into the play key");
                self.flash_all(host, self.config.fail_color);
            } else {
                self.start_recording(event, host);
                if let Some(pos) = event.pos {
                    host.mask_until_release(pos);
                }
            }
            return ProcessResult::Stop;
        }

        if self.state == MacroState::Idle && event.key == KeyCode::MacroRecord {
            if pressed && !injected {
                self.record_trigger_pos = event.pos;
                if let Some(slot) = self.recorder.stop() {
                    debug!("Recording into slot {} finished", slot.offset());
                    self.recording_slot_pos = None;
                    self.flash_one(host, self.record_trigger_pos, self.config.success_color);
                } else {
                    debug!("Pick a slot to record");
                    self.state = MacroState::PickingSlotForRecord;
                }
            }
            return ProcessResult::Stop;
        }

        if self.recorder.is_recording() && !injected {
            let slot = self.recorder.slot();
            if let Err(e) = self.recorder.record(&mut self.arena, event.key, event.transition) {
                warn!("Recording aborted: {:?}", e);
                if let Some(slot) = slot {
                    self.forget_slot(slot);
                }
                self.recording_slot_pos = None;
                self.flash_all(host, self.config.fail_color);
            }
        }

        if self.state == MacroState::PickingSlotForPlay && pressed {
            if self.passes_through_picking(event.key) {
                return ProcessResult::Continue(event);
            }
            // Back to idle first, so that events of the played macro are processed as usual
            self.state = MacroState::Idle;
            let trigger_pos = self.play_trigger_pos;
            let played = self.play_picked(event.key, host);
            let color = if played {
                self.config.play_color
            } else {
                self.config.empty_color
            };
            self.flash_one(host, trigger_pos, color);
            if let Some(pos) = event.pos {
                host.mask_until_release(pos);
            }
            return ProcessResult::Stop;
        }

        if self.state == MacroState::Idle && event.key == KeyCode::MacroPlay {
            if pressed {
                debug!("Pick a slot to play");
                self.play_trigger_pos = event.pos;
                self.state = MacroState::PickingSlotForPlay;
            }
            return ProcessResult::Stop;
        }

        if event.key.is_macro_trigger() {
            ProcessResult::Stop
        } else {
            ProcessResult::Continue(event)
        }
    }

    /// Play the next step of the innermost playing macro, sending at most one report.
    ///
    /// Every synthesized event is processed by the controller again before it's handed to the host,
    /// so a macro can play other macros.
    pub fn play_step<H: MacroHost>(&mut self, host: &mut H) {
        let Some(mut player) = self.players.pop() else {
            return;
        };
        let depth = self.players.len();
        let mut target = Playback {
            controller: &mut *self,
            host,
        };
        if player.step(&mut target) {
            // Can't fail, a macro started by this step is counted in `play_depth` already
            let _ = self.players.insert(depth, player);
        } else {
            debug!("Macro in slot {} finished", player.slot().offset());
            self.play_depth -= 1;
        }
    }

    /// Keys to light up in this cycle, overriding the current LED effect
    pub fn indicator(&self) -> Vec<(KeyPos, Rgb), 2> {
        let mut leds = Vec::new();
        if !self.config.color_effects {
            return leds;
        }
        let record = self.record_trigger_pos.map(|pos| (pos, self.config.record_color));
        match self.state {
            MacroState::Idle if self.recorder.is_recording() => {
                let slot = self.recording_slot_pos.map(|pos| (pos, self.config.slot_color));
                leds.extend(record.into_iter().chain(slot));
            }
            MacroState::PickingSlotForRecord => leds.extend(record),
            _ => (),
        }
        leds
    }

    fn passes_through_picking(&self, key: KeyCode) -> bool {
        key.is_modifier() && !self.config.modifiers_as_slots
    }

    /// The slot key for a picked key, with the held modifiers folded in if enabled
    fn slot_key<H: ModifierQuery>(&self, key: KeyCode, host: &H) -> SlotKey {
        if !self.config.fold_modifiers {
            return SlotKey::new(key);
        }
        let modifiers: HidModifiers = KeyCode::MODIFIERS
            .into_iter()
            .filter(|&m| host.was_modifier_active(m))
            .collect();
        SlotKey::with_modifiers(key, modifiers)
    }

    fn start_recording<H: MacroHost>(&mut self, event: MacroEvent, host: &mut H) {
        let key = self.slot_key(event.key, host);
        if let Some(old) = self.arena.find_slot(key) {
            self.forget_slot(old);
        }
        match self.recorder.begin(&mut self.arena, key) {
            Ok(_) => {
                self.recording_slot_pos = event.pos;
                self.flash_one(host, self.record_trigger_pos, self.config.record_color);
                if let Some(pos) = event.pos {
                    self.flash_second(host, pos, self.config.slot_color);
                }
            }
            Err(e) => {
                warn!("Failed to start recording: {:?}", e);
                self.flash_all(host, self.config.fail_color);
            }
        }
    }

    /// Play the slot picked by `key`. The play trigger replays the last played slot
    fn play_picked<H: ModifierQuery>(&mut self, key: KeyCode, host: &H) -> bool {
        if key == KeyCode::MacroPlay {
            return self.play_slot(self.last_played);
        }
        let Some(slot) = self.arena.find_slot(self.slot_key(key, host)) else {
            debug!("No macro recorded for {:?}", key);
            return false;
        };
        let played = self.play_slot(slot);
        if played {
            self.last_played = slot;
        }
        played
    }

    /// Start playing `slot`. Returns `false` if there's nothing to play
    fn play_slot(&mut self, slot: SlotId) -> bool {
        let max_depth = PLAY_STACK_SIZE.min(self.config.max_play_depth as usize);
        if self.play_depth >= max_depth {
            warn!("Macro nesting limit {} reached", max_depth);
            return false;
        }
        if self.players.push(Player::new(slot)).is_err() {
            error!("Player stack is full");
            return false;
        }
        self.play_depth += 1;
        self.arena.entry(slot, 0).is_some()
    }

    /// Drop references to a slot which is about to be freed
    fn forget_slot(&mut self, slot: SlotId) {
        if self.last_played == slot {
            self.last_played = SlotId::FIRST;
        }
    }

    fn flash_one<H: MacroHost>(&self, host: &mut H, pos: Option<KeyPos>, color: Rgb) {
        if let (true, Some(pos)) = (self.config.color_effects, pos) {
            host.flash_one(pos, color);
        }
    }

    fn flash_second<H: MacroHost>(&self, host: &mut H, pos: KeyPos, color: Rgb) {
        if self.config.color_effects {
            host.flash_second(pos, color);
        }
    }

    fn flash_all<H: MacroHost>(&self, host: &mut H, color: Rgb) {
        if self.config.color_effects {
            host.flash_all(color);
        }
    }
}

/// Routes the keystrokes of a playing macro back through the controller.
struct Playback<'a, const SIZE: usize, H: MacroHost> {
    controller: &'a mut MacroController<SIZE>,
    host: &'a mut H,
}

impl<const SIZE: usize, H: MacroHost> Playback<'_, SIZE, H> {
    fn inject(&mut self, key: KeyCode, transition: KeyTransition) {
        let event = MacroEvent::injected(key, transition);
        if let ProcessResult::Continue(e) = self.controller.process(event, self.host) {
            self.host.submit(e.key, e.transition);
        }
    }
}

impl<const SIZE: usize, H: MacroHost> PlaybackTarget for Playback<'_, SIZE, H> {
    fn entry(&self, slot: SlotId, index: usize) -> Option<Entry> {
        self.controller.arena.entry(slot, index)
    }

    fn press(&mut self, key: KeyCode) {
        self.inject(key, KeyTransition::Pressed);
    }

    fn release(&mut self, key: KeyCode) {
        self.inject(key, KeyTransition::Released);
    }

    fn restore_held(&mut self, held: &[KeyCode]) {
        self.host.release_all();
        for &key in held.iter().filter(|k| !k.is_macro_trigger()) {
            self.host.submit(key, KeyTransition::Steady);
        }
    }

    fn release_all(&mut self) {
        self.host.release_all();
    }

    fn flush_report(&mut self) {
        self.host.flush_report();
    }
}

#[cfg(test)]
mod test {
    use std::vec::Vec;

    use super::*;
    use crate::arena::EntryKind;
    use crate::host::{EventSink, Feedback, KeyMasker};

    #[derive(Default)]
    struct NullHost {
        submitted: Vec<(KeyCode, KeyTransition)>,
        masked: Vec<KeyPos>,
        flashes: usize,
    }

    impl Feedback for NullHost {
        fn flash_one(&mut self, _pos: KeyPos, _color: Rgb) {
            self.flashes += 1;
        }
        fn flash_all(&mut self, _color: Rgb) {
            self.flashes += 1;
        }
        fn flash_second(&mut self, _pos: KeyPos, _color: Rgb) {
            self.flashes += 1;
        }
    }

    impl KeyMasker for NullHost {
        fn mask_until_release(&mut self, pos: KeyPos) {
            self.masked.push(pos);
        }
    }

    impl EventSink for NullHost {
        fn submit(&mut self, key: KeyCode, transition: KeyTransition) {
            self.submitted.push((key, transition));
        }
        fn release_all(&mut self) {}
        fn flush_report(&mut self) {}
    }

    impl ModifierQuery for NullHost {
        fn was_modifier_active(&self, _key: KeyCode) -> bool {
            false
        }
    }

    fn press(key: KeyCode, col: u8) -> MacroEvent {
        MacroEvent::live(key, KeyPos::new(0, col), KeyTransition::Pressed)
    }

    fn release(key: KeyCode, col: u8) -> MacroEvent {
        MacroEvent::live(key, KeyPos::new(0, col), KeyTransition::Released)
    }

    #[test]
    fn test_trigger_keys_are_consumed() {
        let mut controller: MacroController<32> = MacroController::new(OnTheFlyConfig::default());
        let mut host = NullHost::default();

        assert_eq!(controller.process(press(KeyCode::MacroPlay, 0), &mut host), ProcessResult::Stop);
        assert_eq!(controller.state(), MacroState::PickingSlotForPlay);
        assert_eq!(controller.process(release(KeyCode::MacroPlay, 0), &mut host), ProcessResult::Stop);
        assert_eq!(controller.state(), MacroState::PickingSlotForPlay);

        // A released key while picking is passed through
        let up = release(KeyCode::B, 2);
        assert_eq!(controller.process(up, &mut host), ProcessResult::Continue(up));

        assert_eq!(controller.process(press(KeyCode::A, 1), &mut host), ProcessResult::Stop);
        assert_eq!(controller.state(), MacroState::Idle);
        assert_eq!(host.masked, [KeyPos::new(0, 1)]);
        assert!(host.submitted.is_empty());
    }

    #[test]
    fn test_record_state_transitions() {
        let mut controller: MacroController<32> = MacroController::new(OnTheFlyConfig::default());
        let mut host = NullHost::default();

        controller.process(press(KeyCode::MacroRecord, 0), &mut host);
        assert_eq!(controller.state(), MacroState::PickingSlotForRecord);
        assert!(!controller.is_recording());
        assert_eq!(controller.indicator().len(), 1);

        controller.process(press(KeyCode::A, 1), &mut host);
        assert_eq!(controller.state(), MacroState::Idle);
        assert!(controller.is_recording());
        assert_eq!(
            controller.indicator().as_slice(),
            &[
                (KeyPos::new(0, 0), Rgb::new(0, 255, 0)),
                (KeyPos::new(0, 1), Rgb::new(255, 255, 255))
            ]
        );

        // Typed keys are recorded and still sent
        let x = press(KeyCode::X, 2);
        assert_eq!(controller.process(x, &mut host), ProcessResult::Continue(x));

        controller.process(press(KeyCode::MacroRecord, 0), &mut host);
        assert!(!controller.is_recording());
        assert!(controller.indicator().is_empty());

        let slot = controller.arena().find_slot(SlotKey::new(KeyCode::A)).unwrap();
        assert_eq!(controller.arena().entries(slot), &[Entry::new(KeyCode::X, EntryKind::Down)]);
    }

    #[test]
    fn test_played_play_trigger_picks_next_slot() {
        let mut controller: MacroController<32> = MacroController::new(OnTheFlyConfig::default());
        let mut host = NullHost::default();
        let slot = controller.arena.allocate(SlotKey::new(KeyCode::B)).unwrap();
        controller
            .arena
            .push_entry(slot, Entry::new(KeyCode::MacroPlay, EntryKind::Tap))
            .unwrap();

        controller.process(press(KeyCode::MacroPlay, 0), &mut host);
        controller.process(press(KeyCode::B, 1), &mut host);
        assert!(controller.is_playing());
        while controller.is_playing() {
            controller.play_step(&mut host);
        }
        // The played trigger went through the state machine, the next key picks a slot
        assert_eq!(controller.state(), MacroState::PickingSlotForPlay);
        assert_eq!(controller.last_played(), slot);
        assert!(host.submitted.is_empty());
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_injected_record_trigger_is_ignored() {
        let mut controller: MacroController<32> = MacroController::new(OnTheFlyConfig::default());
        let mut host = NullHost::default();

        let event = MacroEvent::injected(KeyCode::MacroRecord, KeyTransition::Pressed);
        assert_eq!(controller.process(event, &mut host), ProcessResult::Stop);
        assert_eq!(controller.state(), MacroState::Idle);
    }

    #[test]
    fn test_record_into_play_key_fails() {
        let mut controller: MacroController<32> = MacroController::new(OnTheFlyConfig::default());
        let mut host = NullHost::default();

        controller.process(press(KeyCode::MacroRecord, 0), &mut host);
        controller.process(press(KeyCode::MacroPlay, 1), &mut host);
        assert_eq!(controller.state(), MacroState::Idle);
        assert!(!controller.is_recording());
        assert_eq!(host.flashes, 1);
        assert!(host.masked.is_empty());
    }

    #[test]
    fn test_no_feedback_without_color_effects() {
        let config = OnTheFlyConfig {
            color_effects: false,
            ..Default::default()
        };
        let mut controller: MacroController<32> = MacroController::new(config);
        let mut host = NullHost::default();

        controller.process(press(KeyCode::MacroRecord, 0), &mut host);
        assert!(controller.indicator().is_empty());
        controller.process(press(KeyCode::A, 1), &mut host);
        controller.process(press(KeyCode::MacroRecord, 0), &mut host);
        controller.process(press(KeyCode::MacroPlay, 0), &mut host);
        controller.process(press(KeyCode::B, 1), &mut host);
        assert_eq!(host.flashes, 0);
    }
}
