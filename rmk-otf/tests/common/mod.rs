pub mod test_macro;

use rmk_otf::config::{OnTheFlyConfig, Rgb};
use rmk_otf::controller::{MacroController, ProcessResult};
use rmk_otf::event::{KeyEvent, KeyPos, KeyTransition, MacroEvent};
use rmk_otf::host::{EventSink, Feedback, KeyMasker, ModifierQuery};
use rmk_otf::{KeyCode, MACRO_ARENA_SIZE};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub(crate) const KC_LSHIFT: u8 = 1 << 1;

/// Everything the controller asked the host to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    FlashOne(KeyPos, Rgb),
    FlashAll(Rgb),
    FlashSecond(KeyPos, Rgb),
    Mask(KeyPos),
    Submit(KeyCode, KeyTransition),
    ReleaseAll,
    Flush,
}

impl HostCall {
    fn is_output(&self) -> bool {
        matches!(self, HostCall::Submit(..) | HostCall::ReleaseAll | HostCall::Flush)
    }

    fn is_flash(&self) -> bool {
        matches!(
            self,
            HostCall::FlashOne(..) | HostCall::FlashAll(..) | HostCall::FlashSecond(..)
        )
    }
}

#[derive(Debug, Default)]
pub struct MockHost {
    pub calls: Vec<HostCall>,
    /// Modifiers reported as held by `was_modifier_active`
    pub active_modifiers: Vec<KeyCode>,
    masked: Vec<KeyPos>,
}

impl MockHost {
    /// Key events, releases and flushes, in order
    pub fn output(&self) -> Vec<HostCall> {
        self.calls.iter().copied().filter(HostCall::is_output).collect()
    }

    pub fn flashes(&self) -> Vec<HostCall> {
        self.calls.iter().copied().filter(HostCall::is_flash).collect()
    }

    pub fn count(&self, call: HostCall) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Feedback for MockHost {
    fn flash_one(&mut self, pos: KeyPos, color: Rgb) {
        self.calls.push(HostCall::FlashOne(pos, color));
    }

    fn flash_all(&mut self, color: Rgb) {
        self.calls.push(HostCall::FlashAll(color));
    }

    fn flash_second(&mut self, pos: KeyPos, color: Rgb) {
        self.calls.push(HostCall::FlashSecond(pos, color));
    }
}

impl KeyMasker for MockHost {
    fn mask_until_release(&mut self, pos: KeyPos) {
        self.calls.push(HostCall::Mask(pos));
        self.masked.push(pos);
    }
}

impl EventSink for MockHost {
    fn submit(&mut self, key: KeyCode, transition: KeyTransition) {
        self.calls.push(HostCall::Submit(key, transition));
    }

    fn release_all(&mut self) {
        self.calls.push(HostCall::ReleaseAll);
    }

    fn flush_report(&mut self) {
        self.calls.push(HostCall::Flush);
    }
}

impl ModifierQuery for MockHost {
    fn was_modifier_active(&self, key: KeyCode) -> bool {
        self.active_modifiers.contains(&key)
    }
}

/// A macro controller wired to a `MockHost`, processing events the way the runner does
pub struct TestKeyboard<const SIZE: usize = MACRO_ARENA_SIZE> {
    pub controller: MacroController<SIZE>,
    pub host: MockHost,
}

impl<const SIZE: usize> TestKeyboard<SIZE> {
    pub fn new(config: OnTheFlyConfig) -> Self {
        Self {
            controller: MacroController::new(config),
            host: MockHost::default(),
        }
    }

    pub fn process(&mut self, event: KeyEvent) {
        if let Some(i) = self.host.masked.iter().position(|&p| p == event.pos) {
            if !event.pressed {
                self.host.masked.remove(i);
            }
            return;
        }
        if let ProcessResult::Continue(e) = self.controller.process(MacroEvent::from(event), &mut self.host) {
            self.host.submit(e.key, e.transition);
            self.host.flush_report();
        }
        while self.controller.is_playing() {
            self.controller.play_step(&mut self.host);
        }
    }

    pub fn press(&mut self, row: u8, col: u8, key: KeyCode) {
        self.process(KeyEvent::key(row, col, key, true));
    }

    pub fn release(&mut self, row: u8, col: u8, key: KeyCode) {
        self.process(KeyEvent::key(row, col, key, false));
    }

    pub fn tap(&mut self, row: u8, col: u8, key: KeyCode) {
        self.press(row, col, key);
        self.release(row, col, key);
    }
}
