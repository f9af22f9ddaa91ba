use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::channel::{FLASH_SIGNAL, KEY_EVENT_CHANNEL, KEYBOARD_REPORT_CHANNEL};
use crate::config::{OnTheFlyConfig, Rgb};
use crate::controller::{MacroController, ProcessResult};
use crate::event::{KeyEvent, KeyPos, MacroEvent};
use crate::hid::HidHost;
use crate::host::EventSink;
use crate::{KEY_EVENT_CHANNEL_SIZE, MACRO_ARENA_SIZE, REPORT_CHANNEL_SIZE, RawMutex};

/// Task which turns key events into keyboard reports, with on-the-fly macros in between.
pub struct OnTheFlyRunner<
    'a,
    const SIZE: usize = MACRO_ARENA_SIZE,
    const EVENTS: usize = KEY_EVENT_CHANNEL_SIZE,
    const REPORTS: usize = REPORT_CHANNEL_SIZE,
> {
    controller: MacroController<SIZE>,
    host: HidHost<'a, REPORTS>,
    key_events: &'a Channel<RawMutex, KeyEvent, EVENTS>,
}

impl OnTheFlyRunner<'static> {
    /// Runner reading from [`KEY_EVENT_CHANNEL`], writing to [`KEYBOARD_REPORT_CHANNEL`] and [`FLASH_SIGNAL`]
    pub fn with_default_channels(config: OnTheFlyConfig) -> Self {
        Self::new(
            config,
            &KEY_EVENT_CHANNEL,
            HidHost::new(&KEYBOARD_REPORT_CHANNEL, &FLASH_SIGNAL),
        )
    }
}

impl<'a, const SIZE: usize, const EVENTS: usize, const REPORTS: usize> OnTheFlyRunner<'a, SIZE, EVENTS, REPORTS> {
    pub fn new(
        config: OnTheFlyConfig,
        key_events: &'a Channel<RawMutex, KeyEvent, EVENTS>,
        host: HidHost<'a, REPORTS>,
    ) -> Self {
        Self {
            controller: MacroController::new(config),
            host,
            key_events,
        }
    }

    pub fn controller(&self) -> &MacroController<SIZE> {
        &self.controller
    }

    pub fn host(&self) -> &HidHost<'a, REPORTS> {
        &self.host
    }

    /// Keys to light up in this cycle, see [`MacroController::indicator`]
    pub fn indicator(&self) -> Vec<(KeyPos, Rgb), 2> {
        self.controller.indicator()
    }

    /// Process a single key event, and play the macro it picked to the end.
    ///
    /// Reports are sent one at a time, waiting for the report channel to have room.
    pub async fn process(&mut self, event: KeyEvent) {
        if self.host.is_masked(event.pos) {
            if !event.pressed {
                self.host.unmask(event.pos);
            }
            trace!("Masked key event: {:?}", event);
            return;
        }

        if let ProcessResult::Continue(e) = self.controller.process(MacroEvent::from(event), &mut self.host) {
            self.host.submit(e.key, e.transition);
            self.host.flush_report();
        }
        self.host.send_reports().await;

        while self.controller.is_playing() {
            self.controller.play_step(&mut self.host);
            self.host.send_reports().await;
        }
    }

    /// Process key events forever
    pub async fn run(&mut self) -> ! {
        loop {
            let event = self.key_events.receive().await;
            self.process(event).await;
        }
    }
}
