//! Narrow workspace bus: a synchronous event outbox plus settings access.
//!
//! Services announce state changes here after their own state is
//! consistent; the owning workspace drains the outbox, reacts to the events
//! it cares about (edited markers, manifest persistence), and hands the
//! rest to whatever UI is attached.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::files::FileId;
use crate::settings::SettingsService;
use crate::views::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarColor {
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    WindowCreated(WindowId),
    FileReadied(FileId),
    FileMetaChanged(FileId),
    FileModelModificationChanged(FileId, bool),
    ColorBar(BarColor),
    SubtitleChanged(String),
    FlaggedChanged(bool),
    SettingChanged(String),
}

pub struct Bus {
    settings: RefCell<SettingsService>,
    outbox: RefCell<Vec<BusEvent>>,
}

impl Bus {
    pub fn new(settings: SettingsService) -> Rc<Self> {
        Rc::new(Self {
            settings: RefCell::new(settings),
            outbox: RefCell::new(Vec::new()),
        })
    }

    pub fn emit(&self, event: BusEvent) {
        self.outbox.borrow_mut().push(event);
    }

    /// Drain pending events in emission order.
    pub fn take_events(&self) -> Vec<BusEvent> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    pub fn settings(&self) -> Ref<'_, SettingsService> {
        self.settings.borrow()
    }

    pub fn settings_mut(&self) -> RefMut<'_, SettingsService> {
        self.settings.borrow_mut()
    }

    pub fn setting_or(&self, section_key: (&str, &str), default: &str) -> String {
        self.settings.borrow().get_or(section_key, default)
    }

    pub fn set_setting(&self, section_key: (&str, &str), value: &str) {
        self.settings.borrow_mut().set(section_key, value);
        self.emit(BusEvent::SettingChanged(format!(
            "{}/{}",
            section_key.0, section_key.1
        )));
    }
}
