//! Registry of live voice sessions, one per group
//!
//! Only the delivery task currently holding a group's scheduler slot mutates
//! that group's entry, apart from an explicit leave which may remove it at
//! any time. Updates made on behalf of a connection are therefore applied
//! only while the entry still holds that same connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::transport::{GroupId, VoiceConnection};

/// Observable state of a group's voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// No connection
    Disconnected,
    /// Joining and waiting for the connection to become ready
    Connecting,
    /// Connected, nothing playing
    Idle,
    /// Streaming synthesized audio
    Playing,
    /// Flushing trailing silence
    Draining,
    /// Tearing the connection down
    Leaving,
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Draining => "draining",
            Self::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

struct Slot {
    connection: Option<Arc<dyn VoiceConnection>>,
    state: DeliveryState,
}

impl Slot {
    fn holds(&self, connection: &Arc<dyn VoiceConnection>) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| Arc::ptr_eq(c, connection))
    }
}

/// Per-group session registry
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<GroupId, Slot>>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        let states: HashMap<_, _> = slots.iter().map(|(g, s)| (*g, s.state)).collect();
        f.debug_struct("SessionRegistry")
            .field("states", &states)
            .finish()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, group: GroupId) -> DeliveryState {
        self.slots
            .lock()
            .get(&group)
            .map_or(DeliveryState::Disconnected, |slot| slot.state)
    }

    /// Live connection for `group`, if connected
    #[must_use]
    pub fn connection(&self, group: GroupId) -> Option<Arc<dyn VoiceConnection>> {
        self.slots
            .lock()
            .get(&group)
            .and_then(|slot| slot.connection.clone())
    }

    /// Number of groups with an entry, connected or connecting
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    pub(crate) fn begin_connect(&self, group: GroupId) {
        self.slots.lock().insert(
            group,
            Slot {
                connection: None,
                state: DeliveryState::Connecting,
            },
        );
        log_transition(group, DeliveryState::Connecting);
    }

    /// Drop a connect attempt that never produced a usable connection
    pub(crate) fn abandon_connect(&self, group: GroupId) {
        let mut slots = self.slots.lock();
        if slots.get(&group).is_some_and(|slot| slot.connection.is_none()) {
            slots.remove(&group);
            log_transition(group, DeliveryState::Disconnected);
        }
    }

    pub(crate) fn bind(&self, group: GroupId, connection: Arc<dyn VoiceConnection>) {
        self.slots.lock().insert(
            group,
            Slot {
                connection: Some(connection),
                state: DeliveryState::Idle,
            },
        );
        log_transition(group, DeliveryState::Idle);
    }

    /// Move to `state` if the entry still holds `connection`
    pub(crate) fn transition(
        &self,
        group: GroupId,
        connection: &Arc<dyn VoiceConnection>,
        state: DeliveryState,
    ) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(&group) {
            Some(slot) if slot.holds(connection) => {
                slot.state = state;
                drop(slots);
                log_transition(group, state);
                true
            },
            _ => false,
        }
    }

    /// Remove the entry if it still holds `connection`
    pub(crate) fn release(&self, group: GroupId, connection: &Arc<dyn VoiceConnection>) -> bool {
        let mut slots = self.slots.lock();
        if slots.get(&group).is_some_and(|slot| slot.holds(connection)) {
            slots.remove(&group);
            drop(slots);
            log_transition(group, DeliveryState::Disconnected);
            return true;
        }
        false
    }

    /// Remove and return the group's connection, leaving connect attempts alone
    pub(crate) fn take(&self, group: GroupId) -> Option<Arc<dyn VoiceConnection>> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&group)?;
        if slot.connection.is_none() {
            return None;
        }
        slot.state = DeliveryState::Leaving;
        log_transition(group, DeliveryState::Leaving);
        slots.remove(&group).and_then(|slot| slot.connection)
    }
}

fn log_transition(group: GroupId, state: DeliveryState) {
    info!(%group, %state, "Voice session state changed");
}
