use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{InstanceEvent, InstanceEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, instance_id: Uuid, kind: InstanceEventKind) -> InstanceEvent;
    /// Lista eventos de una instancia (orden ascendente por seq).
    fn list(&self, instance_id: Uuid) -> Vec<InstanceEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<InstanceEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, instance_id: Uuid, kind: InstanceEventKind) -> InstanceEvent {
        let vec = self.inner.entry(instance_id).or_default();
        let seq = vec.len() as u64;
        let ev = InstanceEvent { seq, instance_id, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, instance_id: Uuid) -> Vec<InstanceEvent> {
        self.inner.get(&instance_id).cloned().unwrap_or_default()
    }
}
