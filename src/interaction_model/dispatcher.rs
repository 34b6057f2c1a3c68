use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::{
    constants::{DEFAULT_EVENT_CAPACITY, MAX_EVENT_CAPACITY},
    data_model::{
        characteristic::CharacteristicType,
        handler::{EmptyHandler, Handler, ServiceContext},
        service::ServiceType,
        Permissions, Value,
    },
    registry::Registry,
    Error, Result,
};

use super::{ChangeEvent, CharacteristicPath, Subscriber};

/// A dispatcher behind the single lock that serializes a multi-threaded transport
pub type SharedDispatcher<H> = Arc<Mutex<Dispatcher<H>>>;

/// Routes reads and writes to the registry and publishes value changes.
pub struct Dispatcher<H = EmptyHandler> {
    registry: Registry,
    handler: H,
    events: broadcast::Sender<ChangeEvent>,
    /// Last value published per notifiable characteristic
    published: HashMap<CharacteristicPath, Value>,
}

impl Dispatcher<EmptyHandler> {
    pub fn without_handler(registry: Registry) -> Self {
        Self::new(registry, EmptyHandler)
    }
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(registry: Registry, handler: H) -> Self {
        Self::with_capacity(registry, handler, DEFAULT_EVENT_CAPACITY)
    }

    /// `capacity` is the number of events a subscriber may fall behind before
    /// lagging, clamped to `1..=MAX_EVENT_CAPACITY`
    pub fn with_capacity(registry: Registry, handler: H, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.clamp(1, MAX_EVENT_CAPACITY));
        let published = registry
            .paths()
            .filter_map(|path| {
                let characteristic = registry.resolve_path(path).ok()?;
                characteristic
                    .is_notifiable()
                    .then(|| (path, characteristic.read().clone()))
            })
            .collect();
        Self {
            registry,
            handler,
            events,
            published,
        }
    }

    pub fn into_shared(self) -> SharedDispatcher<H> {
        Arc::new(Mutex::new(self))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn subscribe(&self) -> Subscriber {
        Subscriber::new(self.events.subscribe())
    }

    pub fn handle_read(&self, path: CharacteristicPath) -> Result<Value> {
        let characteristic = self.registry.resolve_path(path)?;
        if !characteristic.permissions().contains(Permissions::READ) {
            return Err(Error::NotReadable(characteristic.kind()));
        }
        Ok(characteristic.read().clone())
    }

    /// Remote write. On a change the new value is notified, then the handler
    /// bound to the owning service runs and its changes are notified as well.
    pub fn handle_write(&mut self, path: CharacteristicPath, value: Value) -> Result<()> {
        let (kind, changed) = {
            let characteristic = self.registry.resolve_mut(path)?;
            let changed = characteristic.write(value)?;
            (characteristic.kind(), changed)
        };
        debug!("Write {kind:?} at {path}, changed: {changed}");

        // identify fires on every write, not only on changes
        if kind == CharacteristicType::Identify {
            self.identify(path.aid)?;
        }
        if !changed {
            return Ok(());
        }
        self.notify(path)?;

        let service = self.registry.service_mut(path.aid, path.service)?;
        let mut ctx = ServiceContext::new(path.aid, path.service, service);
        let result = self.handler.handle_write(&mut ctx, kind);
        let changed = ctx.into_changed();
        self.notify_all(path.aid, path.service, changed)?;
        if let Err(e) = &result {
            warn!("Handler failed after write of {kind:?} at {path}: {e}");
        }
        result
    }

    /// Remote write with a JSON payload, coerced to the characteristic's format
    pub fn handle_write_json(
        &mut self,
        path: CharacteristicPath,
        value: &serde_json::Value,
    ) -> Result<()> {
        let characteristic = self.registry.resolve_path(path)?;
        let value = Value::from_json(characteristic.format(), value)
            .ok_or(Error::InvalidValue(characteristic.kind()))?;
        self.handle_write(path, value)
    }

    /// Local change from application code. Returns whether the value changed.
    pub fn update(&mut self, path: CharacteristicPath, value: Value) -> Result<bool> {
        let changed = self.registry.resolve_mut(path)?.set_value(value)?;
        if changed {
            self.notify(path)?;
        }
        Ok(changed)
    }

    /// Runs local application logic against one service and notifies whatever it changed.
    pub fn with_service<F, R>(&mut self, aid: u64, kind: ServiceType, f: F) -> Result<R>
    where
        F: FnOnce(&mut ServiceContext<'_>) -> Result<R>,
    {
        let index = self
            .registry
            .accessory(aid)?
            .position(kind)
            .ok_or_else(|| Error::NotFound(format!("{kind:?} on accessory {aid}")))?;
        let service = self.registry.service_mut(aid, index)?;
        let mut ctx = ServiceContext::new(aid, index, service);
        let result = f(&mut ctx);
        let changed = ctx.into_changed();
        self.notify_all(aid, index, changed)?;
        result
    }

    /// Publishes the current value of `path` to every subscriber. Returns false,
    /// without publishing, when the characteristic does not support events or
    /// its value equals the last published one.
    pub fn notify(&mut self, path: CharacteristicPath) -> Result<bool> {
        let characteristic = self.registry.resolve_path(path)?;
        if !characteristic.is_notifiable() {
            return Ok(false);
        }
        let value = characteristic.read();
        if self.published.get(&path) == Some(value) {
            trace!("{path} unchanged since last notification");
            return Ok(false);
        }
        let event = ChangeEvent {
            aid: path.aid,
            iid: characteristic.iid(),
            path,
            characteristic: characteristic.kind(),
            value: value.clone(),
        };
        self.published.insert(path, event.value.clone());
        match self.events.send(event) {
            Ok(receivers) => trace!("Notified {receivers} subscribers of {path}"),
            Err(_) => trace!("No subscribers for {path}"),
        }
        Ok(true)
    }

    fn notify_all(&mut self, aid: u64, service: usize, changed: Vec<usize>) -> Result<()> {
        for characteristic in changed {
            self.notify(CharacteristicPath::new(aid, service, characteristic))?;
        }
        Ok(())
    }

    /// Runs the accessory's identify capability. Returns false when it has none.
    pub fn identify(&self, aid: u64) -> Result<bool> {
        let accessory = self.registry.accessory(aid)?;
        let identified = accessory.identify();
        info!("Identify accessory {aid}, handled: {identified}");
        Ok(identified)
    }
}
