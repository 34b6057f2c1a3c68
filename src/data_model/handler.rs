//! Application hooks bound to services.
//!
//! Handlers are composed into a chain keyed by (accessory id, service type), and the
//! dispatcher hands each changed write to the first handler bound to the owning service.
//! A handler sees the service through a [`ServiceContext`], which records every
//! characteristic it changes so that those changes are notified as well.

use tracing::debug;

use crate::{Error, Result};

use super::{
    characteristic::CharacteristicType,
    service::{Service, ServiceType},
    Value,
};

/// Mutable view of one service, used by handlers and local application logic.
pub struct ServiceContext<'a> {
    aid: u64,
    service_index: usize,
    service: &'a mut Service,
    changed: Vec<usize>,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(aid: u64, service_index: usize, service: &'a mut Service) -> Self {
        Self {
            aid,
            service_index,
            service,
            changed: Vec::new(),
        }
    }

    pub fn aid(&self) -> u64 {
        self.aid
    }

    pub fn service_index(&self) -> usize {
        self.service_index
    }

    pub fn kind(&self) -> ServiceType {
        self.service.kind()
    }

    pub fn has(&self, kind: CharacteristicType) -> bool {
        self.service.position(kind).is_some()
    }

    pub fn get(&self, kind: CharacteristicType) -> Option<&Value> {
        self.service.characteristic(kind).map(|c| c.read())
    }

    /// Local update of a characteristic of this service. Returns whether it changed.
    pub fn set(&mut self, kind: CharacteristicType, value: impl Into<Value>) -> Result<bool> {
        let index = self.service.position(kind).ok_or_else(|| {
            Error::NotFound(format!("{:?} in {:?}", kind, self.service.kind()))
        })?;
        let characteristic = self
            .service
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("{kind:?}")))?;
        let changed = characteristic.set_value(value.into())?;
        if changed && !self.changed.contains(&index) {
            self.changed.push(index);
        }
        Ok(changed)
    }

    /// Indices of the characteristics changed through this context, in change order
    pub(crate) fn into_changed(self) -> Vec<usize> {
        self.changed
    }
}

pub trait Handler {
    /// Called after a remote write changed `written` on a service bound to this handler.
    fn handle_write(
        &mut self,
        _ctx: &mut ServiceContext<'_>,
        _written: CharacteristicType,
    ) -> Result<()> {
        Ok(())
    }
}

impl<T> Handler for &mut T
where
    T: Handler,
{
    fn handle_write(
        &mut self,
        ctx: &mut ServiceContext<'_>,
        written: CharacteristicType,
    ) -> Result<()> {
        (**self).handle_write(ctx, written)
    }
}

impl<T> Handler for Box<T>
where
    T: Handler + ?Sized,
{
    fn handle_write(
        &mut self,
        ctx: &mut ServiceContext<'_>,
        written: CharacteristicType,
    ) -> Result<()> {
        (**self).handle_write(ctx, written)
    }
}

pub struct EmptyHandler;

impl EmptyHandler {
    pub const fn chain<H>(
        self,
        handler_accessory: u64,
        handler_service: ServiceType,
        handler: H,
    ) -> ChainedHandler<H, Self> {
        ChainedHandler {
            handler_accessory,
            handler_service,
            handler,
            next: self,
        }
    }
}

impl Handler for EmptyHandler {}

pub struct ChainedHandler<H, T> {
    pub handler_accessory: u64,
    pub handler_service: ServiceType,
    pub handler: H,
    pub next: T,
}

impl<H, T> ChainedHandler<H, T> {
    pub const fn chain<H2>(
        self,
        handler_accessory: u64,
        handler_service: ServiceType,
        handler: H2,
    ) -> ChainedHandler<H2, Self> {
        ChainedHandler {
            handler_accessory,
            handler_service,
            handler,
            next: self,
        }
    }
}

impl<H, T> Handler for ChainedHandler<H, T>
where
    H: Handler,
    T: Handler,
{
    fn handle_write(
        &mut self,
        ctx: &mut ServiceContext<'_>,
        written: CharacteristicType,
    ) -> Result<()> {
        if self.handler_accessory == ctx.aid() && self.handler_service == ctx.kind() {
            debug!(
                "{:?} on accessory {} handles write of {:?}",
                self.handler_service, self.handler_accessory, written
            );
            self.handler.handle_write(ctx, written)
        } else {
            self.next.handle_write(ctx, written)
        }
    }
}

#[allow(unused_macros)]
#[macro_export]
macro_rules! handler_chain_type {
    ($h:ty) => {
        $crate::data_model::handler::ChainedHandler<$h, $crate::data_model::handler::EmptyHandler>
    };
    ($h1:ty, $($rest:ty),+) => {
        $crate::data_model::handler::ChainedHandler<$h1, $crate::handler_chain_type!($($rest),+)>
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::service::Service;

    #[derive(Default)]
    struct Counter {
        writes: Vec<CharacteristicType>,
    }

    impl Handler for Counter {
        fn handle_write(
            &mut self,
            ctx: &mut ServiceContext<'_>,
            written: CharacteristicType,
        ) -> Result<()> {
            self.writes.push(written);
            ctx.set(CharacteristicType::Brightness, 100)?;
            Ok(())
        }
    }

    #[test]
    fn chain_routes_by_accessory_and_service() {
        let mut bulb =
            Service::with_defaults(ServiceType::Lightbulb, &[CharacteristicType::Brightness])
                .build()
                .unwrap();
        let mut chain: handler_chain_type!(Counter, Counter) = EmptyHandler
            .chain(2, ServiceType::Lightbulb, Counter::default())
            .chain(1, ServiceType::Lightbulb, Counter::default());

        let mut ctx = ServiceContext::new(2, 1, &mut bulb);
        chain.handle_write(&mut ctx, CharacteristicType::On).unwrap();
        assert_eq!(ctx.into_changed(), vec![1]);
        assert!(chain.handler.writes.is_empty());
        assert_eq!(chain.next.handler.writes, vec![CharacteristicType::On]);

        // no handler bound to accessory 3, nothing happens
        let mut ctx = ServiceContext::new(3, 1, &mut bulb);
        chain.handle_write(&mut ctx, CharacteristicType::On).unwrap();
        assert!(ctx.into_changed().is_empty());
    }

    #[test]
    fn context_set_reports_missing_characteristic() {
        let mut switch = Service::with_defaults(ServiceType::Switch, &[]).build().unwrap();
        let mut ctx = ServiceContext::new(1, 1, &mut switch);
        assert!(matches!(
            ctx.set(CharacteristicType::Brightness, 10),
            Err(Error::NotFound(_))
        ));
        assert!(ctx.set(CharacteristicType::On, true).unwrap());
        assert!(!ctx.set(CharacteristicType::On, true).unwrap());
        assert_eq!(ctx.into_changed(), vec![0]);
    }
}
