use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::{
    constants::{FIRST_INSTANCE_ID, MIN_ACCESSORY_ID},
    Error, Result,
};

use super::{
    characteristic::CharacteristicType,
    service::{Service, ServiceBuilder, ServiceType},
};

/// Accessory categories (HAP 13)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Category {
    Other = 1,
    Bridge = 2,
    Fan = 3,
    GarageDoorOpener = 4,
    Lightbulb = 5,
    DoorLock = 6,
    Outlet = 7,
    Switch = 8,
    Thermostat = 9,
    Sensor = 10,
    SecuritySystem = 11,
    Door = 12,
    Window = 13,
    WindowCovering = 14,
    ProgrammableSwitch = 15,
}

/// Capability invoked when a controller asks the accessory to identify itself,
/// e.g. by blinking a LED or jogging a motor.
pub trait IdentifyHandler: Send + Sync {
    fn identify(&self, accessory_id: u64);
}

impl<F> IdentifyHandler for F
where
    F: Fn(u64) + Send + Sync,
{
    fn identify(&self, accessory_id: u64) {
        self(accessory_id)
    }
}

/// Identify handler that only logs.
pub struct LogIdentify;

impl IdentifyHandler for LogIdentify {
    fn identify(&self, accessory_id: u64) {
        info!("accessory {accessory_id} identify");
    }
}

/// Contents of the accessory information service
#[derive(Clone, Debug, Deserialize)]
pub struct AccessoryInformation {
    pub name: String,
    pub manufacturer: String,
    pub serial_number: String,
    pub model: String,
    pub firmware_revision: String,
    #[serde(default)]
    pub hardware_revision: Option<String>,
}

impl AccessoryInformation {
    pub fn service(&self, identify: Arc<dyn IdentifyHandler>) -> ServiceBuilder {
        let enabled: &[CharacteristicType] = if self.hardware_revision.is_some() {
            &[CharacteristicType::HardwareRevision]
        } else {
            &[]
        };
        let mut builder = Service::with_defaults(ServiceType::AccessoryInformation, enabled)
            .value(CharacteristicType::Name, self.name.as_str())
            .value(CharacteristicType::Manufacturer, self.manufacturer.as_str())
            .value(CharacteristicType::SerialNumber, self.serial_number.as_str())
            .value(CharacteristicType::Model, self.model.as_str())
            .value(
                CharacteristicType::FirmwareRevision,
                self.firmware_revision.as_str(),
            )
            .identify(identify);
        if let Some(revision) = &self.hardware_revision {
            builder = builder.value(CharacteristicType::HardwareRevision, revision.as_str());
        }
        builder
    }
}

/// A top level device exposing services. Owned by the registry once registered.
#[derive(Clone, Debug)]
pub struct Accessory {
    id: u64,
    category: Category,
    services: Vec<Service>,
}

impl Accessory {
    pub fn builder(id: u64, category: Category) -> AccessoryBuilder {
        AccessoryBuilder {
            id,
            category,
            services: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn get(&self, index: usize) -> Option<&Service> {
        self.services.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Service> {
        self.services.get_mut(index)
    }

    pub fn position(&self, kind: ServiceType) -> Option<usize> {
        self.services.iter().position(|s| s.kind() == kind)
    }

    pub fn service(&self, kind: ServiceType) -> Option<&Service> {
        self.services.iter().find(|s| s.kind() == kind)
    }

    pub fn primary_service(&self) -> Option<&Service> {
        self.services.iter().find(|s| s.is_primary())
    }

    /// The accessory information service, present by construction
    fn information(&self) -> Option<&Service> {
        self.service(ServiceType::AccessoryInformation)
    }

    pub fn name(&self) -> Option<&str> {
        self.information()?
            .characteristic(CharacteristicType::Name)?
            .read()
            .as_str()
    }

    /// Runs the identify capability. Returns false when none is attached.
    pub fn identify(&self) -> bool {
        match self.information().and_then(|s| s.identify_handler()) {
            Some(handler) => {
                handler.identify(self.id);
                true
            }
            None => false,
        }
    }
}

pub struct AccessoryBuilder {
    id: u64,
    category: Category,
    services: Vec<ServiceBuilder>,
}

impl AccessoryBuilder {
    pub fn service(mut self, service: ServiceBuilder) -> Self {
        self.services.push(service);
        self
    }

    pub fn build(self) -> Result<Accessory> {
        if self.id < MIN_ACCESSORY_ID {
            return Err(Error::InvalidAccessoryId);
        }
        let mut services = self
            .services
            .into_iter()
            .map(ServiceBuilder::build)
            .collect::<Result<Vec<_>>>()?;

        let information = services
            .iter()
            .filter(|s| s.kind() == ServiceType::AccessoryInformation)
            .count();
        if information != 1 {
            return Err(Error::MissingAccessoryInformation(self.id));
        }
        if services.iter().filter(|s| s.is_primary()).count() > 1 {
            return Err(Error::MultiplePrimaryServices(self.id));
        }

        let mut next_iid = FIRST_INSTANCE_ID;
        for service in &mut services {
            next_iid = service.assign_iids(next_iid);
        }

        Ok(Accessory {
            id: self.id,
            category: self.category,
            services,
        })
    }
}
