use std::{fmt, sync::Arc};

use crate::{constants::HAP_BASE_UUID_SUFFIX, Error, Result};

use super::{
    accessory::IdentifyHandler,
    characteristic::{Characteristic, CharacteristicType},
    Value,
};

/// Apple-defined service types, keyed by short type UUID (HAP chapter 8)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ServiceType {
    AccessoryInformation = 0x003E,
    Lightbulb = 0x0043,
    Switch = 0x0049,
    TemperatureSensor = 0x008A,
    WindowCovering = 0x008C,
}

impl ServiceType {
    /// Characteristics every service of this type must carry, in declaration order
    pub const fn required(&self) -> &'static [CharacteristicType] {
        use CharacteristicType::*;
        match self {
            ServiceType::AccessoryInformation => &[
                Name,
                Manufacturer,
                SerialNumber,
                Model,
                FirmwareRevision,
                Identify,
            ],
            ServiceType::Lightbulb | ServiceType::Switch => &[On],
            ServiceType::TemperatureSensor => &[CurrentTemperature],
            ServiceType::WindowCovering => &[PositionState, CurrentPosition, TargetPosition],
        }
    }

    /// Characteristics a service of this type may additionally carry
    pub const fn optional(&self) -> &'static [CharacteristicType] {
        use CharacteristicType::*;
        match self {
            ServiceType::AccessoryInformation => &[HardwareRevision],
            ServiceType::Lightbulb => &[Name, Brightness, Hue, Saturation],
            ServiceType::Switch => &[Name],
            ServiceType::TemperatureSensor => &[Name, StatusActive],
            ServiceType::WindowCovering => &[
                Name,
                HoldPosition,
                CurrentHorizontalTiltAngle,
                TargetHorizontalTiltAngle,
                CurrentVerticalTiltAngle,
                TargetVerticalTiltAngle,
                ObstructionDetected,
            ],
        }
    }

    pub fn allows(&self, characteristic: CharacteristicType) -> bool {
        self.required().contains(&characteristic) || self.optional().contains(&characteristic)
    }

    pub fn short_uuid(&self) -> String {
        format!("{:X}", *self as u16)
    }

    pub fn uuid(&self) -> String {
        format!("{:08X}{}", *self as u16, HAP_BASE_UUID_SUFFIX)
    }
}

/// An ordered group of characteristics for one function of an accessory.
/// The set and order of characteristics is fixed once built.
#[derive(Clone)]
pub struct Service {
    iid: u64,
    kind: ServiceType,
    primary: bool,
    characteristics: Vec<Characteristic>,
    identify: Option<Arc<dyn IdentifyHandler>>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("iid", &self.iid)
            .field("kind", &self.kind)
            .field("primary", &self.primary)
            .field("characteristics", &self.characteristics)
            .field("identify", &self.identify.is_some())
            .finish()
    }
}

impl Service {
    pub fn builder(kind: ServiceType) -> ServiceBuilder {
        ServiceBuilder {
            kind,
            primary: false,
            characteristics: Vec::new(),
            identify: None,
            error: None,
        }
    }

    /// A builder holding every required characteristic plus the `enabled`
    /// optional ones, in schema order and with default values.
    pub fn with_defaults(kind: ServiceType, enabled: &[CharacteristicType]) -> ServiceBuilder {
        let mut builder = Self::builder(kind);
        if let Some(&unsupported) = enabled.iter().find(|c| !kind.optional().contains(c)) {
            builder.error = Some(Error::UnsupportedCharacteristic {
                service: kind,
                characteristic: unsupported,
            });
            return builder;
        }
        let optional = kind.optional().iter().filter(|c| enabled.contains(c));
        for &characteristic in kind.required().iter().chain(optional) {
            builder = builder.characteristic(Characteristic::new(characteristic));
        }
        builder
    }

    pub fn iid(&self) -> u64 {
        self.iid
    }

    pub fn kind(&self) -> ServiceType {
        self.kind
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }

    pub fn get(&self, index: usize) -> Option<&Characteristic> {
        self.characteristics.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Characteristic> {
        self.characteristics.get_mut(index)
    }

    pub fn position(&self, kind: CharacteristicType) -> Option<usize> {
        self.characteristics.iter().position(|c| c.kind() == kind)
    }

    pub fn characteristic(&self, kind: CharacteristicType) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.kind() == kind)
    }

    pub fn identify_handler(&self) -> Option<&Arc<dyn IdentifyHandler>> {
        self.identify.as_ref()
    }

    /// Assigns the service's iid and then its characteristics', returning the next free iid.
    pub(crate) fn assign_iids(&mut self, first: u64) -> u64 {
        self.iid = first;
        let mut next = first + 1;
        for characteristic in &mut self.characteristics {
            characteristic.set_iid(next);
            next += 1;
        }
        next
    }
}

pub struct ServiceBuilder {
    kind: ServiceType,
    primary: bool,
    characteristics: Vec<Characteristic>,
    identify: Option<Arc<dyn IdentifyHandler>>,
    // first error hit while chaining, reported by build()
    error: Option<Error>,
}

impl ServiceBuilder {
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Append a characteristic in declaration order.
    pub fn characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    /// Set the initial value of `kind`, appending the characteristic if it
    /// has not been declared yet.
    pub fn value(mut self, kind: CharacteristicType, value: impl Into<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let value = value.into();
        let result = match self.characteristics.iter().position(|c| c.kind() == kind) {
            Some(i) => self.characteristics[i].set_value(value).map(|_| ()),
            None => Characteristic::with_value(kind, value).map(|c| self.characteristics.push(c)),
        };
        if let Err(e) = result {
            self.error = Some(e);
        }
        self
    }

    /// Attach the identify capability. Only valid on accessory information.
    pub fn identify(mut self, handler: Arc<dyn IdentifyHandler>) -> Self {
        self.identify = Some(handler);
        self
    }

    pub fn kind(&self) -> ServiceType {
        self.kind
    }

    pub fn build(self) -> Result<Service> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let kind = self.kind;
        if self.identify.is_some() && kind != ServiceType::AccessoryInformation {
            return Err(Error::UnsupportedCharacteristic {
                service: kind,
                characteristic: CharacteristicType::Identify,
            });
        }
        for (i, characteristic) in self.characteristics.iter().enumerate() {
            let characteristic = characteristic.kind();
            if !kind.allows(characteristic) {
                return Err(Error::UnsupportedCharacteristic {
                    service: kind,
                    characteristic,
                });
            }
            if self.characteristics[..i]
                .iter()
                .any(|c| c.kind() == characteristic)
            {
                return Err(Error::DuplicateCharacteristic {
                    service: kind,
                    characteristic,
                });
            }
        }
        if let Some(&missing) = kind
            .required()
            .iter()
            .find(|r| !self.characteristics.iter().any(|c| c.kind() == **r))
        {
            return Err(Error::MissingCharacteristic {
                service: kind,
                characteristic: missing,
            });
        }
        Ok(Service {
            iid: 0,
            kind,
            primary: self.primary,
            characteristics: self.characteristics,
            identify: self.identify,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CharacteristicType::*;

    #[test]
    fn defaults_follow_schema_order() {
        let service = Service::with_defaults(
            ServiceType::WindowCovering,
            &[ObstructionDetected, Name, TargetHorizontalTiltAngle],
        )
        .build()
        .unwrap();
        let kinds: Vec<_> = service.characteristics().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                PositionState,
                CurrentPosition,
                TargetPosition,
                Name,
                TargetHorizontalTiltAngle,
                ObstructionDetected
            ]
        );
    }

    #[test]
    fn missing_required_characteristic_is_rejected() {
        let err = Service::builder(ServiceType::WindowCovering)
            .characteristic(Characteristic::new(PositionState))
            .characteristic(Characteristic::new(CurrentPosition))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCharacteristic {
                service: ServiceType::WindowCovering,
                characteristic: TargetPosition
            }
        ));
    }

    #[test]
    fn foreign_and_duplicate_characteristics_are_rejected() {
        let err = Service::builder(ServiceType::Switch)
            .characteristic(Characteristic::new(On))
            .characteristic(Characteristic::new(Brightness))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharacteristic { .. }));

        let err = Service::builder(ServiceType::Switch)
            .characteristic(Characteristic::new(On))
            .characteristic(Characteristic::new(On))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCharacteristic { .. }));

        let err = Service::with_defaults(ServiceType::Switch, &[Hue])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCharacteristic {
                characteristic: Hue,
                ..
            }
        ));
    }

    #[test]
    fn value_sets_or_appends() {
        let service = Service::with_defaults(ServiceType::WindowCovering, &[])
            .value(PositionState, 2u8)
            .value(Name, "WindowCovering-01")
            .build()
            .unwrap();
        assert_eq!(
            service.characteristic(PositionState).unwrap().read(),
            &Value::UInt8(2)
        );
        assert_eq!(service.position(Name), Some(3));

        let err = Service::with_defaults(ServiceType::WindowCovering, &[])
            .value(TargetPosition, 101u8)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange(TargetPosition)));
    }

    #[test]
    fn iids_are_sequential() {
        let mut service = Service::with_defaults(ServiceType::Lightbulb, &[Brightness])
            .build()
            .unwrap();
        let next = service.assign_iids(9);
        assert_eq!(service.iid(), 9);
        assert_eq!(service.get(0).unwrap().iid(), 10);
        assert_eq!(service.get(1).unwrap().iid(), 11);
        assert_eq!(next, 12);
    }
}
