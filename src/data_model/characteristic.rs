use serde::Deserialize;
use tracing::trace;

use crate::{
    constants::{DEFAULT_STRING_MAX_LEN, HAP_BASE_UUID_SUFFIX},
    Error, Result,
};

use super::{Constraints, Format, Permissions, Unit, Value};

/// Apple-defined characteristic types. The discriminant is the short form of
/// the type UUID (HAP chapter 9).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicType {
    Brightness = 0x0008,
    CurrentTemperature = 0x0011,
    Hue = 0x0013,
    Identify = 0x0014,
    Manufacturer = 0x0020,
    Model = 0x0021,
    Name = 0x0023,
    ObstructionDetected = 0x0024,
    On = 0x0025,
    Saturation = 0x002F,
    SerialNumber = 0x0030,
    FirmwareRevision = 0x0052,
    HardwareRevision = 0x0053,
    CurrentHorizontalTiltAngle = 0x006C,
    CurrentPosition = 0x006D,
    CurrentVerticalTiltAngle = 0x006E,
    HoldPosition = 0x006F,
    PositionState = 0x0072,
    StatusActive = 0x0075,
    TargetHorizontalTiltAngle = 0x007B,
    TargetPosition = 0x007C,
    TargetVerticalTiltAngle = 0x007D,
}

/// Format, permissions and constraints of a characteristic type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Definition {
    pub format: Format,
    pub permissions: Permissions,
    pub constraints: Constraints,
    pub unit: Option<Unit>,
}

const PR: Permissions = Permissions::READ;
const PW: Permissions = Permissions::WRITE;
const PR_EV: Permissions = Permissions::READ.union(Permissions::NOTIFY);
const PR_PW_EV: Permissions = Permissions::READ
    .union(Permissions::WRITE)
    .union(Permissions::NOTIFY);

const PERCENT: Constraints = Constraints::range(0.0, 100.0, 1.0);
const TILT: Constraints = Constraints::range(-90.0, 90.0, 1.0);
const LABEL: Constraints = Constraints::string(DEFAULT_STRING_MAX_LEN);

const fn def(
    format: Format,
    permissions: Permissions,
    constraints: Constraints,
    unit: Option<Unit>,
) -> Definition {
    Definition {
        format,
        permissions,
        constraints,
        unit,
    }
}

impl CharacteristicType {
    pub const fn definition(&self) -> Definition {
        use CharacteristicType::*;
        match self {
            Identify | HoldPosition => def(Format::Bool, PW, Constraints::NONE, None),
            Manufacturer | Model | Name | SerialNumber | FirmwareRevision | HardwareRevision => {
                def(Format::String, PR, LABEL, None)
            }
            On => def(Format::Bool, PR_PW_EV, Constraints::NONE, None),
            ObstructionDetected | StatusActive => def(Format::Bool, PR_EV, Constraints::NONE, None),
            Brightness => def(Format::Int, PR_PW_EV, PERCENT, Some(Unit::Percentage)),
            Hue => def(
                Format::Float,
                PR_PW_EV,
                Constraints::range(0.0, 360.0, 1.0),
                Some(Unit::ArcDegrees),
            ),
            Saturation => def(Format::Float, PR_PW_EV, PERCENT, Some(Unit::Percentage)),
            CurrentTemperature => def(
                Format::Float,
                PR_EV,
                Constraints::range(0.0, 100.0, 0.1),
                Some(Unit::Celsius),
            ),
            CurrentPosition => def(Format::UInt8, PR_EV, PERCENT, Some(Unit::Percentage)),
            TargetPosition => def(Format::UInt8, PR_PW_EV, PERCENT, Some(Unit::Percentage)),
            // 0 = closing, 1 = opening, 2 = stopped
            PositionState => def(
                Format::UInt8,
                PR_EV,
                Constraints::range(0.0, 2.0, 1.0),
                None,
            ),
            CurrentHorizontalTiltAngle | CurrentVerticalTiltAngle => {
                def(Format::Int, PR_EV, TILT, Some(Unit::ArcDegrees))
            }
            TargetHorizontalTiltAngle | TargetVerticalTiltAngle => {
                def(Format::Int, PR_PW_EV, TILT, Some(Unit::ArcDegrees))
            }
        }
    }

    /// Short type id as written in the accessory database, e.g. `7C`
    pub fn short_uuid(&self) -> String {
        format!("{:X}", *self as u16)
    }

    /// Full type UUID, e.g. `0000007C-0000-1000-8000-0026BB765291`
    pub fn uuid(&self) -> String {
        format!("{:08X}{}", *self as u16, HAP_BASE_UUID_SUFFIX)
    }
}

/// A typed value cell owned by a service.
#[derive(Debug, Clone, PartialEq)]
pub struct Characteristic {
    iid: u64,
    kind: CharacteristicType,
    definition: Definition,
    value: Value,
}

impl Characteristic {
    /// A characteristic holding the zero value of its format.
    pub fn new(kind: CharacteristicType) -> Self {
        let definition = kind.definition();
        Self {
            iid: 0,
            kind,
            definition,
            value: definition.format.zero(),
        }
    }

    /// A characteristic with a declared initial value, validated like a local update.
    pub fn with_value(kind: CharacteristicType, value: impl Into<Value>) -> Result<Self> {
        let mut characteristic = Self::new(kind);
        characteristic.set_value(value.into())?;
        Ok(characteristic)
    }

    /// Override the definition's constraints, e.g. a narrower temperature range.
    /// The current value must still satisfy them.
    pub fn with_constraints(mut self, constraints: Constraints) -> Result<Self> {
        if !constraints.admits(&self.value) {
            return Err(Error::OutOfRange(self.kind));
        }
        self.definition.constraints = constraints;
        Ok(self)
    }

    pub fn iid(&self) -> u64 {
        self.iid
    }

    pub(crate) fn set_iid(&mut self, iid: u64) {
        self.iid = iid;
    }

    pub fn kind(&self) -> CharacteristicType {
        self.kind
    }

    pub fn format(&self) -> Format {
        self.definition.format
    }

    pub fn permissions(&self) -> Permissions {
        self.definition.permissions
    }

    pub fn constraints(&self) -> &Constraints {
        &self.definition.constraints
    }

    pub fn unit(&self) -> Option<Unit> {
        self.definition.unit
    }

    pub fn is_notifiable(&self) -> bool {
        self.definition.permissions.contains(Permissions::NOTIFY)
    }

    pub fn read(&self) -> &Value {
        &self.value
    }

    /// Remote write. Returns whether the stored value changed.
    pub fn write(&mut self, value: Value) -> Result<bool> {
        if !self.definition.permissions.contains(Permissions::WRITE) {
            return Err(Error::NotWritable(self.kind));
        }
        self.set_value(value)
    }

    /// Local update from application logic. Skips the write permission check
    /// so that read-only values such as the current position can be driven.
    pub fn set_value(&mut self, value: Value) -> Result<bool> {
        self.validate(&value)?;
        if self.value == value {
            return Ok(false);
        }
        trace!(
            "{:?} (iid {}) {:?} -> {:?}",
            self.kind,
            self.iid,
            self.value,
            value
        );
        self.value = value;
        Ok(true)
    }

    fn validate(&self, value: &Value) -> Result<()> {
        if value.format() != self.definition.format {
            return Err(Error::InvalidValue(self.kind));
        }
        if let Value::Float(v) = value {
            if !v.is_finite() {
                return Err(Error::InvalidValue(self.kind));
            }
        }
        if !self.definition.constraints.admits(value) {
            return Err(Error::OutOfRange(self.kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use num::FromPrimitive;

    use super::*;

    #[test]
    fn type_ids_round_trip_through_short_uuid() {
        assert_eq!(
            CharacteristicType::from_u16(0x7C),
            Some(CharacteristicType::TargetPosition)
        );
        assert_eq!(CharacteristicType::from_u16(0x7E), None);
        assert_eq!(CharacteristicType::TargetPosition.short_uuid(), "7C");
        assert_eq!(
            CharacteristicType::PositionState.uuid(),
            "00000072-0000-1000-8000-0026BB765291"
        );
    }

    #[test]
    fn write_then_read_returns_value() {
        let mut target = Characteristic::new(CharacteristicType::TargetPosition);
        for v in [0u8, 1, 37, 99, 100] {
            target.write(Value::UInt8(v)).unwrap();
            assert_eq!(target.read(), &Value::UInt8(v));
        }

        let mut tilt = Characteristic::new(CharacteristicType::TargetHorizontalTiltAngle);
        tilt.write(Value::Int(-90)).unwrap();
        assert_eq!(tilt.read(), &Value::Int(-90));
    }

    #[test]
    fn out_of_range_write_leaves_value_unchanged() {
        let mut target =
            Characteristic::with_value(CharacteristicType::TargetPosition, 40u8).unwrap();
        let err = target.write(Value::UInt8(150)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(CharacteristicType::TargetPosition)));
        assert_eq!(target.read(), &Value::UInt8(40));

        let mut tilt = Characteristic::new(CharacteristicType::TargetVerticalTiltAngle);
        assert!(matches!(tilt.write(Value::Int(91)), Err(Error::OutOfRange(_))));
        assert_eq!(tilt.read(), &Value::Int(0));
    }

    #[test]
    fn type_mismatch_is_invalid() {
        let mut target = Characteristic::new(CharacteristicType::TargetPosition);
        assert!(matches!(
            target.write(Value::Int(50)),
            Err(Error::InvalidValue(_))
        ));
        let mut hue = Characteristic::new(CharacteristicType::Hue);
        assert!(matches!(
            hue.write(Value::Float(f32::NAN)),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn read_only_rejects_remote_write_but_accepts_local_update() {
        let mut current = Characteristic::new(CharacteristicType::CurrentPosition);
        assert!(matches!(
            current.write(Value::UInt8(10)),
            Err(Error::NotWritable(CharacteristicType::CurrentPosition))
        ));
        assert!(current.set_value(Value::UInt8(10)).unwrap());
        assert_eq!(current.read(), &Value::UInt8(10));
    }

    #[test]
    fn writing_same_value_reports_no_change() {
        let mut target = Characteristic::new(CharacteristicType::TargetPosition);
        assert!(target.write(Value::UInt8(20)).unwrap());
        assert!(!target.write(Value::UInt8(20)).unwrap());
    }

    #[test]
    fn name_length_is_limited() {
        let long = "x".repeat(DEFAULT_STRING_MAX_LEN + 1);
        assert!(matches!(
            Characteristic::with_value(CharacteristicType::Name, long),
            Err(Error::OutOfRange(CharacteristicType::Name))
        ));
    }

    #[test]
    fn narrower_constraints_apply() {
        let temp = Characteristic::with_value(CharacteristicType::CurrentTemperature, 21.5f32)
            .unwrap()
            .with_constraints(Constraints::range(-20.0, 60.0, 0.5))
            .unwrap();
        assert_eq!(temp.constraints().min, Some(-20.0));

        let hot = Characteristic::with_value(CharacteristicType::CurrentTemperature, 80.0f32)
            .unwrap()
            .with_constraints(Constraints::range(-20.0, 60.0, 0.5));
        assert!(hot.is_err());
    }
}
