//! JSON representation of the data model (HAP 6.6 and 6.7).

use bytes::Bytes;
use data_encoding::BASE64;
use serde_json::{json, Map, Number};

use crate::data_model::{
    accessory::Accessory, characteristic::Characteristic, service::Service, Format, Permissions,
    Value,
};

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(v) => json!(v),
            Value::UInt8(v) => json!(v),
            Value::UInt16(v) => json!(v),
            Value::UInt32(v) => json!(v),
            Value::UInt64(v) => json!(v),
            Value::Int(v) => json!(v),
            // through the shortest decimal form so that 0.1f32 stays 0.1
            Value::Float(v) => v
                .to_string()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(v) => json!(v),
            Value::Tlv8(v) => json!(BASE64.encode(v)),
        }
    }

    /// Coerces a JSON write payload into `format`. Returns `None` when the
    /// payload cannot represent a value of that format.
    pub fn from_json(format: Format, value: &serde_json::Value) -> Option<Value> {
        match format {
            Format::Bool => match value {
                serde_json::Value::Bool(v) => Some(Value::Bool(*v)),
                serde_json::Value::Number(_) => match integral(value)? {
                    0 => Some(Value::Bool(false)),
                    1 => Some(Value::Bool(true)),
                    _ => None,
                },
                _ => None,
            },
            Format::UInt8 => u8::try_from(integral(value)?).ok().map(Value::UInt8),
            Format::UInt16 => u16::try_from(integral(value)?).ok().map(Value::UInt16),
            Format::UInt32 => u32::try_from(integral(value)?).ok().map(Value::UInt32),
            Format::UInt64 => u64::try_from(integral(value)?).ok().map(Value::UInt64),
            Format::Int => i32::try_from(integral(value)?).ok().map(Value::Int),
            Format::Float => value.as_f64().map(|v| Value::Float(v as f32)),
            Format::String => value.as_str().map(|v| Value::String(v.to_string())),
            Format::Tlv8 => {
                let encoded = value.as_str()?;
                BASE64
                    .decode(encoded.as_bytes())
                    .ok()
                    .map(|v| Value::Tlv8(Bytes::from(v)))
            }
        }
    }
}

/// Whole number carried by a JSON number, accepting floats without a fraction
fn integral(value: &serde_json::Value) -> Option<i128> {
    if let Some(v) = value.as_u64() {
        return Some(v as i128);
    }
    if let Some(v) = value.as_i64() {
        return Some(v as i128);
    }
    let v = value.as_f64()?;
    (v.fract() == 0.0 && v.is_finite()).then_some(v as i128)
}

fn characteristic_json(characteristic: &Characteristic) -> serde_json::Value {
    let mut entry = Map::new();
    entry.insert("iid".into(), json!(characteristic.iid()));
    entry.insert("type".into(), json!(characteristic.kind().short_uuid()));
    entry.insert(
        "perms".into(),
        json!(characteristic.permissions().hap_names()),
    );
    entry.insert("format".into(), json!(characteristic.format().as_str()));
    // write-only characteristics carry no value
    if characteristic.permissions().contains(Permissions::READ) {
        entry.insert("value".into(), characteristic.read().to_json());
    }
    let constraints = characteristic.constraints();
    if let Some(min) = constraints.min {
        entry.insert("minValue".into(), json!(min));
    }
    if let Some(max) = constraints.max {
        entry.insert("maxValue".into(), json!(max));
    }
    if let Some(step) = constraints.step {
        entry.insert("minStep".into(), json!(step));
    }
    if let Some(max_len) = constraints.max_len {
        entry.insert("maxLen".into(), json!(max_len));
    }
    if let Some(unit) = characteristic.unit() {
        entry.insert("unit".into(), json!(unit.as_str()));
    }
    serde_json::Value::Object(entry)
}

fn service_json(service: &Service) -> serde_json::Value {
    json!({
        "iid": service.iid(),
        "type": service.kind().short_uuid(),
        "primary": service.is_primary(),
        "characteristics": service
            .characteristics()
            .iter()
            .map(characteristic_json)
            .collect::<Vec<_>>(),
    })
}

pub fn accessory_database(accessories: &[Accessory]) -> serde_json::Value {
    let accessories = accessories
        .iter()
        .map(|accessory| {
            json!({
                "aid": accessory.id(),
                "services": accessory.services().iter().map(service_json).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    json!({ "accessories": accessories })
}
