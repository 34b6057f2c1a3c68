use std::fmt;

use crate::data_model::{characteristic::CharacteristicType, Value};

mod dispatcher;
pub mod json;
mod subscription;

pub use dispatcher::{Dispatcher, SharedDispatcher};
pub use subscription::Subscriber;

/// Resolved address of a characteristic: accessory id plus the positions of the
/// service within the accessory and the characteristic within the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicPath {
    pub aid: u64,
    pub service: usize,
    pub characteristic: usize,
}

impl CharacteristicPath {
    pub const fn new(aid: u64, service: usize, characteristic: usize) -> Self {
        Self {
            aid,
            service,
            characteristic,
        }
    }
}

impl fmt::Display for CharacteristicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.aid, self.service, self.characteristic)
    }
}

/// A published characteristic change
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub aid: u64,
    pub iid: u64,
    pub path: CharacteristicPath,
    pub characteristic: CharacteristicType,
    pub value: Value,
}

impl ChangeEvent {
    /// Body of an `EVENT/1.0` message for this change (HAP 6.8)
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "characteristics": [{
                "aid": self.aid,
                "iid": self.iid,
                "value": self.value.to_json(),
            }]
        })
    }
}
