use crate::data_model::{characteristic::CharacteristicType, service::ServiceType};

/// Errors returned by the data model, the registry and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid value for {0:?}")]
    InvalidValue(CharacteristicType),

    #[error("Value out of range for {0:?}")]
    OutOfRange(CharacteristicType),

    #[error("{0:?} is not writable")]
    NotWritable(CharacteristicType),

    #[error("{0:?} is not readable")]
    NotReadable(CharacteristicType),

    #[error("Characteristic not found: {0}")]
    NotFound(String),

    #[error("Duplicate accessory id {0}")]
    DuplicateId(u64),

    #[error("Registry is already initialized")]
    AlreadyInitialized,

    #[error("{service:?} is missing required characteristic {characteristic:?}")]
    MissingCharacteristic {
        service: ServiceType,
        characteristic: CharacteristicType,
    },

    #[error("{service:?} does not support characteristic {characteristic:?}")]
    UnsupportedCharacteristic {
        service: ServiceType,
        characteristic: CharacteristicType,
    },

    #[error("{service:?} declares {characteristic:?} more than once")]
    DuplicateCharacteristic {
        service: ServiceType,
        characteristic: CharacteristicType,
    },

    #[error("Accessory {0} must have exactly one accessory information service")]
    MissingAccessoryInformation(u64),

    #[error("Accessory {0} declares more than one primary service")]
    MultiplePrimaryServices(u64),

    #[error("Accessory id must be at least 1")]
    InvalidAccessoryId,

    #[error("Invalid setup code: {0}")]
    InvalidSetupCode(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// HAP status codes reported to controllers (HAP 6.7.1.4)
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum StatusCode {
    Success = 0,
    InsufficientPrivileges = -70401,
    ServiceCommunicationFailure = -70402,
    ResourceBusy = -70403,
    ReadOnlyCharacteristic = -70404,
    WriteOnlyCharacteristic = -70405,
    NotificationNotSupported = -70406,
    OutOfResource = -70407,
    OperationTimedOut = -70408,
    ResourceDoesNotExist = -70409,
    InvalidValueInRequest = -70410,
}

impl Error {
    /// The status a transport should report for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotWritable(_) => StatusCode::ReadOnlyCharacteristic,
            Error::NotReadable(_) => StatusCode::WriteOnlyCharacteristic,
            Error::NotFound(_) => StatusCode::ResourceDoesNotExist,
            Error::InvalidValue(_) | Error::OutOfRange(_) => StatusCode::InvalidValueInRequest,
            _ => StatusCode::ServiceCommunicationFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_for_runtime_errors() {
        let err = Error::NotWritable(CharacteristicType::CurrentPosition);
        assert_eq!(err.status_code(), StatusCode::ReadOnlyCharacteristic);
        assert_eq!(err.status_code() as i32, -70404);

        let err = Error::OutOfRange(CharacteristicType::TargetPosition);
        assert_eq!(err.status_code(), StatusCode::InvalidValueInRequest);

        let err = Error::NotFound("1.9".into());
        assert_eq!(err.status_code() as i32, -70409);
    }
}
