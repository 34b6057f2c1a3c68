//! Constants from the HomeKit Accessory Protocol specification.

/// Suffix that turns a short type id into a full Apple-defined UUID (HAP 6.6.1)
pub const HAP_BASE_UUID_SUFFIX: &str = "-0000-1000-8000-0026BB765291";

/// Accessory ids start at 1; the bridge or standalone accessory is always 1
pub const MIN_ACCESSORY_ID: u64 = 1;
/// Instance ids start at 1 within each accessory
pub const FIRST_INSTANCE_ID: u64 = 1;

/// Default maximum length of a string characteristic (HAP 6.3.3)
pub const DEFAULT_STRING_MAX_LEN: usize = 64;
/// Absolute maximum length of a string characteristic
pub const MAX_STRING_LEN: usize = 256;

/// Number of events buffered for each subscriber before it starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
/// Upper bound on the event buffer, whose slots are allocated up front
pub const MAX_EVENT_CAPACITY: usize = 4096;

/// Length of a formatted setup code, `XXX-XX-XXX`
pub const SETUP_CODE_LEN: usize = 10;
/// Setup codes HAP forbids because they are trivially guessable (HAP 4.2.1.1)
pub const INVALID_SETUP_CODES: [&str; 12] = [
    "000-00-000",
    "111-11-111",
    "222-22-222",
    "333-33-333",
    "444-44-444",
    "555-55-555",
    "666-66-666",
    "777-77-777",
    "888-88-888",
    "999-99-999",
    "123-45-678",
    "876-54-321",
];

/// Environment variable that provisions the setup code out-of-band
pub const SETUP_CODE_ENV: &str = "HOMEKIT_SETUP_CODE";
