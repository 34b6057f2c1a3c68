//! Ready-made accessories together with the handlers that drive them.

pub mod window_covering;
