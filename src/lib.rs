// Booking service API suite and the random data generators used for its fixtures

pub mod client;
pub mod config;
pub mod fixtures;
pub mod flow;
pub mod generators;
pub mod model;

// Re-export key types for convenience
pub use client::{
    ApiError, BookingApi, ClientConfig, ClientError, ClientStats, Operation, RestfulBookerClient,
};
pub use config::SuiteConfig;
pub use flow::{
    FlowError, FlowFailures, FlowReport, FlowRunner, Step, StepFailure, StepRecord,
};
pub use generators::{
    random_alphanumeric, random_checksummed_id, random_digits, random_letters, CheckDigit,
    GeneratorError,
};
pub use model::{
    AuthToken, Booking, BookingDates, BookingFilter, BookingId, BookingIdRecord, BookingRecord,
    Credentials,
};
