// Booking flow: the serial create/read/update/delete group and the independent smoke checks
// Each step hands its output to the next as a typed session value, and the runner stops at the first failure

use crate::client::{ApiError, BookingApi, ClientStats};
use crate::fixtures;
use crate::model::{AuthToken, Booking, BookingFilter, BookingId, BookingIdRecord, Credentials};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Authenticate,
    CreateBooking,
    ReadBooking,
    RejectUnauthenticatedUpdate,
    UpdateBooking,
    RejectUnauthenticatedDelete,
    DeleteBooking,
    ConfirmDeletion,
    ListBookingIds,
    HealthCheck,
}

impl Step {
    // Declaration order of the serial group
    pub const SERIAL: [Step; 8] = [
        Step::Authenticate,
        Step::CreateBooking,
        Step::ReadBooking,
        Step::RejectUnauthenticatedUpdate,
        Step::UpdateBooking,
        Step::RejectUnauthenticatedDelete,
        Step::DeleteBooking,
        Step::ConfirmDeletion,
    ];

    pub const SMOKE: [Step; 2] = [Step::ListBookingIds, Step::HealthCheck];

    pub fn name(self) -> &'static str {
        match self {
            Step::Authenticate => "authenticate",
            Step::CreateBooking => "create_booking",
            Step::ReadBooking => "read_booking",
            Step::RejectUnauthenticatedUpdate => "reject_unauthenticated_update",
            Step::UpdateBooking => "update_booking",
            Step::RejectUnauthenticatedDelete => "reject_unauthenticated_delete",
            Step::DeleteBooking => "delete_booking",
            Step::ConfirmDeletion => "confirm_deletion",
            Step::ListBookingIds => "list_booking_ids",
            Step::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Assertion failed in {step}: {message}")]
    AssertionFailed { step: Step, message: String },
}

impl FlowError {
    fn assertion(step: Step, message: impl Into<String>) -> Self {
        FlowError::AssertionFailed {
            step,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
#[error("Step {step} failed: {error}")]
pub struct StepFailure {
    pub step: Step,
    #[source]
    pub error: FlowError,
}

/// Every step that failed in one run, in the order the steps are declared.
#[derive(Error, Debug)]
#[error("{} step(s) failed: {}", .failures.len(), describe(.failures))]
pub struct FlowFailures {
    pub failures: Vec<StepFailure>,
}

impl FlowFailures {
    pub fn steps(&self) -> Vec<Step> {
        self.failures.iter().map(|f| f.step).collect()
    }
}

fn describe(failures: &[StepFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// Session state after the token step
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub token: AuthToken,
}

// Session state while the booking exists; `booking` is what the service should currently hold
#[derive(Debug, Clone)]
pub struct BookedSession {
    pub token: AuthToken,
    pub booking_id: BookingId,
    pub booking: Booking,
}

// What remains once the booking is gone; the id is no longer valid on the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedBooking {
    pub booking_id: BookingId,
}

pub async fn authenticate<A: BookingApi + ?Sized>(
    api: &A,
    credentials: &Credentials,
) -> Result<AuthenticatedSession, FlowError> {
    let token = api.create_token(credentials).await?;
    Ok(AuthenticatedSession { token })
}

pub async fn create_booking<A: BookingApi + ?Sized>(
    api: &A,
    session: AuthenticatedSession,
    booking: &Booking,
) -> Result<BookedSession, FlowError> {
    let record = api.create_booking(booking).await?;
    if record.bookingid.0 == 0 {
        return Err(FlowError::assertion(
            Step::CreateBooking,
            "service assigned booking id 0",
        ));
    }
    if &record.booking != booking {
        return Err(FlowError::assertion(
            Step::CreateBooking,
            format!("created booking differs from payload: {:?}", record.booking),
        ));
    }
    info!(
        booking_id = %record.bookingid,
        nights = record.booking.bookingdates.nights(),
        "booking created"
    );

    Ok(BookedSession {
        token: session.token,
        booking_id: record.bookingid,
        booking: record.booking,
    })
}

pub async fn read_booking<A: BookingApi + ?Sized>(
    api: &A,
    session: &BookedSession,
) -> Result<Booking, FlowError> {
    let booking = api.get_booking(session.booking_id).await?;
    if booking != session.booking {
        return Err(FlowError::assertion(
            Step::ReadBooking,
            format!(
                "booking {} does not match what was stored: {booking:?}",
                session.booking_id
            ),
        ));
    }
    Ok(booking)
}

// Expects the service to refuse an update that carries no token; returns the refusal status
pub async fn reject_unauthenticated_update<A: BookingApi + ?Sized>(
    api: &A,
    session: &BookedSession,
    booking: &Booking,
) -> Result<u16, FlowError> {
    let result = api.update_booking(session.booking_id, booking, None).await;
    expect_auth_rejection(Step::RejectUnauthenticatedUpdate, result.map(|_| ()))
}

pub async fn update_booking<A: BookingApi + ?Sized>(
    api: &A,
    session: BookedSession,
    booking: &Booking,
) -> Result<BookedSession, FlowError> {
    let updated = api
        .update_booking(session.booking_id, booking, Some(&session.token))
        .await?;
    if &updated != booking {
        return Err(FlowError::assertion(
            Step::UpdateBooking,
            format!("service echoed {updated:?}, submitted {booking:?}"),
        ));
    }

    Ok(BookedSession {
        booking: updated,
        ..session
    })
}

pub async fn reject_unauthenticated_delete<A: BookingApi + ?Sized>(
    api: &A,
    session: &BookedSession,
) -> Result<u16, FlowError> {
    let result = api.delete_booking(session.booking_id, None).await;
    expect_auth_rejection(Step::RejectUnauthenticatedDelete, result)
}

pub async fn delete_booking<A: BookingApi + ?Sized>(
    api: &A,
    session: BookedSession,
) -> Result<DeletedBooking, FlowError> {
    api.delete_booking(session.booking_id, Some(&session.token))
        .await?;
    Ok(DeletedBooking {
        booking_id: session.booking_id,
    })
}

// A deleted booking must read back as 404
pub async fn confirm_deletion<A: BookingApi + ?Sized>(
    api: &A,
    deleted: &DeletedBooking,
) -> Result<(), FlowError> {
    match api.get_booking(deleted.booking_id).await {
        Err(err) if err.status() == Some(404) => Ok(()),
        Err(err) => Err(err.into()),
        Ok(booking) => Err(FlowError::assertion(
            Step::ConfirmDeletion,
            format!(
                "booking {} still readable after delete: {booking:?}",
                deleted.booking_id
            ),
        )),
    }
}

pub async fn list_booking_ids<A: BookingApi + ?Sized>(
    api: &A,
    filter: &BookingFilter,
) -> Result<Vec<BookingIdRecord>, FlowError> {
    let ids = api.list_booking_ids(filter).await?;
    info!(count = ids.len(), "booking ids listed");
    Ok(ids)
}

pub async fn health_check<A: BookingApi + ?Sized>(api: &A) -> Result<String, FlowError> {
    let body = api.health_check().await?;
    if body.trim().is_empty() {
        return Err(FlowError::assertion(
            Step::HealthCheck,
            "ping returned an empty body",
        ));
    }
    Ok(body)
}

fn expect_auth_rejection(step: Step, result: Result<(), ApiError>) -> Result<u16, FlowError> {
    match result {
        Err(err) if err.is_auth_rejection() => Ok(err.status().unwrap_or_default()),
        Err(err) => Err(err.into()),
        Ok(()) => Err(FlowError::assertion(
            step,
            "service accepted a request without a token",
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct FlowReport {
    pub completed: Vec<StepRecord>,
    pub failures: Vec<StepFailure>,
}

impl FlowReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn completed_steps(&self) -> Vec<Step> {
        self.completed.iter().map(|r| r.step).collect()
    }

    // First failure in declaration order
    pub fn failed_step(&self) -> Option<Step> {
        self.failures.first().map(|f| f.step)
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.failures.iter().map(|f| f.step).collect()
    }

    pub fn into_result(self) -> Result<Vec<StepRecord>, FlowFailures> {
        if self.failures.is_empty() {
            Ok(self.completed)
        } else {
            Err(FlowFailures {
                failures: self.failures,
            })
        }
    }

    fn merge(mut self, other: FlowReport) -> FlowReport {
        self.completed.extend(other.completed);
        self.failures.extend(other.failures);
        self
    }
}

#[derive(Default)]
struct Recorder {
    completed: Vec<StepRecord>,
}

impl Recorder {
    fn record<T>(
        &mut self,
        step: Step,
        elapsed: Duration,
        result: Result<T, FlowError>,
    ) -> Result<T, StepFailure> {
        match result {
            Ok(value) => {
                info!(%step, elapsed_ms = elapsed.as_millis() as u64, "step passed");
                self.completed.push(StepRecord { step, elapsed });
                Ok(value)
            }
            Err(error) => {
                error!(%step, %error, "step failed");
                Err(StepFailure { step, error })
            }
        }
    }

    async fn step<T, F>(&mut self, step: Step, future: F) -> Result<T, StepFailure>
    where
        F: Future<Output = Result<T, FlowError>>,
    {
        info!(%step, "step started");
        let (result, elapsed) = timed(future).await;
        self.record(step, elapsed, result)
    }

    fn finish(self, failures: Vec<StepFailure>) -> FlowReport {
        FlowReport {
            completed: self.completed,
            failures,
        }
    }
}

async fn timed<T, F: Future<Output = T>>(future: F) -> (T, Duration) {
    let started = Instant::now();
    let output = future.await;
    (output, started.elapsed())
}

pub struct FlowRunner<'a, A: BookingApi + ?Sized> {
    api: &'a A,
    credentials: Credentials,
    created: Booking,
    updated: Booking,
    filter: BookingFilter,
}

impl<'a, A: BookingApi + ?Sized> FlowRunner<'a, A> {
    pub fn new(api: &'a A, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            created: fixtures::created_booking(),
            updated: fixtures::updated_booking(),
            filter: BookingFilter::default(),
        }
    }

    pub fn with_bookings(mut self, created: Booking, updated: Booking) -> Self {
        self.created = created;
        self.updated = updated;
        self
    }

    pub fn with_list_filter(mut self, filter: BookingFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn stats(&self) -> ClientStats {
        self.api.stats()
    }

    /// Runs the serial group in declaration order, stopping at the first failing step.
    pub async fn run_serial(&self) -> FlowReport {
        let mut recorder = Recorder::default();
        let failures = self.serial(&mut recorder).await.err().into_iter().collect();
        recorder.finish(failures)
    }

    async fn serial(&self, rec: &mut Recorder) -> Result<(), StepFailure> {
        let api = self.api;

        let session = rec
            .step(Step::Authenticate, authenticate(api, &self.credentials))
            .await?;
        let session = rec
            .step(Step::CreateBooking, create_booking(api, session, &self.created))
            .await?;
        rec.step(Step::ReadBooking, read_booking(api, &session))
            .await?;
        rec.step(
            Step::RejectUnauthenticatedUpdate,
            reject_unauthenticated_update(api, &session, &self.updated),
        )
        .await?;
        let session = rec
            .step(Step::UpdateBooking, update_booking(api, session, &self.updated))
            .await?;
        rec.step(
            Step::RejectUnauthenticatedDelete,
            reject_unauthenticated_delete(api, &session),
        )
        .await?;
        let deleted = rec
            .step(Step::DeleteBooking, delete_booking(api, session))
            .await?;
        rec.step(Step::ConfirmDeletion, confirm_deletion(api, &deleted))
            .await?;
        Ok(())
    }

    /// Runs the list and health checks concurrently; they share no state with the serial group.
    pub async fn run_smoke_checks(&self) -> FlowReport {
        let ((list, list_elapsed), (health, health_elapsed)) = futures::join!(
            timed(list_booking_ids(self.api, &self.filter)),
            timed(health_check(self.api))
        );

        let mut recorder = Recorder::default();
        let list = recorder.record(Step::ListBookingIds, list_elapsed, list);
        let health = recorder.record(Step::HealthCheck, health_elapsed, health);
        let failures = [list.err(), health.err()].into_iter().flatten().collect();
        recorder.finish(failures)
    }

    /// Runs the serial group, then the smoke checks whatever the serial outcome.
    pub async fn run_all(&self) -> FlowReport {
        let serial = self.run_serial().await;
        if let Some(step) = serial.failed_step() {
            warn!(%step, "serial group failed, running smoke checks anyway");
        }
        let smoke = self.run_smoke_checks().await;
        serial.merge(smoke)
    }
}
