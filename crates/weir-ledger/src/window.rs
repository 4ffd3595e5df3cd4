//! Reservation time window.

use serde::Serialize;

use crate::clock;
use crate::error::WindowError;
use crate::obligation::OBLIGATION_HORIZON;
use crate::Timestamp;

/// Lifecycle stage of a window relative to some point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowState {
    /// Commence time has not been reached.
    Pending,
    /// Between commence and expiry.
    Active,
    /// At or past the expiry time.
    Expired,
}

impl std::fmt::Display for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowState::Pending => write!(f, "PENDING"),
            WindowState::Active => write!(f, "ACTIVE"),
            WindowState::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// The `[commence, expiry)` span of a reservation.
///
/// Construction vets the span: a commence time in the past is silently
/// clamped forward to now, an expiry at or before the adjusted commence
/// or past the obligation horizon is rejected.
///
/// Predicates take `now` explicitly so callers and tests control the
/// clock; the reservation manager passes the wall clock through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    commence: Timestamp,
    expiry: Timestamp,
}

impl Window {
    /// Vets and creates a window against the wall clock.
    pub fn new(commence: Timestamp, expiry: Timestamp) -> Result<Self, WindowError> {
        Self::vet(clock::unix_now(), commence, expiry)
    }

    /// Vets and creates a window against the given current time.
    pub fn vet(now: Timestamp, commence: Timestamp, expiry: Timestamp) -> Result<Self, WindowError> {
        let commence = commence.max(now);

        if expiry <= commence {
            return Err(WindowError::Expired { now, expiry });
        }
        if expiry > OBLIGATION_HORIZON {
            return Err(WindowError::BeyondHorizon { expiry });
        }

        Ok(Self { commence, expiry })
    }

    /// Commence time.
    pub fn commence(&self) -> Timestamp {
        self.commence
    }

    /// Expiry time.
    pub fn expiry(&self) -> Timestamp {
        self.expiry
    }

    /// Commence and expiry as a pair.
    pub fn values(&self) -> (Timestamp, Timestamp) {
        (self.commence, self.expiry)
    }

    /// Moves the expiry by `n` seconds. A negative adjustment never pulls
    /// the expiry before now.
    pub fn extend_by(&mut self, n: Timestamp) {
        self.expiry += n;
        if n < 0 {
            let now = clock::unix_now();
            if self.expiry < now {
                self.expiry = now;
            }
        }
    }

    /// Forces the expiry, even into the past.
    pub fn set_expiry(&mut self, t: Timestamp) {
        self.expiry = t;
    }

    /// True once `now` reaches the expiry time.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiry
    }

    /// True while `now` is before the commence time.
    pub fn is_pending(&self, now: Timestamp) -> bool {
        now < self.commence
    }

    /// True while `now` lies strictly inside the window.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.commence < now && self.expiry > now
    }

    /// True if the window commences within the next `within` seconds.
    pub fn is_active_soon(&self, now: Timestamp, within: Timestamp) -> bool {
        self.commence >= now && self.commence <= now + within
    }

    /// True if the window commenced within the last `within` seconds and
    /// has not expired.
    pub fn commenced_recently(&self, now: Timestamp, within: Timestamp) -> bool {
        self.commence >= now - within && self.commence <= now && self.expiry > now
    }

    /// True if the window expired within the last `within` seconds.
    pub fn concluded_recently(&self, now: Timestamp, within: Timestamp) -> bool {
        self.expiry < now && self.expiry >= now - within
    }

    /// True if the window expired at least `within` seconds ago and can be
    /// discarded.
    pub fn is_extinct(&self, now: Timestamp, within: Timestamp) -> bool {
        self.expiry <= now - within
    }

    /// True if the two windows share any time. Windows that only touch at
    /// an endpoint do not overlap.
    pub fn overlaps(&self, other: &Window) -> bool {
        (other.commence >= self.commence && other.commence < self.expiry)
            || (other.expiry > self.commence && other.expiry <= self.expiry)
            || (other.commence <= self.commence && other.expiry >= self.expiry)
    }

    /// Lifecycle state at the given time.
    pub fn state(&self, now: Timestamp) -> WindowState {
        if now >= self.expiry {
            WindowState::Expired
        } else if now < self.commence {
            WindowState::Pending
        } else {
            WindowState::Active
        }
    }
}
