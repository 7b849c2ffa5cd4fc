//! Availability checks and booking management for bookable products.

mod handlers;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use storepilot_common::{Error, Result};

pub use handlers::{
    CANCEL_BOOKING, CHANGE_BOOKING_STATUS, CHECK_AVAILABILITY, CREATE_BOOKING,
    GET_BOOKING_DETAILS, UPDATE_BOOKING, register_booking_handlers,
};
pub use memory::InMemoryBookingBackend;
pub use rest::RestBookingBackend;

/// Statuses a booking may be moved to.
pub const BOOKING_STATUSES: &[&str] = &[
    "unpaid",
    "pending-confirmation",
    "confirmed",
    "paid",
    "complete",
    "cancelled",
];

/// Statuses that do not hold capacity.
const RELEASED_STATUSES: &[&str] = &["cancelled", "trash", "was-in-cart", "in-cart"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookableProduct {
    pub id: u64,
    pub name: String,
    pub bookable: bool,
    /// Bookings allowed per block when no resource overrides it.
    pub capacity: u32,
    pub resources: Vec<BookableResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookableResource {
    pub id: u64,
    pub name: String,
    pub capacity: Option<u32>,
}

/// Whole days `start..=end`, as `[start 00:00, end + 1 day 00:00)` UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BookingWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::Action(format!(
                "end_date {end} is before start_date {start}."
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start_timestamp(&self) -> i64 {
        midnight(self.start)
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end
            .checked_add_days(Days::new(1))
            .map(midnight)
            .unwrap_or(i64::MAX)
    }

    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        start < self.end_timestamp() && end > self.start_timestamp()
    }

    pub fn describe(&self) -> String {
        format!(
            "from {} to {}",
            self.start.format("%b %-d, %Y"),
            self.end.format("%b %-d, %Y")
        )
    }
}

fn midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: u64,
    pub product_id: u64,
    pub resource_id: Option<u64>,
    pub status: String,
    pub start: i64,
    pub end: i64,
    pub customer_id: u64,
}

impl Booking {
    pub fn holds_capacity(&self) -> bool {
        !RELEASED_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub product_id: u64,
    pub resource_id: Option<u64>,
    pub window: BookingWindow,
    pub status: String,
    pub customer_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingUpdate {
    pub status: Option<String>,
    pub window: Option<BookingWindow>,
    pub resource_id: Option<u64>,
}

/// Storage and lookup for bookable products and their bookings.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn product(&self, product_id: u64) -> Result<Option<BookableProduct>>;

    /// Bookings of `product_id` overlapping `window`, in any status.
    async fn bookings_in_window(
        &self,
        product_id: u64,
        window: &BookingWindow,
    ) -> Result<Vec<Booking>>;

    async fn customer_by_email(&self, email: &str) -> Result<Option<u64>>;

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking>;

    async fn booking(&self, booking_id: u64) -> Result<Option<Booking>>;

    async fn update_booking(&self, booking_id: u64, update: &BookingUpdate) -> Result<Booking>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub product_name: String,
    pub remaining: u32,
    pub available: bool,
}

/// Sum of per-resource `(capacity, booked)` headroom, each clamped at zero.
pub fn remaining_capacity<I>(slots: I) -> u32
where
    I: IntoIterator<Item = (u32, u32)>,
{
    slots
        .into_iter()
        .map(|(capacity, booked)| capacity.saturating_sub(booked))
        .fold(0u32, u32::saturating_add)
}

pub struct AvailabilityQuery {
    pub product_id: u64,
    pub window: BookingWindow,
    pub resource_id: Option<u64>,
    pub quantity: u32,
    /// Booking being moved; it must not count against itself.
    pub exclude_booking: Option<u64>,
}

pub async fn check_availability(
    backend: &dyn BookingBackend,
    query: &AvailabilityQuery,
) -> Result<Availability> {
    let product = backend
        .product(query.product_id)
        .await?
        .filter(|p| p.bookable)
        .ok_or_else(|| {
            Error::Action(format!(
                "Product ID {} is not a booking product.",
                query.product_id
            ))
        })?;

    let booked: Vec<Booking> = backend
        .bookings_in_window(product.id, &query.window)
        .await?
        .into_iter()
        .filter(|b| b.holds_capacity())
        .filter(|b| Some(b.id) != query.exclude_booking)
        .filter(|b| query.window.overlaps(b.start, b.end))
        .collect();

    let remaining = if product.resources.is_empty() {
        remaining_capacity([(product.capacity, count(booked.len()))])
    } else {
        let resources: Vec<&BookableResource> = match query.resource_id {
            Some(rid) => product.resources.iter().filter(|r| r.id == rid).collect(),
            None => product.resources.iter().collect(),
        };
        if resources.is_empty() {
            return Err(Error::Action(format!(
                "Resource {} does not belong to {}.",
                query.resource_id.unwrap_or_default(),
                product.name
            )));
        }
        remaining_capacity(resources.iter().map(|r| {
            let taken = booked.iter().filter(|b| b.resource_id == Some(r.id)).count();
            (r.capacity.unwrap_or(product.capacity), count(taken))
        }))
    };

    Ok(Availability {
        product_name: product.name,
        remaining,
        available: remaining >= query.quantity,
    })
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
