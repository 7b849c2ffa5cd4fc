use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use storepilot_common::{Error, Result};

use super::{BookableProduct, Booking, BookingBackend, BookingUpdate, BookingWindow, NewBooking};

/// Process-local catalogue and booking book, for tests and demos.
#[derive(Default)]
pub struct InMemoryBookingBackend {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    products: HashMap<u64, BookableProduct>,
    customers: HashMap<String, u64>,
    bookings: Vec<Booking>,
    next_id: u64,
}

impl InMemoryBookingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Database("booking state lock poisoned".to_string()))
    }

    pub fn add_product(&self, product: BookableProduct) -> Result<()> {
        self.state()?.products.insert(product.id, product);
        Ok(())
    }

    pub fn add_customer(&self, email: &str, customer_id: u64) -> Result<()> {
        self.state()?
            .customers
            .insert(email.to_ascii_lowercase(), customer_id);
        Ok(())
    }

    pub fn bookings(&self) -> Result<Vec<Booking>> {
        Ok(self.state()?.bookings.clone())
    }

    fn insert(state: &mut State, booking: &NewBooking) -> Booking {
        state.next_id += 1;
        let created = Booking {
            id: state.next_id,
            product_id: booking.product_id,
            resource_id: booking.resource_id,
            status: booking.status.clone(),
            start: booking.window.start_timestamp(),
            end: booking.window.end_timestamp(),
            customer_id: booking.customer_id,
        };
        state.bookings.push(created.clone());
        created
    }
}

#[async_trait]
impl BookingBackend for InMemoryBookingBackend {
    async fn product(&self, product_id: u64) -> Result<Option<BookableProduct>> {
        Ok(self.state()?.products.get(&product_id).cloned())
    }

    async fn bookings_in_window(
        &self,
        product_id: u64,
        window: &BookingWindow,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .state()?
            .bookings
            .iter()
            .filter(|b| b.product_id == product_id && window.overlaps(b.start, b.end))
            .cloned()
            .collect())
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<u64>> {
        Ok(self
            .state()?
            .customers
            .get(&email.to_ascii_lowercase())
            .copied())
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking> {
        let mut state = self.state()?;
        if !state.products.contains_key(&booking.product_id) {
            return Err(Error::Action(format!(
                "Product ID {} does not exist.",
                booking.product_id
            )));
        }
        Ok(Self::insert(&mut state, booking))
    }

    async fn booking(&self, booking_id: u64) -> Result<Option<Booking>> {
        Ok(self
            .state()?
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned())
    }

    async fn update_booking(&self, booking_id: u64, update: &BookingUpdate) -> Result<Booking> {
        let mut state = self.state()?;
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| Error::Action(format!("Booking #{booking_id} not found.")))?;
        if let Some(status) = &update.status {
            booking.status = status.clone();
        }
        if let Some(window) = &update.window {
            booking.start = window.start_timestamp();
            booking.end = window.end_timestamp();
        }
        if let Some(resource_id) = update.resource_id {
            booking.resource_id = Some(resource_id);
        }
        Ok(booking.clone())
    }
}
