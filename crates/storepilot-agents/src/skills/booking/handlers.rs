use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use storepilot_common::Error;
use tracing::info;

use super::{
    AvailabilityQuery, BOOKING_STATUSES, BookingBackend, BookingUpdate, BookingWindow,
    NewBooking, check_availability,
};
use crate::dates::parse_date;
use crate::dispatch::{ActionDispatcher, ActionHandler, ActionResult, missing_params, param_str, param_u64};

pub const CHECK_AVAILABILITY: &str = "woocommerce/check_availability";
pub const CREATE_BOOKING: &str = "woocommerce/create_booking";
pub const UPDATE_BOOKING: &str = "woocommerce/update_booking";
pub const CANCEL_BOOKING: &str = "woocommerce/cancel_booking";
pub const CHANGE_BOOKING_STATUS: &str = "woocommerce/change_booking_status";
pub const GET_BOOKING_DETAILS: &str = "woocommerce/get_booking_details";

const DEFAULT_STATUS: &str = "pending-confirmation";

/// Registers every booking action against `backend`.
pub fn register_booking_handlers(
    dispatcher: &mut ActionDispatcher,
    backend: Arc<dyn BookingBackend>,
) {
    dispatcher.register_handler(
        CHECK_AVAILABILITY,
        Arc::new(CheckAvailability {
            backend: backend.clone(),
        }),
    );
    dispatcher.register_handler(
        CREATE_BOOKING,
        Arc::new(CreateBooking {
            backend: backend.clone(),
        }),
    );
    dispatcher.register_handler(
        UPDATE_BOOKING,
        Arc::new(UpdateBooking {
            backend: backend.clone(),
        }),
    );
    dispatcher.register_handler(
        CANCEL_BOOKING,
        Arc::new(CancelBooking {
            backend: backend.clone(),
        }),
    );
    dispatcher.register_handler(
        CHANGE_BOOKING_STATUS,
        Arc::new(ChangeBookingStatus {
            backend: backend.clone(),
        }),
    );
    dispatcher.register_handler(GET_BOOKING_DETAILS, Arc::new(GetBookingDetails { backend }));
}

fn describe(e: &Error) -> String {
    match e {
        Error::Action(message) => message.clone(),
        other => other.to_string(),
    }
}

fn window_from(params: &Map<String, Value>) -> Result<BookingWindow, String> {
    let date = |key: &str| {
        let raw = param_str(params, key).ok_or_else(|| format!("Missing {key}."))?;
        parse_date(&raw).ok_or_else(|| format!("Invalid {key} '{raw}', expected YYYY-MM-DD."))
    };
    let start = date("start_date")?;
    let end = date("end_date")?;
    BookingWindow::new(start, end).map_err(|e| describe(&e))
}

fn quantity(params: &Map<String, Value>) -> u32 {
    param_u64(params, "quantity")
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

// ---------------------------------------------------------------------------
// check_availability
// ---------------------------------------------------------------------------

struct CheckAvailability {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for CheckAvailability {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        if !missing_params(params, &["product_id", "start_date"]).is_empty() {
            return ActionResult::failure("Missing required parameters: product_id and date.");
        }
        let Some(product_id) = param_u64(params, "product_id") else {
            return ActionResult::failure("product_id must be a positive integer.");
        };
        let window = match window_from(params) {
            Ok(w) => w,
            Err(message) => return ActionResult::failure(message),
        };

        let query = AvailabilityQuery {
            product_id,
            window,
            resource_id: param_u64(params, "resource_id"),
            quantity: quantity(params),
            exclude_booking: None,
        };
        match check_availability(self.backend.as_ref(), &query).await {
            Ok(a) if a.available => ActionResult::ok(json!({
                "available": true,
                "count": a.remaining,
                "message": format!(
                    "Available slots for {} {}: {}.",
                    a.product_name,
                    window.describe(),
                    a.remaining
                ),
            })),
            Ok(a) => ActionResult::ok(json!({
                "available": false,
                "count": a.remaining,
                "message": format!("No availability for {} {}.", a.product_name, window.describe()),
            })),
            Err(e) => ActionResult::failure(describe(&e)),
        }
    }
}

// ---------------------------------------------------------------------------
// create_booking
// ---------------------------------------------------------------------------

struct CreateBooking {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for CreateBooking {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        if !missing_params(params, &["product_id", "start_date", "end_date"]).is_empty() {
            return ActionResult::failure("Missing required parameters: product_id and dates.");
        }
        let Some(product_id) = param_u64(params, "product_id") else {
            return ActionResult::failure("product_id must be a positive integer.");
        };
        let window = match window_from(params) {
            Ok(w) => w,
            Err(message) => return ActionResult::failure(message),
        };
        let resource_id = param_u64(params, "resource_id");

        // Capacity may have been taken since the assistant last checked.
        let query = AvailabilityQuery {
            product_id,
            window,
            resource_id,
            quantity: quantity(params),
            exclude_booking: None,
        };
        let availability = match check_availability(self.backend.as_ref(), &query).await {
            Ok(a) => a,
            Err(e) => return ActionResult::failure(describe(&e)),
        };
        if !availability.available {
            return ActionResult::failure(format!(
                "No availability for {}. Booking not created.",
                availability.product_name
            ));
        }

        let mut customer_id = param_u64(params, "customer_id").unwrap_or(0);
        if customer_id == 0 {
            if let Some(email) = param_str(params, "email") {
                match self.backend.customer_by_email(&email).await {
                    Ok(Some(id)) => customer_id = id,
                    Ok(None) => info!("no customer found for {email}, booking as guest"),
                    Err(e) => return ActionResult::failure(format!("Error looking up customer: {}", describe(&e))),
                }
            }
        }

        let status = param_str(params, "status").unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let draft = NewBooking {
            product_id,
            resource_id,
            window,
            status,
            customer_id,
        };
        match self.backend.create_booking(&draft).await {
            Ok(booking) => ActionResult::ok(json!({
                "booking_id": booking.id,
                "status": booking.status,
                "message": format!(
                    "Booking #{} created for {} {}.",
                    booking.id,
                    availability.product_name,
                    window.describe()
                ),
            })),
            Err(e) => ActionResult::failure(format!("Error creating booking: {}", describe(&e))),
        }
    }
}

// ---------------------------------------------------------------------------
// update / cancel / status / details
// ---------------------------------------------------------------------------

struct UpdateBooking {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for UpdateBooking {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        let Some(booking_id) = param_u64(params, "booking_id") else {
            return ActionResult::failure("Missing required parameter: booking_id.");
        };
        let existing = match self.backend.booking(booking_id).await {
            Ok(Some(b)) => b,
            Ok(None) => return ActionResult::failure(format!("Booking #{booking_id} not found.")),
            Err(e) => return ActionResult::failure(describe(&e)),
        };

        let window = if param_str(params, "start_date").is_some() {
            match window_from(params) {
                Ok(w) => Some(w),
                Err(message) => return ActionResult::failure(message),
            }
        } else {
            None
        };
        let status = param_str(params, "status");
        if let Some(status) = &status {
            if !BOOKING_STATUSES.contains(&status.as_str()) {
                return ActionResult::failure(invalid_status(status));
            }
        }
        let resource_id = param_u64(params, "resource_id");

        if window.is_none() && status.is_none() && resource_id.is_none() {
            return ActionResult::failure(
                "Nothing to update: provide new dates, status or resource_id.",
            );
        }

        if let Some(window) = window {
            let query = AvailabilityQuery {
                product_id: existing.product_id,
                window,
                resource_id: resource_id.or(existing.resource_id),
                quantity: 1,
                exclude_booking: Some(booking_id),
            };
            match check_availability(self.backend.as_ref(), &query).await {
                Ok(a) if a.available => {}
                Ok(a) => {
                    return ActionResult::failure(format!(
                        "No availability for {} {}. Booking not updated.",
                        a.product_name,
                        window.describe()
                    ));
                }
                Err(e) => return ActionResult::failure(describe(&e)),
            }
        }

        let update = BookingUpdate {
            status,
            window,
            resource_id,
        };
        match self.backend.update_booking(booking_id, &update).await {
            Ok(booking) => ActionResult::ok(json!({
                "booking": booking,
                "message": format!("Booking #{booking_id} updated."),
            })),
            Err(e) => ActionResult::failure(format!("Error updating booking: {}", describe(&e))),
        }
    }
}

struct CancelBooking {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for CancelBooking {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        let Some(booking_id) = param_u64(params, "booking_id") else {
            return ActionResult::failure("Missing required parameter: booking_id.");
        };
        match self.backend.booking(booking_id).await {
            Ok(Some(b)) if b.status == "cancelled" => {
                return ActionResult::ok(json!({
                    "booking_id": booking_id,
                    "status": "cancelled",
                    "message": format!("Booking #{booking_id} was already cancelled."),
                }));
            }
            Ok(Some(_)) => {}
            Ok(None) => return ActionResult::failure(format!("Booking #{booking_id} not found.")),
            Err(e) => return ActionResult::failure(describe(&e)),
        }
        set_status(self.backend.as_ref(), booking_id, "cancelled").await
    }
}

struct ChangeBookingStatus {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for ChangeBookingStatus {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        if !missing_params(params, &["booking_id", "status"]).is_empty() {
            return ActionResult::failure("Missing required parameters: booking_id and status.");
        }
        let Some(booking_id) = param_u64(params, "booking_id") else {
            return ActionResult::failure("booking_id must be a positive integer.");
        };
        let status = param_str(params, "status").unwrap_or_default();
        if !BOOKING_STATUSES.contains(&status.as_str()) {
            return ActionResult::failure(invalid_status(&status));
        }
        match self.backend.booking(booking_id).await {
            Ok(Some(_)) => set_status(self.backend.as_ref(), booking_id, &status).await,
            Ok(None) => ActionResult::failure(format!("Booking #{booking_id} not found.")),
            Err(e) => ActionResult::failure(describe(&e)),
        }
    }
}

struct GetBookingDetails {
    backend: Arc<dyn BookingBackend>,
}

#[async_trait]
impl ActionHandler for GetBookingDetails {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        let Some(booking_id) = param_u64(params, "booking_id") else {
            return ActionResult::failure("Missing required parameter: booking_id.");
        };
        match self.backend.booking(booking_id).await {
            Ok(Some(booking)) => ActionResult::ok(json!({ "booking": booking })),
            Ok(None) => ActionResult::failure(format!("Booking #{booking_id} not found.")),
            Err(e) => ActionResult::failure(describe(&e)),
        }
    }
}

async fn set_status(backend: &dyn BookingBackend, booking_id: u64, status: &str) -> ActionResult {
    let update = BookingUpdate {
        status: Some(status.to_string()),
        ..Default::default()
    };
    match backend.update_booking(booking_id, &update).await {
        Ok(booking) => ActionResult::ok(json!({
            "booking_id": booking.id,
            "status": booking.status,
            "message": format!("Booking #{} is now {}.", booking.id, booking.status),
        })),
        Err(e) => ActionResult::failure(format!("Error updating booking: {}", describe(&e))),
    }
}

fn invalid_status(status: &str) -> String {
    format!(
        "Invalid status '{status}'. Use one of: {}.",
        BOOKING_STATUSES.join(", ")
    )
}
