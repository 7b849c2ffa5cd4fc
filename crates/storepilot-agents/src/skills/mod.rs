pub mod booking;

pub use booking::{BookingBackend, register_booking_handlers};
