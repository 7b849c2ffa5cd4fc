use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use storepilot_common::{Error, Result};
use tracing::debug;

use super::{
    BookableProduct, BookableResource, Booking, BookingBackend, BookingUpdate, BookingWindow,
    NewBooking,
};
use crate::executor::{ApiExecutor, BASE_URL_PLACEHOLDER, ExecutionOutcome, HttpRequestSpec};

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 20;

/// WooCommerce Bookings REST endpoints, called through the store executor.
pub struct RestBookingBackend {
    executor: Arc<dyn ApiExecutor>,
}

impl RestBookingBackend {
    pub fn new(executor: Arc<dyn ApiExecutor>) -> Self {
        Self { executor }
    }

    async fn call(&self, method: &str, path: &str, body: Option<Value>) -> Result<Option<Value>> {
        let mut request = HttpRequestSpec::new(method, format!("{BASE_URL_PLACEHOLDER}{path}"));
        request.body = body;
        let outcome = self.executor.execute(&request).await;
        interpret(outcome)
    }

    async fn resource(&self, resource_id: u64) -> Result<Option<BookableResource>> {
        let Some(body) = self
            .call("GET", &format!("/wc-bookings/v1/resources/{resource_id}"), None)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(BookableResource {
            id: resource_id,
            name: str_field(&body, "name"),
            capacity: u64_field(&body, "qty").and_then(|q| u32::try_from(q).ok()),
        }))
    }
}

fn interpret(outcome: ExecutionOutcome) -> Result<Option<Value>> {
    match outcome.status {
        0 => Err(Error::Transport(
            outcome.body["error"]
                .as_str()
                .unwrap_or("store request failed")
                .to_string(),
        )),
        404 => Ok(None),
        s if (200..300).contains(&s) => Ok(Some(outcome.body)),
        status => Err(Error::Api {
            status,
            body: outcome.body["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| outcome.body.to_string()),
        }),
    }
}

fn u64_field(body: &Value, key: &str) -> Option<u64> {
    match body.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_booking(body: &Value) -> Result<Booking> {
    let id = u64_field(body, "id")
        .ok_or_else(|| Error::Transport(format!("booking without id: {body}")))?;
    Ok(Booking {
        id,
        product_id: u64_field(body, "product_id").unwrap_or_default(),
        resource_id: u64_field(body, "resource_id").filter(|r| *r > 0),
        status: str_field(body, "status"),
        start: i64_field(body, "start").unwrap_or_default(),
        end: i64_field(body, "end").unwrap_or_default(),
        customer_id: u64_field(body, "customer_id").unwrap_or_default(),
    })
}

#[async_trait]
impl BookingBackend for RestBookingBackend {
    async fn product(&self, product_id: u64) -> Result<Option<BookableProduct>> {
        let Some(body) = self
            .call("GET", &format!("/wc-bookings/v1/products/{product_id}"), None)
            .await?
        else {
            return Ok(None);
        };

        let bookable = body
            .get("type")
            .and_then(Value::as_str)
            .is_none_or(|t| t == "booking");
        let capacity = u64_field(&body, "qty")
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);

        let resource_ids: Vec<u64> = body
            .get("resource_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
                    .collect()
            })
            .unwrap_or_default();
        let mut resources = Vec::with_capacity(resource_ids.len());
        for rid in resource_ids {
            match self.resource(rid).await? {
                Some(resource) => resources.push(resource),
                None => debug!("resource {rid} of product {product_id} not found"),
            }
        }

        Ok(Some(BookableProduct {
            id: product_id,
            name: str_field(&body, "name"),
            bookable,
            capacity,
            resources,
        }))
    }

    async fn bookings_in_window(
        &self,
        product_id: u64,
        window: &BookingWindow,
    ) -> Result<Vec<Booking>> {
        let mut found = Vec::new();
        for page in 1..=MAX_PAGES {
            let path = format!(
                "/wc-bookings/v1/bookings?product_id={product_id}&per_page={PAGE_SIZE}&page={page}"
            );
            let Some(body) = self.call("GET", &path, None).await? else {
                break;
            };
            let items = body.as_array().cloned().unwrap_or_default();
            let last_page = items.len() < PAGE_SIZE;
            for item in &items {
                let booking = parse_booking(item)?;
                if booking.product_id == product_id && window.overlaps(booking.start, booking.end)
                {
                    found.push(booking);
                }
            }
            if last_page {
                break;
            }
        }
        Ok(found)
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<u64>> {
        let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
        let body = self
            .call("GET", &format!("/wc/v3/customers?email={encoded}"), None)
            .await?;
        Ok(body
            .as_ref()
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(|c| u64_field(c, "id")))
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking> {
        let mut payload = Map::new();
        payload.insert("product_id".into(), json!(booking.product_id));
        if let Some(rid) = booking.resource_id {
            payload.insert("resource_id".into(), json!(rid));
        }
        payload.insert("start".into(), json!(booking.window.start_timestamp()));
        payload.insert("end".into(), json!(booking.window.end_timestamp()));
        payload.insert("all_day".into(), json!(true));
        payload.insert("status".into(), json!(booking.status));
        payload.insert("customer_id".into(), json!(booking.customer_id));

        let body = self
            .call("POST", "/wc-bookings/v1/bookings", Some(Value::Object(payload)))
            .await?
            .ok_or_else(|| Error::Action("booking endpoint not found".to_string()))?;
        parse_booking(&body)
    }

    async fn booking(&self, booking_id: u64) -> Result<Option<Booking>> {
        self.call("GET", &format!("/wc-bookings/v1/bookings/{booking_id}"), None)
            .await?
            .map(|body| parse_booking(&body))
            .transpose()
    }

    async fn update_booking(&self, booking_id: u64, update: &BookingUpdate) -> Result<Booking> {
        let mut payload = Map::new();
        if let Some(status) = &update.status {
            payload.insert("status".into(), json!(status));
        }
        if let Some(window) = &update.window {
            payload.insert("start".into(), json!(window.start_timestamp()));
            payload.insert("end".into(), json!(window.end_timestamp()));
        }
        if let Some(rid) = update.resource_id {
            payload.insert("resource_id".into(), json!(rid));
        }

        let body = self
            .call(
                "PUT",
                &format!("/wc-bookings/v1/bookings/{booking_id}"),
                Some(Value::Object(payload)),
            )
            .await?
            .ok_or_else(|| Error::Action(format!("Booking #{booking_id} not found.")))?;
        parse_booking(&body)
    }
}
