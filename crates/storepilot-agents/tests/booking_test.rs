use std::sync::Arc;

use serde_json::{Map, Value, json};
use storepilot_agents::ActionDispatcher;
use storepilot_agents::skills::booking::{
    BookableProduct, BookableResource, CANCEL_BOOKING, CHANGE_BOOKING_STATUS, CHECK_AVAILABILITY,
    CREATE_BOOKING, GET_BOOKING_DETAILS, InMemoryBookingBackend, UPDATE_BOOKING,
};
use storepilot_agents::skills::register_booking_handlers;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn kayak(capacity: u32) -> BookableProduct {
    BookableProduct {
        id: 12,
        name: "Kayak Tour".to_string(),
        bookable: true,
        capacity,
        resources: vec![],
    }
}

fn setup(product: BookableProduct) -> (ActionDispatcher, Arc<InMemoryBookingBackend>) {
    let backend = Arc::new(InMemoryBookingBackend::new());
    backend.add_product(product).unwrap();
    let mut dispatcher = ActionDispatcher::new();
    register_booking_handlers(&mut dispatcher, backend.clone());
    (dispatcher, backend)
}

#[tokio::test]
async fn test_all_booking_actions_registered() {
    let (dispatcher, _) = setup(kayak(1));
    for id in [
        CHECK_AVAILABILITY,
        CREATE_BOOKING,
        UPDATE_BOOKING,
        CANCEL_BOOKING,
        CHANGE_BOOKING_STATUS,
        GET_BOOKING_DETAILS,
    ] {
        assert!(dispatcher.has_handler(id), "{id} missing");
    }
}

#[tokio::test]
async fn test_check_availability_with_full_capacity() {
    let (dispatcher, _) = setup(kayak(4));
    let result = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.data["available"], true);
    assert_eq!(result.data["count"], 4);
    assert_eq!(
        result.data["message"],
        "Available slots for Kayak Tour from Mar 1, 2025 to Mar 1, 2025: 4."
    );
}

#[tokio::test]
async fn test_check_availability_requires_product_and_date() {
    let (dispatcher, _) = setup(kayak(4));
    let result = dispatcher
        .dispatch(CHECK_AVAILABILITY, params(json!({"product_id": 12})))
        .await;

    assert!(!result.success);
    assert_eq!(result.data, "Missing required parameters: product_id and date.");
}

#[tokio::test]
async fn test_check_availability_rejects_non_booking_product() {
    let mut product = kayak(4);
    product.bookable = false;
    let (dispatcher, _) = setup(product);
    let result = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.data, "Product ID 12 is not a booking product.");
}

#[tokio::test]
async fn test_duration_extends_the_window() {
    let (dispatcher, backend) = setup(kayak(1));
    let created = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({"product_id": 12, "start_date": "2025-03-01", "duration": "3"})),
        )
        .await;
    assert!(created.success, "{:?}", created.data);
    assert_eq!(
        created.data["message"],
        format!(
            "Booking #{} created for Kayak Tour from Mar 1, 2025 to Mar 4, 2025.",
            created.data["booking_id"]
        )
    );

    // Day three of the stay is taken; the day after it is not.
    let busy = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-03"})),
        )
        .await;
    assert_eq!(busy.data["available"], false);

    let free = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-05"})),
        )
        .await;
    assert_eq!(free.data["available"], true);
    assert_eq!(backend.bookings().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_refused_when_capacity_taken_meanwhile() {
    let (dispatcher, backend) = setup(kayak(1));
    let request = json!({"product_id": 12, "date": "2025-03-01"});

    let check = dispatcher
        .dispatch(CHECK_AVAILABILITY, params(request.clone()))
        .await;
    assert_eq!(check.data["available"], true);

    let first = dispatcher.dispatch(CREATE_BOOKING, params(request.clone())).await;
    assert!(first.success);

    let second = dispatcher.dispatch(CREATE_BOOKING, params(request)).await;
    assert!(!second.success);
    assert_eq!(
        second.data,
        "No availability for Kayak Tour. Booking not created."
    );
    assert_eq!(backend.bookings().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_resolves_customer_by_email() {
    let (dispatcher, backend) = setup(kayak(2));
    backend.add_customer("ana@example.com", 77).unwrap();

    let result = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({
                "product_id": 12,
                "date": "2025-06-10",
                "email": "Ana@Example.com"
            })),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.data["status"], "pending-confirmation");
    let bookings = backend.bookings().unwrap();
    assert_eq!(bookings[0].customer_id, 77);
}

#[tokio::test]
async fn test_resource_capacity_is_summed() {
    let mut product = kayak(1);
    product.resources = vec![
        BookableResource {
            id: 100,
            name: "Single".to_string(),
            capacity: Some(1),
        },
        BookableResource {
            id: 101,
            name: "Double".to_string(),
            capacity: Some(2),
        },
    ];
    let (dispatcher, _) = setup(product);

    let booked = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({"product_id": 12, "date": "2025-03-01", "resource_id": 101})),
        )
        .await;
    assert!(booked.success);

    let all = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;
    assert_eq!(all.data["count"], 2);

    let unknown = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01", "resource_id": 5})),
        )
        .await;
    assert!(!unknown.success);
}

#[tokio::test]
async fn test_cancel_frees_capacity() {
    let (dispatcher, _) = setup(kayak(1));
    let created = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;
    let booking_id = created.data["booking_id"].as_u64().unwrap();

    let cancelled = dispatcher
        .dispatch(CANCEL_BOOKING, params(json!({"booking_id": booking_id})))
        .await;
    assert!(cancelled.success);
    assert_eq!(cancelled.data["status"], "cancelled");

    let again = dispatcher
        .dispatch(CANCEL_BOOKING, params(json!({"booking_id": booking_id})))
        .await;
    assert!(again.success);
    assert!(
        again.data["message"]
            .as_str()
            .unwrap()
            .contains("already cancelled")
    );

    let check = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;
    assert_eq!(check.data["available"], true);
}

#[tokio::test]
async fn test_update_moves_booking_without_counting_itself() {
    let (dispatcher, backend) = setup(kayak(1));
    let created = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({"product_id": 12, "start_date": "2025-03-01", "end_date": "2025-03-02"})),
        )
        .await;
    let booking_id = created.data["booking_id"].as_u64().unwrap();

    // Overlaps its own current window on 2025-03-02.
    let moved = dispatcher
        .dispatch(
            UPDATE_BOOKING,
            params(json!({"booking_id": booking_id, "start_date": "2025-03-02", "duration": 1})),
        )
        .await;
    assert!(moved.success, "{:?}", moved.data);

    let booking = &backend.bookings().unwrap()[0];
    let check = dispatcher
        .dispatch(
            CHECK_AVAILABILITY,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;
    assert_eq!(check.data["available"], true);
    assert_eq!(booking.end - booking.start, 2 * 86_400);
}

#[tokio::test]
async fn test_change_status_and_details() {
    let (dispatcher, _) = setup(kayak(1));
    let created = dispatcher
        .dispatch(
            CREATE_BOOKING,
            params(json!({"product_id": 12, "date": "2025-03-01"})),
        )
        .await;
    let booking_id = created.data["booking_id"].as_u64().unwrap();

    let invalid = dispatcher
        .dispatch(
            CHANGE_BOOKING_STATUS,
            params(json!({"booking_id": booking_id, "status": "shipped"})),
        )
        .await;
    assert!(!invalid.success);

    let confirmed = dispatcher
        .dispatch(
            CHANGE_BOOKING_STATUS,
            params(json!({"booking_id": booking_id, "status": "confirmed"})),
        )
        .await;
    assert!(confirmed.success);

    let details = dispatcher
        .dispatch(GET_BOOKING_DETAILS, params(json!({"booking_id": booking_id})))
        .await;
    assert!(details.success);
    assert_eq!(details.data["booking"]["status"], "confirmed");
    assert_eq!(details.data["booking"]["product_id"], 12);

    let missing = dispatcher
        .dispatch(GET_BOOKING_DETAILS, params(json!({"booking_id": 999})))
        .await;
    assert_eq!(missing.data, "Booking #999 not found.");
}
