use chrono::NaiveDate;

/// Instruction sent with every action result.
pub const FEEDBACK_PREFIX: &str =
    "Here is the API result (in JSON). Summarize this result and display it in a clean, human-readable way:\n";

/// Sent when the assistant stalls after an action.
pub const NUDGE_MESSAGE: &str = "continue";

/// First message on a fresh thread: today's date, the store endpoints and
/// the reply formats that trigger actions.
pub fn priming_message(today: NaiveDate, store_base_url: &str, skill_actions: &[String]) -> String {
    let mut message = format!(
        "Today is {today}. Use this date to calculate 'tomorrow' or 'after tomorrow'.\n\n\
         WooCommerce API Base URL:\n\
         - {store_base_url}\n\n\
         Orders:\n\
         - List orders: GET {{base_url}}/wc/v3/orders\n\
         - Create order: POST {{base_url}}/wc/v3/orders\n\
         - Delete order: DELETE {{base_url}}/wc/v3/orders/{{id}}\n\n\
         Bookings:\n\
         - List bookings: GET {{base_url}}/wc-bookings/v1/bookings\n\
         - Create booking: POST {{base_url}}/wc-bookings/v1/bookings\n\
         - Delete booking: DELETE {{base_url}}/wc-bookings/v1/bookings/{{id}}\n\n\
         Products:\n\
         - List products: GET {{base_url}}/wc/v3/products\n\
         - Get product details: GET {{base_url}}/wc/v3/products/{{id}}\n\
         - Delete product: DELETE {{base_url}}/wc/v3/products/{{id}}\n\n\
         To call the API, reply with JSON only:\n\
         {{\"action\": \"woocommerce_request\", \"request\": {{\"method\": \"GET\", \"url\": \"{{base_url}}/wc/v3/orders\", \"headers\": {{}}, \"body\": null}}}}\n",
        today = today.format("%Y-%m-%d"),
    );

    if !skill_actions.is_empty() {
        message.push_str(
            "\nBooking actions (reply with JSON only, dates as YYYY-MM-DD; \
             use \"date\", or \"start_date\" with \"end_date\" or \"duration\" in days):\n",
        );
        for action in skill_actions {
            message.push_str(&format!("- {action}\n"));
        }
        message.push_str(
            "Example: {\"action\": \"woocommerce/check_availability\", \
             \"params\": {\"product_id\": 12, \"date\": \"2025-03-01\", \"quantity\": 1}}\n",
        );
    }
    message
}

pub fn feedback_message(result_json: &str) -> String {
    format!("{FEEDBACK_PREFIX}{result_json}")
}
