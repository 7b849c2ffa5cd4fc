use chrono::{Days, NaiveDate};
use serde_json::{Map, Value};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fills in `start_date`/`end_date` from `date`, `start_date` and `duration`.
///
/// Rules, first match wins:
/// 1. neither `date` nor `start_date` present: unchanged
/// 2. `start_date` and `end_date` both set: unchanged
/// 3. `start_date` and `duration` (days): `end_date = start_date + duration`
/// 4. `date` set: `start_date = end_date = date`
/// 5. `start_date` set: `end_date = start_date`
///
/// Empty strings count as unset. Applying this twice changes nothing.
pub fn normalize_dates(mut params: Map<String, Value>) -> Map<String, Value> {
    if !params.contains_key("date") && !params.contains_key("start_date") {
        return params;
    }

    let start = non_empty(&params, "start_date");
    let end = non_empty(&params, "end_date");
    if start.is_some() && end.is_some() {
        return params;
    }

    if let Some(start) = &start {
        let shifted = duration_days(params.get("duration"))
            .and_then(|days| parse_date(start)?.checked_add_days(Days::new(days)));
        if let Some(end) = shifted {
            params.insert(
                "end_date".to_string(),
                Value::String(end.format(DATE_FORMAT).to_string()),
            );
            return params;
        }
    }

    if let Some(date) = non_empty(&params, "date") {
        params.insert("start_date".to_string(), Value::String(date.clone()));
        params.insert("end_date".to_string(), Value::String(date));
        return params;
    }

    if let Some(start) = start {
        params.insert("end_date".to_string(), Value::String(start));
    }
    params
}

/// Accepts `2025-03-01` as well as datetime strings starting with a date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()))
}

fn non_empty(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn duration_days(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn untouched_without_date_fields() {
        let params = map(json!({"product_id": 5, "end_date": "2025-01-02"}));
        assert_eq!(normalize_dates(params.clone()), params);
    }

    #[test]
    fn full_range_passes_through() {
        let params = map(json!({"start_date": "2025-01-01", "end_date": "2025-01-05", "duration": 9}));
        assert_eq!(normalize_dates(params.clone()), params);
    }

    #[test]
    fn duration_extends_start() {
        for n in [0_u64, 1, 3, 31, 365] {
            let out = normalize_dates(map(json!({"start_date": "2024-12-30", "duration": n})));
            let expected = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap() + Days::new(n);
            assert_eq!(
                out["end_date"],
                json!(expected.format(DATE_FORMAT).to_string()),
                "duration {n}"
            );
        }
    }

    #[test]
    fn duration_as_string() {
        let out = normalize_dates(map(json!({"start_date": "2025-02-27", "duration": "2"})));
        assert_eq!(out["end_date"], "2025-03-01");
    }

    #[test]
    fn single_date_sets_both_ends() {
        let out = normalize_dates(map(json!({"date": "2025-06-15"})));
        assert_eq!(out["start_date"], "2025-06-15");
        assert_eq!(out["end_date"], "2025-06-15");
    }

    #[test]
    fn start_only_copies_to_end() {
        let out = normalize_dates(map(json!({"start_date": "2025-06-15"})));
        assert_eq!(out["end_date"], "2025-06-15");
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let out = normalize_dates(map(json!({"date": "2025-06-15", "start_date": "", "end_date": ""})));
        assert_eq!(out["start_date"], "2025-06-15");
        assert_eq!(out["end_date"], "2025-06-15");
    }

    #[test]
    fn negative_duration_is_ignored() {
        let out = normalize_dates(map(json!({"start_date": "2025-06-15", "duration": -3})));
        assert_eq!(out["end_date"], "2025-06-15");
    }

    #[test]
    fn unparseable_start_with_duration_falls_back() {
        let out = normalize_dates(map(json!({"start_date": "next friday", "duration": 2})));
        assert_eq!(out["end_date"], "next friday");
    }

    #[test]
    fn idempotent() {
        let cases = [
            json!({"date": "2025-06-15"}),
            json!({"start_date": "2025-06-15"}),
            json!({"start_date": "2025-06-15", "duration": 4}),
            json!({"start_date": "2025-06-15", "end_date": "2025-06-16"}),
            json!({"product_id": 1}),
            json!({"date": ""}),
        ];
        for case in cases {
            let once = normalize_dates(map(case.clone()));
            let twice = normalize_dates(once.clone());
            assert_eq!(once, twice, "{case}");
        }
    }

    #[test]
    fn parse_date_accepts_datetimes() {
        assert_eq!(
            parse_date("2025-03-01 10:00:00"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_date("tomorrow"), None);
    }
}
