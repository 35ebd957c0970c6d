//! Booking tools
//!
//! Stand-ins for real reservation systems: each returns a confirmation
//! string and has no side effects.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::function_tool;
use crate::tool::Tool;

pub const FLIGHT_TOOL_NAME: &str = "lmx_book_flight_tool_05";
pub const HOTEL_TOOL_NAME: &str = "lmx_book_hotel_tool_05";

/// Book a flight
pub fn book_flight(from_airport: &str, to_airport: &str) -> String {
    format!(
        "Successfully booked a flight from {} to {}.",
        from_airport, to_airport
    )
}

/// Book a hotel
pub fn book_hotel(hotel_name: &str) -> String {
    format!("Successfully booked a stay at {}.", hotel_name)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookFlightArgs {
    pub from_airport: String,
    pub to_airport: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookHotelArgs {
    pub hotel_name: String,
}

pub fn flight_tool() -> Arc<dyn Tool> {
    function_tool!(
        FLIGHT_TOOL_NAME,
        "Books a flight from one airport to another.",
        |args: BookFlightArgs| book_flight(&args.from_airport, &args.to_airport)
    )
}

pub fn hotel_tool() -> Arc<dyn Tool> {
    function_tool!(
        HOTEL_TOOL_NAME,
        "Books a hotel stay.",
        |args: BookHotelArgs| book_hotel(&args.hotel_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_confirmations() {
        assert_eq!(
            book_flight("San Jose", "Boston"),
            "Successfully booked a flight from San Jose to Boston."
        );
        assert_eq!(
            book_hotel("Hyatt Hotel"),
            "Successfully booked a stay at Hyatt Hotel."
        );
    }

    #[test]
    fn test_empty_arguments_are_not_validated() {
        assert_eq!(book_hotel(""), "Successfully booked a stay at .");
    }

    #[test]
    fn test_tool_registration() {
        let flight = flight_tool();
        assert_eq!(flight.name(), "lmx_book_flight_tool_05");
        assert_eq!(
            flight.description(),
            "Books a flight from one airport to another."
        );
        assert_eq!(
            flight.parameters_schema()["required"],
            json!(["from_airport", "to_airport"])
        );

        let hotel = hotel_tool();
        assert_eq!(hotel.name(), "lmx_book_hotel_tool_05");
        assert_eq!(hotel.description(), "Books a hotel stay.");
    }

    #[tokio::test]
    async fn test_flight_tool_execution() {
        let result = flight_tool()
            .execute(json!({"from_airport": "San Jose", "to_airport": "Boston"}))
            .await
            .unwrap();
        assert_eq!(
            result.to_reply(),
            "Successfully booked a flight from San Jose to Boston."
        );
    }

    #[tokio::test]
    async fn test_hotel_tool_missing_argument() {
        let result = hotel_tool().execute(json!({})).await.unwrap();
        assert!(result.is_error());
        assert!(result
            .to_reply()
            .contains("invalid arguments for lmx_book_hotel_tool_05"));
    }
}
