//! Daraja API types.

use goalhub_core::ResultCode;
use serde::{Deserialize, Deserializer, Serialize};

/// Transaction type for paybill pushes.
pub const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Account reference shown on the customer's prompt.
pub const ACCOUNT_REFERENCE: &str = "GoalHub";

/// Transaction description sent with each push.
pub const TRANSACTION_DESC: &str = "Turf Booking";

/// Response code the provider uses for an accepted push.
pub const ACCEPTED_RESPONSE_CODE: &str = "0";

/// OAuth token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds. Daraja sends this as a string.
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    /// Token lifetime in seconds, if the provider sent a usable one.
    #[must_use]
    pub fn expires_in_seconds(&self) -> Option<u64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// STK push request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    /// Paybill shortcode.
    pub business_short_code: String,
    /// `base64(shortcode + passkey + timestamp)`.
    pub password: String,
    /// `YYYYMMDDHHMMSS` in East Africa Time.
    pub timestamp: String,
    /// Always [`TRANSACTION_TYPE`].
    pub transaction_type: String,
    /// Whole shillings.
    pub amount: i64,
    /// Paying subscriber.
    pub party_a: String,
    /// Receiving shortcode.
    pub party_b: String,
    /// Subscriber to prompt.
    pub phone_number: String,
    /// Where the provider posts the result.
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    /// Shown on the customer's prompt.
    pub account_reference: String,
    /// Free text.
    pub transaction_desc: String,
}

/// STK push acknowledgment.
///
/// Returned to the caller of the initiation endpoint unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushResponse {
    /// Provider merchant request id.
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    /// Correlation id echoed back in the callback.
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// `"0"` when the push was accepted. Daraja sends either a string or a
    /// number; both are kept in string form.
    #[serde(rename = "ResponseCode", deserialize_with = "code_as_string")]
    pub response_code: String,
    /// Human-readable status.
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    /// Message intended for the customer.
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

impl StkPushResponse {
    /// Whether the provider accepted the push.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        let code = self.response_code.trim();
        code == ACCEPTED_RESPONSE_CODE || code.parse::<i64>().is_ok_and(|c| c == 0)
    }
}

fn code_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    ResultCode::deserialize(deserializer).map(|code| code.to_string())
}

/// Daraja error body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarajaErrorResponse {
    /// Provider request id.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Provider error code, e.g. `400.002.02`.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Provider error message.
    #[serde(default)]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expires_in_accepts_string_or_number() {
        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "t", "expires_in": "3599"})).unwrap();
        assert_eq!(token.expires_in_seconds(), Some(3599));

        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "t", "expires_in": 120})).unwrap();
        assert_eq!(token.expires_in_seconds(), Some(120));

        let token: TokenResponse = serde_json::from_value(json!({"access_token": "t"})).unwrap();
        assert_eq!(token.expires_in_seconds(), None);
    }

    #[test]
    fn push_request_uses_daraja_field_names() {
        let body = serde_json::to_value(StkPushRequest {
            business_short_code: "174379".into(),
            password: "pw".into(),
            timestamp: "20260101120000".into(),
            transaction_type: TRANSACTION_TYPE.into(),
            amount: 1500,
            party_a: "254712345678".into(),
            party_b: "174379".into(),
            phone_number: "254712345678".into(),
            callback_url: "https://api.goalhub.co.ke/api/callback".into(),
            account_reference: ACCOUNT_REFERENCE.into(),
            transaction_desc: TRANSACTION_DESC.into(),
        })
        .unwrap();

        assert_eq!(body["BusinessShortCode"], "174379");
        assert_eq!(body["CallBackURL"], "https://api.goalhub.co.ke/api/callback");
        assert_eq!(body["PartyA"], "254712345678");
        assert_eq!(body["TransactionType"], "CustomerPayBillOnline");
        assert_eq!(body["Amount"], 1500);
    }

    #[test]
    fn acceptance_is_response_code_zero() {
        let response: StkPushResponse = serde_json::from_value(json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing",
            "CustomerMessage": "Success. Request accepted for processing"
        }))
        .unwrap();
        assert!(response.is_accepted());

        let rejected = StkPushResponse {
            response_code: "1".into(),
            ..response
        };
        assert!(!rejected.is_accepted());
    }

    #[test]
    fn numeric_response_code_is_accepted() {
        let response: StkPushResponse = serde_json::from_value(json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": 0,
            "ResponseDescription": "Success. Request accepted for processing"
        }))
        .unwrap();
        assert_eq!(response.response_code, "0");
        assert!(response.is_accepted());

        let rejected: StkPushResponse = serde_json::from_value(json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": 1
        }))
        .unwrap();
        assert!(!rejected.is_accepted());
    }
}
