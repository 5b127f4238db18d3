//! M-Pesa STK callback envelope.
//!
//! The provider posts
//! `{"Body": {"stkCallback": {CheckoutRequestID, ResultCode, ResultDesc, CallbackMetadata?}}}`
//! once the customer answers (or ignores) the PIN prompt. Only the nested
//! `stkCallback` object matters; everything around it is ignored.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::ids::CheckoutRequestId;
use crate::payment::Settlement;

/// Metadata item name carrying the provider receipt number.
pub const RECEIPT_NUMBER_KEY: &str = "MpesaReceiptNumber";

/// The payload could not be read as an STK callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed callback: {0}")]
pub struct MalformedCallback(pub String);

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
    #[serde(rename = "stkCallback")]
    stk_callback: StkCallback,
}

/// The `stkCallback` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StkCallback {
    /// Merchant request id echoed by the provider.
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,

    /// Correlation id of the originating push.
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: CheckoutRequestId,

    /// Zero on success.
    #[serde(rename = "ResultCode")]
    pub result_code: ResultCode,

    /// Human-readable result.
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,

    /// Present only on success.
    #[serde(rename = "CallbackMetadata", default)]
    pub metadata: Option<CallbackMetadata>,
}

/// `CallbackMetadata` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallbackMetadata {
    /// Name/value pairs (amount, receipt, transaction date, phone).
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

/// One `{Name, Value}` metadata entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataItem {
    /// Item name, e.g. `MpesaReceiptNumber`.
    #[serde(rename = "Name")]
    pub name: String,

    /// Item value; numbers and strings both occur.
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

/// Result code, sent as a number by the provider and as a string by some
/// proxies and simulators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResultCode {
    /// Numeric form.
    Number(i64),
    /// String form.
    Text(String),
}

impl ResultCode {
    /// Whether this is the success code (zero).
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Number(code) => *code == 0,
            Self::Text(code) => code.trim().parse::<i64>().is_ok_and(|c| c == 0),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}

impl StkCallback {
    /// Extract the `stkCallback` object from a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedCallback` if the envelope or any required field is
    /// missing or has the wrong type.
    pub fn parse(payload: &Value) -> Result<Self, MalformedCallback> {
        Envelope::deserialize(payload)
            .map(|envelope| envelope.body.stk_callback)
            .map_err(|e| MalformedCallback(e.to_string()))
    }

    /// Receipt number from the metadata list, if the provider sent one.
    #[must_use]
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == RECEIPT_NUMBER_KEY)
            .and_then(|item| match item.value.as_ref()? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// The settlement this callback reports.
    #[must_use]
    pub fn settlement(&self, raw_callback: Value) -> Settlement {
        if self.result_code.is_success() {
            Settlement::Completed {
                reference: self.receipt_number(),
                raw_callback,
            }
        } else {
            Settlement::Failed {
                reason: self.result_desc.clone(),
                raw_callback,
            }
        }
    }
}
