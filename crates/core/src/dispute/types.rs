//! Dispute domain types.

use serde::{Deserialize, Serialize};

/// Lifecycle of a chargeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Opened by the gateway; evidence not yet submitted.
    NeedsResponse,
    /// Evidence submitted, or a resolution attempt needs operator attention.
    UnderReview,
    /// Platform kept the funds.
    Won,
    /// Funds returned to the cardholder.
    Lost,
}

impl DisputeStatus {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NeedsResponse => "needs_response",
            Self::UnderReview => "under_review",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Returns true while the dispute is undecided.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::NeedsResponse | Self::UnderReview)
    }

    /// Maps a gateway-reported status onto a local status.
    ///
    /// Recognises the vocabularies of Stripe (`warning_needs_response`,
    /// `under_review`, `won`, `lost`), Razorpay (`open`, `under_review`,
    /// `won`, `lost`) and PayPal (`WAITING_FOR_SELLER_RESPONSE`,
    /// `UNDER_REVIEW`, `RESOLVED` outcomes).
    #[must_use]
    pub fn from_gateway(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "won" | "resolved_seller_favour" | "resolved_in_seller_favor" => Some(Self::Won),
            "lost" | "resolved_buyer_favour" | "resolved_in_buyer_favor" | "charge_refunded" => {
                Some(Self::Lost)
            }
            "under_review" | "warning_under_review" => Some(Self::UnderReview),
            "needs_response"
            | "warning_needs_response"
            | "open"
            | "waiting_for_seller_response" => Some(Self::NeedsResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final decision on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    /// Platform kept the funds.
    Won,
    /// Funds must be reclaimed from the payee.
    Lost,
}

impl DisputeOutcome {
    /// Status the dispute ends in.
    #[must_use]
    pub const fn status(self) -> DisputeStatus {
        match self {
            Self::Won => DisputeStatus::Won,
            Self::Lost => DisputeStatus::Lost,
        }
    }
}
