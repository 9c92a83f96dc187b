//! Payment, refund and payout domain types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// External payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    /// Stripe
    Stripe,
    /// PayPal
    Paypal,
    /// Razorpay
    Razorpay,
    /// UPI
    Upi,
}

impl Gateway {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
            Self::Razorpay => "razorpay",
            Self::Upi => "upi",
        }
    }
}

impl std::fmt::Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gateway {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            "razorpay" => Ok(Self::Razorpay),
            "upi" => Ok(Self::Upi),
            _ => Err(format!("Unknown gateway: {s}")),
        }
    }
}

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Returns the database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Lifecycle of a gateway payment.
    PaymentStatus {
        /// Created locally, not yet confirmed.
        Pending => "pending",
        /// Gateway is processing.
        Processing => "processing",
        /// Funds captured.
        Succeeded => "succeeded",
        /// Gateway rejected the payment.
        Failed => "failed",
    }
}

status_enum! {
    /// Lifecycle of a refund.
    RefundStatus {
        /// Requested, awaiting the gateway.
        Pending => "pending",
        /// Money returned to the payer.
        Succeeded => "succeeded",
        /// Gateway rejected the refund.
        Failed => "failed",
    }
}

status_enum! {
    /// Lifecycle of a payout.
    PayoutStatus {
        /// Requested, funds reserved from the wallet.
        Pending => "pending",
        /// Submitted to the gateway.
        Processing => "processing",
        /// Money arrived at the destination.
        Succeeded => "succeeded",
        /// Gateway rejected the payout.
        Failed => "failed",
    }
}

/// Whether a requested transition changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status moves forward.
    Changed,
    /// Already in the requested status; nothing to do.
    Unchanged,
}

/// What a settled payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPurpose {
    /// Session booking; funds go into escrow for the payee.
    Session {
        /// The booked session.
        session_id: Uuid,
        /// The mentor.
        payee_id: Uuid,
    },
    /// Platform subscription; the fee is platform revenue.
    Subscription {
        /// The subscription being paid.
        subscription_id: Uuid,
    },
    /// Wallet top-up; the payer's wallet is credited.
    TopUp,
}

impl PaymentPurpose {
    /// Derives the purpose from a payment's optional references.
    ///
    /// A session reference wins over a subscription reference; a session
    /// without a payee cannot be escrowed and is treated as a top-up.
    #[must_use]
    pub fn classify(
        session_id: Option<Uuid>,
        payee_id: Option<Uuid>,
        subscription_id: Option<Uuid>,
    ) -> Self {
        match (session_id, payee_id, subscription_id) {
            (Some(session_id), Some(payee_id), _) => Self::Session {
                session_id,
                payee_id,
            },
            (_, _, Some(subscription_id)) => Self::Subscription { subscription_id },
            _ => Self::TopUp,
        }
    }
}
