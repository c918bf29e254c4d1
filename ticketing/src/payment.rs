//! Payment processor for ticket purchases.
//!
//! The processor tokenizes card input into a payment-method handle. A
//! returned [`PaymentMethod`] is authorization to issue the ticket; no charge
//! confirmation is modeled. In production this is backed by the hosted
//! payment SDK; [`MockPaymentProcessor`] stands in for development and tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Payment processor result
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Card number the mock processor always declines.
pub const DECLINED_TEST_CARD: &str = "4000000000000002";

/// Payment processor error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Card declined
    CardDeclined {
        /// Decline reason
        reason: String,
    },
    /// Card details are malformed
    InvalidCard {
        /// Invalid reason
        reason: String,
    },
    /// Processor could not be reached
    Unavailable {
        /// Error message
        message: String,
    },
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardDeclined { reason } => write!(f, "Card declined: {reason}"),
            Self::InvalidCard { reason } => write!(f, "Invalid card: {reason}"),
            Self::Unavailable { message } => write!(f, "Payment processor unavailable: {message}"),
        }
    }
}

impl std::error::Error for PaymentError {}

/// Card input as captured by the checkout form.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    /// Card number, spaces allowed
    pub number: String,
    /// Expiry month, 1-12
    pub exp_month: u32,
    /// Expiry year, four digits
    pub exp_year: u32,
    /// Security code
    pub cvc: String,
}

impl CardDetails {
    /// Creates new `CardDetails`
    #[must_use]
    pub fn new(number: impl Into<String>, exp_month: u32, exp_year: u32, cvc: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            exp_month,
            exp_year,
            cvc: cvc.into(),
        }
    }

    /// Card number with spaces removed
    #[must_use]
    pub fn digits(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Last four digits of the card number
    #[must_use]
    pub fn last_four(&self) -> String {
        let digits = self.digits();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or_default().to_string()
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("last_four", &self.last_four())
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .finish_non_exhaustive()
    }
}

/// Tokenized payment method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethod {
    /// Processor-issued handle
    pub id: String,
    /// Last four digits of the card
    pub last_four: String,
}

/// Payment processor trait
///
/// Abstraction over hosted processors such as Stripe.
pub trait PaymentProcessor: Send + Sync {
    /// Tokenize card details into a payment method.
    ///
    /// # Errors
    ///
    /// `CardDeclined`, `InvalidCard` or `Unavailable`.
    fn create_payment_method(
        &self,
        card: CardDetails,
    ) -> Pin<Box<dyn Future<Output = PaymentResult<PaymentMethod>> + Send + '_>>;
}

/// Mock payment processor for development and tests.
///
/// Accepts any well-formed card except [`DECLINED_TEST_CARD`].
#[derive(Clone, Debug)]
pub struct MockPaymentProcessor;

impl MockPaymentProcessor {
    /// Creates a new mock payment processor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentProcessor> {
        Arc::new(Self::new())
    }
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(card: &CardDetails) -> PaymentResult<()> {
    let digits = card.digits();
    if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCard {
            reason: "card number must be 12 to 19 digits".to_string(),
        });
    }
    if !(1..=12).contains(&card.exp_month) {
        return Err(PaymentError::InvalidCard {
            reason: format!("invalid expiry month {}", card.exp_month),
        });
    }
    if !(3..=4).contains(&card.cvc.len()) || !card.cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCard {
            reason: "security code must be 3 or 4 digits".to_string(),
        });
    }
    Ok(())
}

impl PaymentProcessor for MockPaymentProcessor {
    fn create_payment_method(
        &self,
        card: CardDetails,
    ) -> Pin<Box<dyn Future<Output = PaymentResult<PaymentMethod>> + Send + '_>> {
        Box::pin(async move {
            validate(&card)?;
            if card.digits() == DECLINED_TEST_CARD {
                tracing::warn!(last_four = %card.last_four(), "Mock card declined");
                return Err(PaymentError::CardDeclined {
                    reason: "test card is always declined".to_string(),
                });
            }

            let method = PaymentMethod {
                id: format!("pm_mock_{}", uuid::Uuid::new_v4().simple()),
                last_four: card.last_four(),
            };

            tracing::info!(
                payment_method_id = %method.id,
                last_four = %method.last_four,
                "Mock payment method created"
            );
            Ok(method)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_payment_method_created() {
        let processor = MockPaymentProcessor::new();
        let method = processor
            .create_payment_method(CardDetails::new("4242 4242 4242 4242", 12, 2030, "123"))
            .await
            .unwrap();

        assert!(method.id.starts_with("pm_mock_"));
        assert_eq!(method.last_four, "4242");
    }

    #[tokio::test]
    async fn test_declined_card() {
        let processor = MockPaymentProcessor::new();
        let result = processor
            .create_payment_method(CardDetails::new(DECLINED_TEST_CARD, 12, 2030, "123"))
            .await;

        assert!(matches!(result, Err(PaymentError::CardDeclined { .. })));
    }

    #[tokio::test]
    async fn test_malformed_cards_are_invalid() {
        let processor = MockPaymentProcessor::new();
        for card in [
            CardDetails::new("4242", 12, 2030, "123"),
            CardDetails::new("4242 4242 4242 424x", 12, 2030, "123"),
            CardDetails::new("4242424242424242", 13, 2030, "123"),
            CardDetails::new("4242424242424242", 1, 2030, "12"),
        ] {
            let result = processor.create_payment_method(card).await;
            assert!(matches!(result, Err(PaymentError::InvalidCard { .. })));
        }
    }

    #[test]
    fn card_debug_shows_only_last_four() {
        let card = CardDetails::new("4242 4242 4242 4242", 12, 2030, "987");
        let debug = format!("{card:?}");
        assert!(debug.contains("4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("987"));
    }
}
