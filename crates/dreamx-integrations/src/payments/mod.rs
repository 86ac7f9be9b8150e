//! Payment processors
//!
//! One processor is active per deployment, picked by `PAYMENT_PROVIDER`.

mod lemonsqueezy;
mod square;
mod stripe;

use std::sync::Arc;

use dreamx_common::PaymentsConfig;
use dreamx_core::{IntegrationResult, PaymentProcessor, PaymentProvider};

pub use lemonsqueezy::LemonSqueezyProcessor;
pub use square::{SquareProcessor, SQUARE_VERSION};
pub use stripe::{StripeProcessor, WEBHOOK_TOLERANCE_SECS};

/// Build the configured processor
pub fn create_payment_processor(config: &PaymentsConfig) -> IntegrationResult<Arc<dyn PaymentProcessor>> {
    let processor: Arc<dyn PaymentProcessor> = match config.provider {
        PaymentProvider::Stripe => Arc::new(StripeProcessor::new(&config.stripe)?),
        PaymentProvider::Square => Arc::new(SquareProcessor::new(&config.square)?),
        PaymentProvider::LemonSqueezy => Arc::new(LemonSqueezyProcessor::new(&config.lemonsqueezy)?),
    };

    tracing::info!(provider = config.provider.as_str(), "Payment processor ready");
    Ok(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamx_common::{LemonSqueezyConfig, SquareConfig, StripeConfig};
    use dreamx_core::IntegrationError;

    fn config(provider: PaymentProvider) -> PaymentsConfig {
        PaymentsConfig {
            provider,
            stripe: StripeConfig {
                secret_key: Some("sk".into()),
                webhook_secret: None,
                api_base: "http://localhost".into(),
            },
            square: SquareConfig::default(),
            lemonsqueezy: LemonSqueezyConfig::default(),
            plans: Vec::new(),
        }
    }

    #[test]
    fn test_selects_configured_provider() {
        let processor = create_payment_processor(&config(PaymentProvider::Stripe)).unwrap();
        assert_eq!(processor.provider(), PaymentProvider::Stripe);
    }

    #[test]
    fn test_unconfigured_provider_fails() {
        assert!(matches!(
            create_payment_processor(&config(PaymentProvider::Square)),
            Err(IntegrationError::NotConfigured(_))
        ));
    }
}
