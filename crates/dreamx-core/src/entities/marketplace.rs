//! Marketplace - services offered by users, orders placed on them, and reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Active,
    Paused,
    Archived,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// A service listing offered by a seller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceListing {
    pub id: Snowflake,
    pub seller_id: Snowflake,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub currency: String,
    pub delivery_days: i32,
    pub status: ServiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceListing {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }

    #[inline]
    pub fn is_owned_by(&self, user_id: Snowflake) -> bool {
        self.seller_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Which side of an order is acting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderParty {
    Buyer,
    Seller,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOrder {
    pub id: Snowflake,
    pub service_id: Snowflake,
    pub buyer_id: Snowflake,
    pub seller_id: Snowflake,
    pub price_cents: i64,
    pub currency: String,
    pub requirements: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ServiceOrder {
    /// New pending order priced from the listing
    pub fn place(id: Snowflake, service: &ServiceListing, buyer_id: Snowflake, requirements: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            service_id: service.id,
            buyer_id,
            seller_id: service.seller_id,
            price_cents: service.price_cents,
            currency: service.currency.clone(),
            requirements,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Which party `user_id` is, if any
    pub fn party(&self, user_id: Snowflake) -> Option<OrderParty> {
        if user_id == self.seller_id {
            Some(OrderParty::Seller)
        } else if user_id == self.buyer_id {
            Some(OrderParty::Buyer)
        } else {
            None
        }
    }

    /// Apply a status transition requested by `party`
    ///
    /// pending -> accepted -> completed is driven by the seller; a pending
    /// order may be cancelled by either side, an accepted one only by the seller.
    pub fn transition(&mut self, to: OrderStatus, party: OrderParty) -> Result<(), DomainError> {
        let allowed = match (self.status, to, party) {
            (OrderStatus::Pending, OrderStatus::Accepted, OrderParty::Seller)
            | (OrderStatus::Accepted, OrderStatus::Completed, OrderParty::Seller)
            | (OrderStatus::Pending, OrderStatus::Cancelled, _)
            | (OrderStatus::Accepted, OrderStatus::Cancelled, OrderParty::Seller) => true,
            _ => false,
        };
        if !allowed {
            return Err(DomainError::InvalidOrderTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        if to == OrderStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// The other party, who gets notified about a change made by `party`
    pub fn counterparty(&self, party: OrderParty) -> Snowflake {
        match party {
            OrderParty::Buyer => self.seller_id,
            OrderParty::Seller => self.buyer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReview {
    pub id: Snowflake,
    pub service_id: Snowflake,
    pub order_id: Snowflake,
    pub reviewer_id: Snowflake,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Average rating and review count for a listing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

pub fn validate_rating(rating: i32) -> Result<(), DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::ValidationError(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> ServiceListing {
        let now = Utc::now();
        ServiceListing {
            id: Snowflake::new(1),
            seller_id: Snowflake::new(10),
            title: "Logo design".into(),
            description: "Vector logo".into(),
            category: "design".into(),
            price_cents: 5000,
            currency: "usd".into(),
            delivery_days: 3,
            status: ServiceStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_place_copies_price() {
        let order = ServiceOrder::place(Snowflake::new(2), &listing(), Snowflake::new(20), None);
        assert_eq!(order.price_cents, 5000);
        assert_eq!(order.seller_id, Snowflake::new(10));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.party(Snowflake::new(20)), Some(OrderParty::Buyer));
        assert_eq!(order.party(Snowflake::new(99)), None);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut order = ServiceOrder::place(Snowflake::new(2), &listing(), Snowflake::new(20), None);
        order.transition(OrderStatus::Accepted, OrderParty::Seller).unwrap();
        order.transition(OrderStatus::Completed, OrderParty::Seller).unwrap();
        assert!(order.completed_at.is_some());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut order = ServiceOrder::place(Snowflake::new(2), &listing(), Snowflake::new(20), None);
        assert!(order.transition(OrderStatus::Completed, OrderParty::Seller).is_err());
        assert!(order.transition(OrderStatus::Accepted, OrderParty::Buyer).is_err());

        order.transition(OrderStatus::Accepted, OrderParty::Seller).unwrap();
        assert!(order.transition(OrderStatus::Cancelled, OrderParty::Buyer).is_err());
        order.transition(OrderStatus::Cancelled, OrderParty::Seller).unwrap();
        assert!(order.transition(OrderStatus::Accepted, OrderParty::Seller).is_err());
    }

    #[test]
    fn test_buyer_can_cancel_pending() {
        let mut order = ServiceOrder::place(Snowflake::new(2), &listing(), Snowflake::new(20), None);
        order.transition(OrderStatus::Cancelled, OrderParty::Buyer).unwrap();
        assert_eq!(order.counterparty(OrderParty::Buyer), Snowflake::new(10));
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
