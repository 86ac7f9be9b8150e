//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.
//! Responses that need data from more than one repository (reaction counts,
//! ratings, members) are assembled by the services instead.

use dreamx_core::{
    Appeal, AuditEntry, Block, Invoice, Notification, PaymentIntent, PaymentMethod,
    PaymentProvider, Report, ServiceOrder, ServiceReview, Subscription, User, WebAuthnCredential,
};

use super::responses::{
    AdminUserResponse, AppealResponse, AuditEntryResponse, BlockResponse, CredentialResponse,
    CurrentUserResponse, InvoiceResponse, NotificationResponse, OrderResponse, PaymentMethodResponse,
    PaymentResponse, PreferencesResponse, PublicUserResponse, ReportResponse, ReviewResponse,
    SubscriptionResponse, UserResponse,
};

// ============================================================================
// User Mappers
// ============================================================================

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            website: user.website.clone(),
            role: user.role,
            status: user.status,
            suspended_until: user.suspended_until,
            suspension_reason: user.suspension_reason.clone(),
            email_verified: user.email_verified,
            preferences: PreferencesResponse {
                notify_email: user.notify_email,
                notify_push: user.notify_push,
                profile_visibility: user.profile_visibility,
                allow_messages: user.allow_messages,
            },
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

impl From<User> for CurrentUserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

impl From<&User> for PublicUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

impl From<User> for PublicUserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

impl UserResponse {
    /// Full profile as seen by someone allowed to see it
    pub fn full(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            website: user.website.clone(),
            role: Some(user.role),
            created_at: Some(user.created_at),
            private: false,
        }
    }

    /// Private profile: id, username, display name and avatar only
    pub fn limited(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            bio: None,
            location: None,
            website: None,
            role: None,
            created_at: None,
            private: true,
        }
    }
}

impl From<&User> for AdminUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            status: user.status,
            suspended_until: user.suspended_until,
            email_verified: user.email_verified,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

impl From<&WebAuthnCredential> for CredentialResponse {
    fn from(credential: &WebAuthnCredential) -> Self {
        Self {
            id: credential.id,
            credential_id: credential.credential_id.clone(),
            name: credential.name.clone(),
            sign_count: credential.sign_count,
            created_at: credential.created_at,
            last_used_at: credential.last_used_at,
        }
    }
}

// ============================================================================
// Notification Mappers
// ============================================================================

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            actor_id: n.actor_id,
            kind: n.kind,
            body: n.body.clone(),
            link: n.link.clone(),
            data: n.data.clone(),
            read: n.is_read(),
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self::from(&n)
    }
}

// ============================================================================
// Marketplace Mappers
// ============================================================================

impl From<&ServiceOrder> for OrderResponse {
    fn from(order: &ServiceOrder) -> Self {
        Self {
            id: order.id,
            service_id: order.service_id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            price_cents: order.price_cents,
            currency: order.currency.clone(),
            requirements: order.requirements.clone(),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            completed_at: order.completed_at,
        }
    }
}

impl From<ServiceOrder> for OrderResponse {
    fn from(order: ServiceOrder) -> Self {
        Self::from(&order)
    }
}

impl From<ServiceReview> for ReviewResponse {
    fn from(review: ServiceReview) -> Self {
        Self {
            id: review.id,
            service_id: review.service_id,
            order_id: review.order_id,
            reviewer_id: review.reviewer_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        }
    }
}

// ============================================================================
// Billing Mappers
// ============================================================================

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id,
            plan: sub.plan.clone(),
            status: sub.status,
            provider: sub.provider,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            checkout_url: None,
            created_at: sub.created_at,
            updated_at: sub.updated_at,
        }
    }
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self::from(&sub)
    }
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(method: PaymentMethod) -> Self {
        Self {
            id: method.id,
            provider: method.provider,
            brand: method.brand,
            last4: method.last4,
            exp_month: method.exp_month,
            exp_year: method.exp_year,
            is_default: method.is_default,
            created_at: method.created_at,
        }
    }
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            subscription_id: invoice.subscription_id,
            provider: invoice.provider,
            amount_cents: invoice.amount_cents,
            currency: invoice.currency,
            status: invoice.status,
            description: invoice.description,
            created_at: invoice.created_at,
        }
    }
}

impl PaymentResponse {
    pub fn new(provider: PaymentProvider, intent: PaymentIntent) -> Self {
        Self {
            provider,
            provider_payment_id: intent.provider_payment_id,
            client_secret: intent.client_secret,
            checkout_url: intent.checkout_url,
            status: intent.status,
        }
    }
}

// ============================================================================
// Moderation Mappers
// ============================================================================

impl From<Block> for BlockResponse {
    fn from(block: Block) -> Self {
        Self {
            user_id: block.blocked_id,
            created_at: block.created_at,
        }
    }
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            subject_type: report.subject_type,
            subject_id: report.subject_id,
            reason: report.reason,
            details: report.details,
            status: report.status,
            reviewer_id: report.reviewer_id,
            resolution_note: report.resolution_note,
            created_at: report.created_at,
            resolved_at: report.resolved_at,
        }
    }
}

impl From<Appeal> for AppealResponse {
    fn from(appeal: Appeal) -> Self {
        Self {
            id: appeal.id,
            user_id: appeal.user_id,
            kind: appeal.kind,
            subject_id: appeal.subject_id,
            message: appeal.message,
            status: appeal.status,
            reviewer_id: appeal.reviewer_id,
            decision_note: appeal.decision_note,
            created_at: appeal.created_at,
            decided_at: appeal.decided_at,
        }
    }
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            actor_id: entry.actor_id,
            action: entry.action,
            target_type: entry.target_type,
            target_id: entry.target_id,
            details: entry.details,
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamx_core::{ProfileVisibility, Snowflake};

    #[test]
    fn test_limited_profile_hides_details() {
        let mut user = User::new(Snowflake::new(7), "ana".into(), "ana@example.com".into(), "Ana".into());
        user.bio = Some("hello".into());
        user.profile_visibility = ProfileVisibility::Private;

        let json = serde_json::to_value(UserResponse::limited(&user)).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["private"], true);
        assert!(json.get("bio").is_none());
        assert!(json.get("created_at").is_none());

        let json = serde_json::to_value(UserResponse::full(&user)).unwrap();
        assert_eq!(json["bio"], "hello");
    }

    #[test]
    fn test_current_user_never_exposes_password_fields() {
        let user = User::new(Snowflake::new(1), "ana".into(), "ana@example.com".into(), "Ana".into());
        let json = serde_json::to_value(CurrentUserResponse::from(&user)).unwrap();
        assert_eq!(json["email"], "ana@example.com");
        assert_eq!(json["preferences"]["profile_visibility"], "public");
        assert!(json.get("password_hash").is_none());
    }
}
