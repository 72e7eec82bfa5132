pub mod booking;
pub mod event;
pub mod notification;
pub mod payment;
pub mod payment_method;
pub mod pricing_rule;
pub mod service;

pub use booking::{Booking, BookingPaymentStatus, BookingStatus, EventType};
pub use event::{Event, EventStatus};
pub use notification::Notification;
pub use payment::{Payment, PaymentMethod, PaymentState, PaymentTarget};
pub use payment_method::PaymentMethodConfig;
pub use pricing_rule::PricingRule;
