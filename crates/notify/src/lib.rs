//! Herald notification services: API-key identity resolution, provider
//! administration, and SMTP, SMS and push dispatch with delivery logging.

pub mod delivery;
pub mod identity;
pub mod providers;

pub use delivery::email::{EmailDispatcher, EmailRequest, EmailTransport, LettreTransport};
pub use delivery::fcm::FcmConnector;
pub use delivery::push::{FanOutReport, PushClient, PushConnector, PushDispatcher, PushMessage};
pub use delivery::sms::{LoggingSmsTransport, SmsDispatcher, SmsRequest, SmsTransport};
pub use delivery::{RetryPolicy, SendError};
pub use identity::{IdentityCache, ResolvedIdentity, DEFAULT_IDENTITY_TTL};
pub use providers::{ProviderService, UnsealedProvider};
