//! # Booking Automation Clients
//!
//! Concrete collaborators for the lifecycle job:
//!
//! - [`HttpSettlementClient`]: completes bookings through the settlement service
//! - [`HttpMeetingLinkProvisioner`]: asks the meeting provider for a link
//! - [`ConsoleNotificationSender`]: logs reminders in place of real delivery
//!
//! ## Example
//!
//! ```no_run
//! use booking_automation_clients::HttpSettlementClient;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpSettlementClient::new(
//!     "https://settlement.internal",
//!     Some("api-key".to_string()),
//!     Duration::from_secs(30),
//! )?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod meeting_link;
pub mod notification;
pub mod settlement;

pub use meeting_link::HttpMeetingLinkProvisioner;
pub use notification::ConsoleNotificationSender;
pub use settlement::HttpSettlementClient;
