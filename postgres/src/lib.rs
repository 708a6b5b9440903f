//! `PostgreSQL` booking store for the booking lifecycle automation job.
//!
//! This crate provides the production implementations of the store-side
//! collaborators from `booking-automation-core`:
//!
//! - [`PostgresBookingStore`]: typed reads and guarded writes on `bookings`
//! - [`PostgresRunLock`]: optional advisory lock preventing overlapping runs
//!
//! All queries take the pass's `now` as a bind parameter; nothing here reads
//! `NOW()` from the database.
//!
//! # Example
//!
//! ```ignore
//! use booking_automation_postgres::PostgresBookingStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresBookingStore::connect("postgres://localhost/mydb", 5, timeout).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod booking_store;
mod run_lock;

pub use booking_store::PostgresBookingStore;
pub use run_lock::PostgresRunLock;
