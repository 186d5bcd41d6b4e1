//! Client for the MediCure user-data REST API.

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::FetchError;
pub use types::{ActivePlans, ProfilePicture, Subscription, SubscriptionDetails};
