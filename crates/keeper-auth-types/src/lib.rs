//! Auth types shared across Coin Keeper services.
//!
//! Anything that needs to trust an access token without talking to the auth
//! service lives here: the claim layout, RS256 validation against the public
//! key, the bearer-token extractor and the refresh-token cookie builders.

pub mod cookie;
pub mod identity;
pub mod token;
