//! sea-orm entities for the auth service database.

pub mod one_time_codes;
pub mod outbox_events;
pub mod refresh_tokens;
pub mod roles;
pub mod user_roles;
pub mod users;
