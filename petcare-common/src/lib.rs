//! PetCare Common Types
//!
//! Shared types used by the sign-in gateway and its clients.

pub mod account;
pub mod notice;
pub mod role;

pub use account::{status, Principal, Profile, Session, DEFAULT_ROLE};
pub use notice::{Notice, NoticeKind};
pub use role::RoleCategory;
