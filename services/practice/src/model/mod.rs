//! Practice data model module.
//!
//! # Purpose
//! Re-exports the booking, account and article records shared by the store,
//! services and HTTP API.
mod account;
mod article;
mod booking;

pub use account::{ADMIN_ROLE_HINT, Account, AccountUpdate, NewAccount, Session};
pub use article::{ARTICLE_PREFIX, Article, ArticleFields};
pub use booking::{BOOKING_PREFIX, Booking, BookingStatus, NewBooking};
