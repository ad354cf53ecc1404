//! Booking lifecycle: request, list, inspect and admin status changes.
//!
//! # Key invariants
//! - New bookings are always `pending`; only an admin changes `status`, and
//!   only along [`BookingStatus::can_transition_to`] edges.
//! - Validation finishes before anything is written.
//! - A non-admin only ever sees bookings whose `user_id` is their own id.
//!   Someone else's booking reads as not found.
//! - Listings are sorted by appointment `date`, newest first.
//!
//! # Notes
//! Status updates are read-then-write with no compare-and-swap. Two admins
//! changing the same booking at once race and the last write wins.
use super::{ServiceError, ServiceResult, required};
use crate::auth::policy::AdminAllowlist;
use crate::auth::principal::Identity;
use crate::model::{BOOKING_PREFIX, Booking, BookingStatus, NewBooking};
use crate::notify::{NotificationDispatcher, templates};
use crate::store::{Collection, KvStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct BookingService {
    bookings: Collection<Booking>,
    allowlist: AdminAllowlist,
    notifications: NotificationDispatcher,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn KvStore>,
        allowlist: AdminAllowlist,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            bookings: Collection::new(store, BOOKING_PREFIX),
            allowlist,
            notifications,
        }
    }

    pub async fn create_booking(
        &self,
        identity: Option<&Identity>,
        input: NewBooking,
    ) -> ServiceResult<Booking> {
        let identity = identity.ok_or(ServiceError::Unauthenticated)?;
        let date = required("date", input.date)?;
        let service_type = required("serviceType", input.service_type)?;
        let date = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|_| {
                ServiceError::InvalidInput("date must be an RFC 3339 timestamp".to_string())
            })?
            .with_timezone(&Utc);

        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.id.clone(),
            user_email: identity.email.clone(),
            user_name: identity.display_name(),
            date,
            service_type,
            note: input.note.filter(|note| !note.trim().is_empty()),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        self.bookings.put(&booking.id, &booking).await?;
        metrics::counter!("practice_bookings_created_total").increment(1);
        tracing::info!(booking_id = %booking.id, user_id = %booking.user_id, "booking created");

        if let Some(email) = booking.user_email.as_deref() {
            self.notifications
                .dispatch(templates::booking_received(email, &booking));
        }
        for admin in self.allowlist.emails() {
            self.notifications
                .dispatch(templates::admin_new_booking(admin, &booking));
        }
        Ok(booking)
    }

    pub async fn list_bookings(&self, identity: Option<&Identity>) -> ServiceResult<Vec<Booking>> {
        let identity = identity.ok_or(ServiceError::Unauthenticated)?;
        let is_admin = self.allowlist.resolve_role(Some(identity)).is_admin();
        let mut bookings: Vec<Booking> = self
            .bookings
            .list()
            .await?
            .into_iter()
            .filter(|booking| is_admin || booking.user_id == identity.id)
            .collect();
        bookings.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(bookings)
    }

    pub async fn get_booking(
        &self,
        identity: Option<&Identity>,
        booking_id: &str,
    ) -> ServiceResult<Booking> {
        let identity = identity.ok_or(ServiceError::Unauthenticated)?;
        let is_admin = self.allowlist.resolve_role(Some(identity)).is_admin();
        match self.bookings.get(booking_id).await? {
            Some(booking) if is_admin || booking.user_id == identity.id => Ok(booking),
            _ => Err(not_found(booking_id)),
        }
    }

    pub async fn set_booking_status(
        &self,
        identity: Option<&Identity>,
        booking_id: &str,
        status: BookingStatus,
    ) -> ServiceResult<Booking> {
        if !self.allowlist.resolve_role(identity).is_admin() {
            return Err(ServiceError::Forbidden(
                "only an admin can change booking status".to_string(),
            ));
        }
        let mut booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| not_found(booking_id))?;
        if booking.status == status {
            return Ok(booking);
        }
        if !booking.status.can_transition_to(status) {
            return Err(ServiceError::InvalidTransition {
                from: booking.status,
                to: status,
            });
        }

        booking.status = status;
        self.bookings.put(&booking.id, &booking).await?;
        tracing::info!(booking_id = %booking.id, status = %status, "booking status changed");

        if let Some(email) = booking.user_email.as_deref() {
            match status {
                BookingStatus::Confirmed => {
                    self.notifications
                        .dispatch(templates::booking_confirmed(email, &booking));
                }
                BookingStatus::Cancelled => {
                    self.notifications
                        .dispatch(templates::booking_cancelled(email, &booking));
                }
                BookingStatus::Pending => {}
            }
        }
        Ok(booking)
    }
}

fn not_found(booking_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("booking {booking_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::notify::recording::RecordingNotifier;
    use crate::store::memory::InMemoryKvStore;
    use serde_json::Map;
    use std::time::Duration;

    const ADMIN: &str = "admin@example.com";

    struct Harness {
        service: BookingService,
        store: InMemoryKvStore,
        notifier: RecordingNotifier,
    }

    fn harness() -> Harness {
        let store = InMemoryKvStore::new();
        let notifier = RecordingNotifier::new();
        let service = BookingService::new(
            Arc::new(store.clone()),
            AdminAllowlist::new([ADMIN]),
            NotificationDispatcher::new(Arc::new(notifier.clone())),
        );
        Harness {
            service,
            store,
            notifier,
        }
    }

    fn user(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            metadata: Map::new(),
        }
    }

    fn admin() -> Identity {
        Identity {
            id: "admin".to_string(),
            email: Some(ADMIN.to_string()),
            metadata: Map::new(),
        }
    }

    fn request(date: &str, service_type: &str) -> NewBooking {
        NewBooking {
            date: Some(date.to_string()),
            service_type: Some(service_type.to_string()),
            note: None,
        }
    }

    #[tokio::test]
    async fn create_persists_a_pending_booking_and_notifies() {
        let h = harness();
        let booking = h
            .service
            .create_booking(
                Some(&user("u1")),
                request("2025-03-01T10:00:00Z", "Energy Session"),
            )
            .await
            .expect("create");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.user_id, "u1");
        assert_eq!(booking.user_name, "u1@example.com");

        let stored = h.store.snapshot().await;
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key(&format!("booking_{}", booking.id)));

        let sent = h.notifier.wait_for(2, Duration::from_secs(1)).await;
        let mut kinds: Vec<(String, NotificationKind)> = sent
            .into_iter()
            .map(|mail| (mail.to, mail.kind))
            .collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            kinds,
            vec![
                (ADMIN.to_string(), NotificationKind::AdminNewBooking),
                ("u1@example.com".to_string(), NotificationKind::BookingReceived),
            ]
        );
    }

    #[tokio::test]
    async fn create_requires_identity_and_fields_before_writing() {
        let h = harness();
        assert!(matches!(
            h.service
                .create_booking(None, request("2025-03-01T10:00:00Z", "Energy Session"))
                .await,
            Err(ServiceError::Unauthenticated)
        ));

        let missing_date = NewBooking {
            service_type: Some("Energy Session".to_string()),
            ..NewBooking::default()
        };
        let missing_type = NewBooking {
            date: Some("2025-03-01T10:00:00Z".to_string()),
            service_type: Some(" ".to_string()),
            ..NewBooking::default()
        };
        for input in [missing_date, missing_type, request("tomorrow", "Reiki")] {
            let err = h
                .service
                .create_booking(Some(&user("u1")), input)
                .await
                .expect_err("invalid");
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner_unless_admin_and_sorted_by_date() {
        let h = harness();
        let u1 = user("u1");
        let u2 = user("u2");
        for (who, date) in [
            (&u1, "2025-03-01T10:00:00Z"),
            (&u2, "2025-04-01T10:00:00Z"),
            (&u1, "2025-05-01T10:00:00Z"),
        ] {
            h.service
                .create_booking(Some(who), request(date, "Session"))
                .await
                .expect("create");
        }

        let mine = h.service.list_bookings(Some(&u1)).await.expect("list");
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|booking| booking.user_id == "u1"));
        assert!(mine[0].date > mine[1].date);

        let all = h.service.list_bookings(Some(&admin())).await.expect("list");
        let dates: Vec<String> = all.iter().map(|b| b.date.to_rfc3339()).collect();
        assert_eq!(
            dates,
            vec![
                "2025-05-01T10:00:00+00:00",
                "2025-04-01T10:00:00+00:00",
                "2025-03-01T10:00:00+00:00",
            ]
        );
        assert!(matches!(
            h.service.list_bookings(None).await,
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn non_admin_cannot_change_status_and_booking_is_unchanged() {
        let h = harness();
        let u1 = user("u1");
        let booking = h
            .service
            .create_booking(Some(&u1), request("2025-03-01T10:00:00Z", "Session"))
            .await
            .expect("create");

        for caller in [Some(&u1), None] {
            let err = h
                .service
                .set_booking_status(caller, &booking.id, BookingStatus::Confirmed)
                .await
                .expect_err("forbidden");
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
        let stored = h
            .service
            .get_booking(Some(&u1), &booking.id)
            .await
            .expect("get");
        assert_eq!(stored, booking);
    }

    #[tokio::test]
    async fn admin_confirmation_notifies_the_owner_exactly_once() {
        let h = harness();
        let booking = h
            .service
            .create_booking(
                Some(&user("u1")),
                request("2025-03-01T10:00:00Z", "Energy Session"),
            )
            .await
            .expect("create");
        h.notifier.wait_for(2, Duration::from_secs(1)).await;

        let confirmed = h
            .service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Confirmed)
            .await
            .expect("confirm");
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let sent = h.notifier.wait_for(3, Duration::from_secs(1)).await;
        let confirmations: Vec<_> = sent
            .iter()
            .filter(|mail| mail.kind == NotificationKind::BookingConfirmed)
            .collect();
        assert_eq!(confirmations.len(), 1);
        assert_eq!(confirmations[0].to, "u1@example.com");
    }

    #[tokio::test]
    async fn owner_without_email_gets_no_status_emails() {
        let h = harness();
        let no_email = Identity {
            id: "u-noemail".to_string(),
            email: None,
            metadata: Map::new(),
        };
        let booking = h
            .service
            .create_booking(
                Some(&no_email),
                request("2025-03-01T10:00:00Z", "Energy Session"),
            )
            .await
            .expect("create");
        assert_eq!(booking.user_email, None);
        assert_eq!(booking.user_name, "u-noemail");

        let sent = h.notifier.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::AdminNewBooking);

        for status in [BookingStatus::Confirmed, BookingStatus::Cancelled] {
            h.service
                .set_booking_status(Some(&admin()), &booking.id, status)
                .await
                .expect("status change");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let attempted = h.notifier.attempted();
        assert_eq!(attempted.len(), 1);
        assert!(attempted.iter().all(|mail| mail.to == ADMIN));
    }

    #[tokio::test]
    async fn cancelling_a_confirmed_booking_notifies_the_owner_once() {
        let h = harness();
        let booking = h
            .service
            .create_booking(
                Some(&user("u1")),
                request("2025-03-01T10:00:00Z", "Energy Session"),
            )
            .await
            .expect("create");
        h.service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Confirmed)
            .await
            .expect("confirm");
        h.notifier.wait_for(3, Duration::from_secs(1)).await;

        let cancelled = h
            .service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Cancelled)
            .await
            .expect("cancel");
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let sent = h.notifier.wait_for(4, Duration::from_secs(1)).await;
        let cancellations: Vec<_> = sent
            .iter()
            .filter(|mail| mail.kind == NotificationKind::BookingCancelled)
            .collect();
        assert_eq!(cancellations.len(), 1);
        assert_eq!(cancellations[0].to, "u1@example.com");
        assert_eq!(
            booking.user_email.as_deref(),
            Some(cancellations[0].to.as_str())
        );
    }

    #[tokio::test]
    async fn same_status_update_succeeds_without_notifying() {
        let h = harness();
        let booking = h
            .service
            .create_booking(Some(&user("u1")), request("2025-03-01T10:00:00Z", "Session"))
            .await
            .expect("create");
        h.notifier.wait_for(2, Duration::from_secs(1)).await;
        let before = h.notifier.attempts();

        let unchanged = h
            .service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Pending)
            .await
            .expect("no-op");
        assert_eq!(unchanged.status, BookingStatus::Pending);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.notifier.attempts(), before);
    }

    #[tokio::test]
    async fn terminal_states_reject_further_transitions() {
        let h = harness();
        let booking = h
            .service
            .create_booking(Some(&user("u1")), request("2025-03-01T10:00:00Z", "Session"))
            .await
            .expect("create");
        h.service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Cancelled)
            .await
            .expect("cancel");
        let err = h
            .service
            .set_booking_status(Some(&admin()), &booking.id, BookingStatus::Confirmed)
            .await
            .expect_err("terminal");
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed
            }
        ));
        assert!(matches!(
            h.service
                .set_booking_status(Some(&admin()), "missing", BookingStatus::Confirmed)
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn other_users_bookings_read_as_not_found() {
        let h = harness();
        let booking = h
            .service
            .create_booking(Some(&user("u1")), request("2025-03-01T10:00:00Z", "Session"))
            .await
            .expect("create");
        assert!(matches!(
            h.service.get_booking(Some(&user("u2")), &booking.id).await,
            Err(ServiceError::NotFound(_))
        ));
        h.service
            .get_booking(Some(&admin()), &booking.id)
            .await
            .expect("admin sees it");
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_creation() {
        let store = InMemoryKvStore::new();
        let notifier = RecordingNotifier::failing();
        let service = BookingService::new(
            Arc::new(store.clone()),
            AdminAllowlist::new([ADMIN]),
            NotificationDispatcher::new(Arc::new(notifier.clone())),
        );
        service
            .create_booking(Some(&user("u1")), request("2025-03-01T10:00:00Z", "Session"))
            .await
            .expect("create succeeds");
        assert_eq!(notifier.wait_for(2, Duration::from_secs(1)).await.len(), 2);
        assert_eq!(store.snapshot().await.len(), 1);
    }
}
