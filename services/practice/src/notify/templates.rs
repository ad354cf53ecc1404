//! HTML bodies for transactional emails.
//!
//! Every value that came from a user (names, service labels, notes) is
//! escaped before it is placed in markup.
use super::{Notification, NotificationKind};
use crate::model::Booking;
use chrono::{DateTime, Utc};

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%A, %-d %B %Y, %H:%M UTC").to_string()
}

fn layout(title: &str, accent: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body style="margin:0;padding:0;font-family:Arial,sans-serif;background-color:#0f172a;color:#e2e8f0;">
<table width="100%" cellpadding="0" cellspacing="0" style="padding:40px 20px;">
<tr><td align="center">
<table width="600" cellpadding="0" cellspacing="0" style="background-color:#1e1b4b;border-radius:16px;">
<tr><td style="padding:32px 40px;text-align:center;background-color:{accent};border-radius:16px 16px 0 0;">
<h1 style="margin:0;font-size:26px;color:#ffffff;">{title}</h1>
</td></tr>
<tr><td style="padding:32px 40px;font-size:16px;line-height:1.6;">
{body}
</td></tr>
<tr><td style="padding:20px 40px;font-size:12px;color:#64748b;text-align:center;">
This message was sent automatically. Please do not reply.
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#
    )
}

fn detail(label: &str, value: &str) -> String {
    format!(
        r#"<p style="margin:12px 0 0;font-size:14px;color:#94a3b8;">{label}</p><p style="margin:0;font-size:18px;color:#ffffff;">{value}</p>"#
    )
}

fn booking_details(booking: &Booking, include_note: bool) -> String {
    let mut details = detail("Date and time", &format_date(&booking.date));
    details.push_str(&detail("Session", &escape_html(&booking.service_type)));
    if include_note {
        if let Some(note) = booking.note.as_deref().filter(|note| !note.trim().is_empty()) {
            details.push_str(&detail("Your message", &escape_html(note)));
        }
    }
    details
}

/// Sent to the requester right after a booking is stored.
pub fn booking_received(to: &str, booking: &Booking) -> Notification {
    let body = format!(
        "<p>Hello <strong>{name}</strong>,</p>\
         <p>Thank you for booking a session. Your request has been received and is waiting for confirmation.</p>\
         {details}\
         <p>You will get another email once the appointment is confirmed.</p>",
        name = escape_html(&booking.user_name),
        details = booking_details(booking, true),
    );
    Notification {
        to: to.to_string(),
        subject: "Booking received".to_string(),
        html: layout("Booking received", "#7c3aed", &body),
        kind: NotificationKind::BookingReceived,
    }
}

pub fn booking_confirmed(to: &str, booking: &Booking) -> Notification {
    let body = format!(
        "<p>Hello <strong>{name}</strong>,</p>\
         <p>Good news: your booking is confirmed. See you at the session.</p>\
         {details}",
        name = escape_html(&booking.user_name),
        details = booking_details(booking, false),
    );
    Notification {
        to: to.to_string(),
        subject: "Your booking is confirmed".to_string(),
        html: layout("Booking confirmed", "#059669", &body),
        kind: NotificationKind::BookingConfirmed,
    }
}

pub fn booking_cancelled(to: &str, booking: &Booking) -> Notification {
    let body = format!(
        "<p>Hello <strong>{name}</strong>,</p>\
         <p>Unfortunately your booking has been cancelled. Feel free to pick another date.</p>\
         {details}",
        name = escape_html(&booking.user_name),
        details = booking_details(booking, false),
    );
    Notification {
        to: to.to_string(),
        subject: "Your booking was cancelled".to_string(),
        html: layout("Booking cancelled", "#dc2626", &body),
        kind: NotificationKind::BookingCancelled,
    }
}

/// Sent to each allowlisted admin address when a booking arrives.
pub fn admin_new_booking(to: &str, booking: &Booking) -> Notification {
    let email = booking.user_email.as_deref().unwrap_or("no email on file");
    let body = format!(
        "<p>A new booking is waiting for confirmation.</p>\
         {client}{email}{details}",
        client = detail("Client", &escape_html(&booking.user_name)),
        email = detail("Email", &escape_html(email)),
        details = booking_details(booking, true),
    );
    Notification {
        to: to.to_string(),
        subject: format!("New booking: {}", booking.service_type),
        html: layout("New booking", "#4f46e5", &body),
        kind: NotificationKind::AdminNewBooking,
    }
}

pub fn welcome(to: &str, name: &str) -> Notification {
    let body = format!(
        "<p>Hello <strong>{name}</strong>,</p>\
         <p>Your account is ready. You can now sign in and book sessions online.</p>",
        name = escape_html(name),
    );
    Notification {
        to: to.to_string(),
        subject: "Welcome".to_string(),
        html: layout("Welcome", "#7c3aed", &body),
        kind: NotificationKind::Welcome,
    }
}
