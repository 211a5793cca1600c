//! Fixed registry of notification message templates.
//!
//! Placeholders use `{Name}` syntax and are substituted from the parameter
//! list at render time. The set of messages is closed: an unregistered key
//! is a `TemplateNotFound` error, never a silently empty message.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

pub static NOTIFICATION_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "DueDate",
            r#"The book "{BookTitle}" must be returned on or before {DueDate}. Please return it on time to avoid penalties."#,
        ),
        (
            "ReservationApproved",
            r#"Your reservation for the book "{BookTitle}" has been approved. Please pick it up by {PreferredPickupDate}."#,
        ),
        (
            "ReservationDeclined",
            r#"We're sorry! Your reservation for the book "{BookTitle}" has been declined. Please contact the librarian."#,
        ),
        (
            "ReservationPending",
            r#"Your reservation for the book "{BookTitle}" is pending. Please wait for approval."#,
        ),
        (
            "ReservationCancelled",
            r#"Your reservation for the book "{BookTitle}" has been cancelled. If you have any questions, please contact us."#,
        ),
        (
            "ReservationExpired",
            r#"Your reservation for the book "{BookTitle}" has expired. Please try again or choose another book."#,
        ),
        (
            "BookBorrowed",
            r#"You have successfully borrowed the book "{BookTitle}". The due date for return is {DueDate}."#,
        ),
        (
            "OverdueBook",
            r#"Your borrowed book "{BookTitle}" is overdue. Please return it as soon as possible to avoid penalties."#,
        ),
        (
            "BookReturned",
            r#"Thank you for returning the book "{BookTitle}". We hope you enjoyed it."#,
        ),
        (
            "AccountActivated",
            "Your account has been activated successfully. You can now borrow books and manage your reservations.",
        ),
        (
            "AccountDeactivated",
            "Your account has been deactivated. Please contact the administrator for assistance.",
        ),
        (
            "NewReservationRequest",
            r#"A new reservation has been made by {UserName} for the book "{BookTitle}". Please review and approve or reject the reservation."#,
        ),
        (
            "ReservationStatusChangedAdmin",
            r#"The reservation for "{BookTitle}" by {UserName} has been {Status}. Please proceed with necessary actions."#,
        ),
    ])
});

/// Render a registered template with the given named parameters.
pub fn render(template_key: &str, params: &[(&str, String)]) -> AppResult<String> {
    let template = NOTIFICATION_TEMPLATES
        .get(template_key)
        .ok_or_else(|| AppError::TemplateNotFound(template_key.to_string()))?;

    let mut message = (*template).to_string();
    for (name, value) in params {
        message = message.replace(&format!("{{{}}}", name), value);
    }
    Ok(message)
}

/// Human-readable date used inside notification messages.
pub fn fmt_date(date: DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_template_with_params() {
        let message = render("ReservationPending", &[("BookTitle", "Dune".to_string())])
            .expect("template should render");
        assert_eq!(
            message,
            r#"Your reservation for the book "Dune" is pending. Please wait for approval."#
        );
    }

    #[test]
    fn unknown_key_is_template_not_found() {
        let err = render("NoSuchTemplate", &[]).unwrap_err();
        assert!(matches!(err, AppError::TemplateNotFound(_)));
    }

    #[test]
    fn every_registered_template_is_non_empty() {
        for (key, template) in NOTIFICATION_TEMPLATES.iter() {
            assert!(!template.is_empty(), "template {} is empty", key);
        }
    }
}
