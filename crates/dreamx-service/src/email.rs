//! Plain-text emails sent by the platform

use dreamx_core::{Notification, OutgoingEmail, User};

fn link(public_url: &str, path: &str) -> String {
    format!("{}{path}", public_url.trim_end_matches('/'))
}

pub fn verification(user: &User, public_url: &str, token: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Verify your Dream X email".to_string(),
        body: format!(
            "Hi {},\n\nConfirm your email address by opening the link below. It expires in 24 hours.\n\n{}\n",
            user.display_name,
            link(public_url, &format!("/verify-email?token={token}")),
        ),
    }
}

pub fn password_reset(user: &User, public_url: &str, token: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Reset your Dream X password".to_string(),
        body: format!(
            "Hi {},\n\nSomeone asked to reset your password. The link below is valid for one hour.\n\n{}\n\nIf this wasn't you, ignore this message.\n",
            user.display_name,
            link(public_url, &format!("/reset-password?token={token}")),
        ),
    }
}

pub fn notification(user: &User, public_url: &str, notification: &Notification) -> OutgoingEmail {
    let mut body = format!("Hi {},\n\n{}\n", user.display_name, notification.body);
    if let Some(path) = &notification.link {
        body.push('\n');
        body.push_str(&link(public_url, path));
        body.push('\n');
    }
    body.push_str("\nYou can turn off email notifications in your settings.\n");

    OutgoingEmail {
        to: user.email.clone(),
        subject: format!("Dream X: new {} update", notification.kind.as_str()),
        body,
    }
}
