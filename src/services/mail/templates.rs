// src/services/mail/templates.rs

use super::EmailMessage;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, paragraphs: &[String], action_label: &str, action_url: &str, footer: &str) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p style=\"margin: 0 0 16px; font-size: 16px; line-height: 1.6;\">{p}</p>"))
        .collect();
    let url = escape_html(action_url);

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body style="margin: 0; padding: 40px 20px; font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; color: #171717;">
    <div style="max-width: 560px; margin: 0 auto;">
        <h1 style="font-size: 24px;">{title}</h1>
        {body}
        <p style="margin: 24px 0;"><a href="{url}" style="background: #2563eb; color: #ffffff; padding: 12px 24px; border-radius: 8px; text-decoration: none;">{action_label}</a></p>
        <p style="font-size: 13px; color: #737373;">{footer}</p>
    </div>
</body>
</html>"##
    )
}

pub fn invitation_email(to: &str, inviter_name: &str, tenant_name: &str, role: &str, invite_url: &str) -> EmailMessage {
    let html = layout(
        &format!("Join {} on the platform", escape_html(tenant_name)),
        &[format!(
            "<strong>{}</strong> invited you to join <strong>{}</strong> as {}.",
            escape_html(inviter_name),
            escape_html(tenant_name),
            escape_html(role)
        )],
        "Accept invitation",
        invite_url,
        "This invitation expires in 7 days. If you were not expecting it, you can ignore this email.",
    );
    let text = format!(
        "{inviter_name} invited you to join {tenant_name} as {role}.\n\nAccept the invitation: {invite_url}\n\nThis invitation expires in 7 days."
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("{inviter_name} invited you to join {tenant_name}"),
        body_html: Some(html),
        body_text: Some(text),
    }
}

pub fn welcome_email(to: &str, user_name: &str, tenant_name: &str, login_url: &str) -> EmailMessage {
    let html = layout(
        &format!("Welcome to {}", escape_html(tenant_name)),
        &[format!(
            "Hi {}, your account in <strong>{}</strong> is ready.",
            escape_html(user_name),
            escape_html(tenant_name)
        )],
        "Sign in",
        login_url,
        "You are receiving this because you accepted an invitation.",
    );
    let text = format!("Hi {user_name}, your account in {tenant_name} is ready.\n\nSign in: {login_url}");

    EmailMessage {
        to: to.to_string(),
        subject: format!("Welcome to {tenant_name}"),
        body_html: Some(html),
        body_text: Some(text),
    }
}

pub fn password_reset_email(to: &str, user_name: &str, reset_url: &str) -> EmailMessage {
    let html = layout(
        "Reset your password",
        &[format!(
            "Hi {}, we received a request to reset your password.",
            escape_html(user_name)
        )],
        "Choose a new password",
        reset_url,
        "This link expires in 1 hour. If you did not ask for it, you can ignore this email.",
    );
    let text = format!(
        "Hi {user_name}, we received a request to reset your password.\n\nChoose a new one: {reset_url}\n\nThis link expires in 1 hour."
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body_html: Some(html),
        body_text: Some(text),
    }
}

pub fn admin_setup_email(to: &str, admin_name: &str, invited_by: &str, setup_url: &str) -> EmailMessage {
    let html = layout(
        "Set up your admin account",
        &[format!(
            "Hi {}, {} created a platform admin account for you.",
            escape_html(admin_name),
            escape_html(invited_by)
        )],
        "Set your password",
        setup_url,
        "This link expires in 48 hours and can be used once.",
    );
    let text = format!(
        "Hi {admin_name}, {invited_by} created a platform admin account for you.\n\nSet your password: {setup_url}\n\nThis link expires in 48 hours and can be used once."
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Set up your admin account".to_string(),
        body_html: Some(html),
        body_text: Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_is_escaped_in_html() {
        let msg = invitation_email("a@b.co", "<script>", "Acme & Co", "member", "https://x/invite/t");
        let html = msg.body_html.unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(msg.body_text.unwrap().contains("https://x/invite/t"));
    }
}
