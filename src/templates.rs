//! Email subjects and HTML bodies for the auth flows.

pub mod subjects {
    pub const REGISTER: &str = "Welcome to SSO-Auth : Confirm Your Registration";
    pub const ACCOUNT_LINKING: &str = "Welcome to SSO-Auth : Confirm Your Email";
    pub const WELCOME: &str = "Welcome to SSO-Auth : Registered Successfully";
    pub const RESEND_OTP: &str = "Welcome to SSO-Auth : Resend OTP Email Sent!";
    pub const FORGOT_PASSWORD: &str = "Password reset email";
    pub const PASSWORD_RESET_CONFIRMATION: &str =
        "Welcome to SSO-Auth : Password Reset Confirmation";
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin:0;padding:0;background-color:#0B0D12;font-family:sans-serif;color:#FFFFFF;">
    {body}
  </body>
</html>"#
    )
}

fn otp_card(title: &str, intro: &str, otp: &str) -> String {
    layout(&format!(
        r#"<div style="max-width:600px;margin:30px auto;padding:40px;background-color:#1E2129;border-radius:16px;">
      <h1 style="margin:0;font-size:28px;font-weight:600;">{title}</h1>
      <p style="font-size:14px;color:#8F9094;">{intro}</p>
      <h2 style="margin:0;font-size:28px;font-weight:700;">{otp}</h2>
      <p style="font-size:14px;color:#8F9094;">Please enter this code on the verification page. This OTP is valid for a limited time.</p>
    </div>"#
    ))
}

pub fn registration(full_name: &str, otp: &str) -> String {
    otp_card(
        "Confirm Your Registration",
        &format!(
            "Hi <b>{full_name}</b>, thank you for registering with SSO-Auth. \
             To complete the email verification process, please use this One-Time Password (OTP)."
        ),
        otp,
    )
}

pub fn forgot_password(full_name: &str, otp: &str) -> String {
    otp_card(
        "Password Reset",
        &format!(
            "Hi <b>{full_name}</b>, we received a request to reset the password for your \
             SSO-Auth account. Use this One-Time Password (OTP) to continue."
        ),
        otp,
    )
}

pub fn resend_otp(full_name: &str, otp: &str) -> String {
    otp_card(
        "OTP Verification",
        &format!(
            "Hi <b>{full_name}</b>, here is the new One-Time Password (OTP) you requested. \
             Any previously sent code is no longer valid."
        ),
        otp,
    )
}

pub fn account_linking(full_name: &str, otp: &str) -> String {
    otp_card(
        "Confirm Your Email",
        &format!(
            "Hi <b>{full_name}</b>, a social login tried to attach itself to your SSO-Auth \
             account. Enter this One-Time Password (OTP) to confirm you own this email."
        ),
        otp,
    )
}

pub fn welcome(full_name: &str) -> String {
    layout(&format!(
        r#"<div style="max-width:600px;margin:30px auto;padding:32px;background-color:#101217;border-radius:24px;">
      <h1 style="font-size:26px;font-weight:600;margin:0;">Welcome to SSO-Auth</h1>
      <h2 style="font-size:16px;font-weight:400;">Hi <span style="font-weight:600;">{full_name}</span></h2>
      <p style="font-size:14px;">Your email is verified and your account is ready to use.</p>
      <span>Thanks,</span>
      <span style="display:block;font-weight:600;">SSO-Auth</span>
    </div>"#
    ))
}

pub fn password_reset_confirmation(full_name: &str) -> String {
    layout(&format!(
        r#"<div style="max-width:600px;margin:30px auto;padding:40px;background-color:#1E2129;border-radius:16px;">
      <h1 style="margin:0;font-size:28px;font-weight:600;">Password Reset Confirmation</h1>
      <h2 style="font-size:16px;font-weight:400;">Hi <span style="font-weight:600;">{full_name}</span></h2>
      <p style="font-size:14px;color:#8F9094;">Your password has been successfully reset.</p>
      <p style="font-size:14px;color:#8F9094;">If you did not request this action, please contact our support team immediately.</p>
    </div>"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_templates_embed_name_and_code() {
        for html in [
            registration("Jane Doe", "1234"),
            forgot_password("Jane Doe", "1234"),
            resend_otp("Jane Doe", "1234"),
            account_linking("Jane Doe", "1234"),
        ] {
            assert!(html.contains("Jane Doe"));
            assert!(html.contains("1234"));
        }
    }

    #[test]
    fn welcome_has_no_otp_placeholder() {
        let html = welcome("Jane Doe");
        assert!(html.contains("Jane Doe"));
        assert!(!html.contains("OTP"));
    }
}
