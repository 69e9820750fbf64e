use askama::Template;
use serde_json::Value;

const DEFAULT_EXPIRES_MINUTES: u64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailTemplate {
    UserActivation,
    SellerActivation,
    ForgotPassword,
}

#[derive(Template)]
#[template(path = "user-activation-mail.html")]
struct UserActivationMail<'a> {
    name: &'a str,
    otp: &'a str,
    expires_minutes: u64,
}

#[derive(Template)]
#[template(path = "seller-activation.html")]
struct SellerActivationMail<'a> {
    name: &'a str,
    otp: &'a str,
    expires_minutes: u64,
}

#[derive(Template)]
#[template(path = "forgot-password-user-mail.html")]
struct ForgotPasswordMail<'a> {
    name: &'a str,
    otp: &'a str,
    expires_minutes: u64,
}

impl EmailTemplate {
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::UserActivation => "user-activation-mail",
            Self::SellerActivation => "seller-activation",
            Self::ForgotPassword => "forgot-password-user-mail",
        }
    }

    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::UserActivation | Self::SellerActivation => "Verify your email",
            Self::ForgotPassword => "Reset your password",
        }
    }

    /// Render the HTML body. `data` carries `name`, `otp` and `expires_minutes`.
    ///
    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render(self, data: &Value) -> askama::Result<String> {
        let name = data.get("name").and_then(Value::as_str).unwrap_or("there");
        let otp = data.get("otp").and_then(Value::as_str).unwrap_or_default();
        let expires_minutes = data
            .get("expires_minutes")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_EXPIRES_MINUTES);

        match self {
            Self::UserActivation => UserActivationMail {
                name,
                otp,
                expires_minutes,
            }
            .render(),
            Self::SellerActivation => SellerActivationMail {
                name,
                otp,
                expires_minutes,
            }
            .render(),
            Self::ForgotPassword => ForgotPasswordMail {
                name,
                otp,
                expires_minutes,
            }
            .render(),
        }
    }
}
