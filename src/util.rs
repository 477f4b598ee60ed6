const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

const TELEGRAM_CHAT_IDS: &str = "TELEGRAM_CHAT_IDS";

const SMTP_USERNAME: &str = "SMTP_USERNAME";

const SMTP_PASSWORD: &str = "SMTP_PASSWORD";

const EMAIL_RECIPIENT: &str = "EMAIL_RECIPIENT";

const TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";

const TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn get_telegram_token() -> Option<String> {
    non_empty_var(TELEGRAM_BOT_TOKEN)
}

pub fn get_telegram_chat_ids() -> Option<Vec<String>> {
    non_empty_var(TELEGRAM_CHAT_IDS).map(|ids| split_list(&ids))
}

pub fn get_smtp_credentials() -> Option<(String, String)> {
    Some((non_empty_var(SMTP_USERNAME)?, non_empty_var(SMTP_PASSWORD)?))
}

pub fn get_email_recipient() -> Option<String> {
    non_empty_var(EMAIL_RECIPIENT)
}

pub fn get_twilio_credentials() -> Option<(String, String)> {
    Some((
        non_empty_var(TWILIO_ACCOUNT_SID)?,
        non_empty_var(TWILIO_AUTH_TOKEN)?,
    ))
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Masks all but the last four characters of a credential or phone number.
pub fn mask(value: &str) -> String {
    let chars = value.chars().collect::<Vec<_>>();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}
