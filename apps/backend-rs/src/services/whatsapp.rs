use std::fmt::Write as _;

use chrono::NaiveDate;
use url::Url;

use crate::{models::Villa, services::date_range::format_display_date};

/// What the guest told us in the inquiry form.
#[derive(Debug, Clone, Default)]
pub struct InquiryDetails<'a> {
    pub guest_name: &'a str,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub note: Option<&'a str>,
}

pub fn normalize_phone(value: &str) -> Option<String> {
    let digits = value
        .chars()
        .filter(|character| character.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    Some(digits)
}

pub fn stay_nights(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> Option<i64> {
    let nights = (check_out? - check_in?).num_days();
    (nights > 0).then_some(nights)
}

pub fn inquiry_message(villa: &Villa, details: &InquiryDetails<'_>) -> String {
    let mut message = format!(
        "Hi! I'm interested in booking {} ({}).",
        villa.name, villa.location
    );

    if let Some(check_in) = details.check_in {
        let _ = write!(message, "\nCheck-in: {}", format_display_date(check_in, true));
    }
    if let Some(check_out) = details.check_out {
        let _ = write!(message, "\nCheck-out: {}", format_display_date(check_out, true));
    }
    if let Some(nights) = stay_nights(details.check_in, details.check_out) {
        let _ = write!(
            message,
            "\nStay: {nights} night{} (approx. ₹{})",
            if nights == 1 { "" } else { "s" },
            group_thousands(nights.saturating_mul(villa.price))
        );
    }
    if let Some(guests) = details.guests.filter(|guests| *guests > 0) {
        let _ = write!(message, "\nGuests: {guests}");
    }

    let name = details.guest_name.trim();
    if !name.is_empty() {
        let _ = write!(message, "\nName: {name}");
    }
    if let Some(note) = details.note.map(str::trim).filter(|note| !note.is_empty()) {
        let _ = write!(message, "\n{note}");
    }

    message
}

/// `https://wa.me/<digits>?text=<message>`, or `None` without a business number.
pub fn contact_url(phone: Option<&str>, message: &str) -> Option<String> {
    let digits = phone.and_then(normalize_phone)?;
    let base = format!("https://wa.me/{digits}");
    let url = if message.trim().is_empty() {
        Url::parse(&base)
    } else {
        Url::parse_with_params(&base, &[("text", message)])
    };
    url.ok().map(String::from)
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, character) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(character);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::villa;

    #[test]
    fn normalizes_phone_digits() {
        assert_eq!(normalize_phone("+91 98200-12345"), Some("919820012345".to_string()));
        assert_eq!(normalize_phone("n/a"), None);
    }

    #[test]
    fn counts_nights_only_for_forward_ranges() {
        let check_in = NaiveDate::from_ymd_opt(2026, 12, 20);
        let check_out = NaiveDate::from_ymd_opt(2026, 12, 23);
        assert_eq!(stay_nights(check_in, check_out), Some(3));
        assert_eq!(stay_nights(check_out, check_in), None);
        assert_eq!(stay_nights(check_in, None), None);
    }

    #[test]
    fn message_includes_stay_details() {
        let mut record = villa("v1", "Anjuna, Goa", 28_500, 2, 6);
        record.name = "Casa Azul".to_string();
        let details = InquiryDetails {
            guest_name: " Priya ",
            check_in: NaiveDate::from_ymd_opt(2026, 12, 20),
            check_out: NaiveDate::from_ymd_opt(2026, 12, 23),
            guests: Some(5),
            note: Some("Is early check-in possible?"),
        };
        let message = inquiry_message(&record, &details);
        assert!(message.starts_with("Hi! I'm interested in booking Casa Azul (Anjuna, Goa)."));
        assert!(message.contains("Check-in: 20/12/2026"));
        assert!(message.contains("Check-out: 23/12/2026"));
        assert!(message.contains("Stay: 3 nights (approx. ₹85,500)"));
        assert!(message.contains("Guests: 5"));
        assert!(message.contains("Name: Priya"));
        assert!(message.ends_with("Is early check-in possible?"));
    }

    #[test]
    fn minimal_message_has_only_greeting() {
        let record = villa("v1", "Goa", 1_000, 1, 2);
        let message = inquiry_message(&record, &InquiryDetails::default());
        assert_eq!(message, "Hi! I'm interested in booking Villa v1 (Goa).");
    }

    #[test]
    fn builds_encoded_wa_me_link() {
        let url = contact_url(Some("+91 98200 12345"), "Hi there & more").expect("url");
        assert!(url.starts_with("https://wa.me/919820012345?text="));
        assert!(url.contains("Hi+there+%26+more"));
        assert_eq!(contact_url(None, "hello"), None);
        assert_eq!(
            contact_url(Some("919820012345"), " ").as_deref(),
            Some("https://wa.me/919820012345")
        );
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(85_500), "85,500");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
