use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};

/// Account record as persisted in the store, keyed by email.
///
/// Not serializable: the only outward view is [`AccountSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub name: String,
    pub password_hash: String, // Argon2 PHC string
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public projection of an account: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub email: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AccountSummary {
    pub fn created_at_display(&self) -> String {
        self.created_at
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute] UTC"
            ))
            .unwrap_or_else(|_| self.created_at.to_string())
    }
}

/// Identity carried by an authenticated session.
///
/// Only produced by a successful `authenticate` or read back from the
/// session, so holding one is proof that the request is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Account {
        Account {
            email: "ada@x.com".into(),
            name: "Ada".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            created_at: datetime!(2024-03-01 09:30:00 UTC),
        }
    }

    #[test]
    fn summary_serializes_iso_timestamp() {
        let json = serde_json::to_value(sample().summary()).unwrap();
        assert_eq!(json["email"], "ada@x.com");
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["created_at"], "2024-03-01T09:30:00Z");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn summary_display_date() {
        assert_eq!(sample().summary().created_at_display(), "2024-03-01 09:30 UTC");
    }
}
