use serde::{Deserialize, Serialize};

use super::{check_length, FieldErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration that passed validation.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl CreateUser {
    pub fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = required(&mut errors, "username", self.username);
        if let Some(username) = &username {
            check_length(&mut errors, "username", username, 3, Some(80));
        }
        let password = required(&mut errors, "password", self.password);
        if let Some(password) = &password {
            check_length(&mut errors, "password", password, 4, None);
        }
        let email = self.email.filter(|e| !e.trim().is_empty());
        if let Some(email) = &email {
            check_email(&mut errors, email);
        }

        match (username, password) {
            (Some(username), Some(password)) => errors.finish(NewUser {
                username,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUser {
    pub fn validate(self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        if let Some(username) = &self.username {
            check_length(&mut errors, "username", username, 3, Some(80));
        }
        if let Some(password) = &self.password {
            check_length(&mut errors, "password", password, 4, None);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }

        errors.finish(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

fn required(errors: &mut FieldErrors, field: &'static str, value: Option<String>) -> Option<String> {
    if value.is_none() {
        errors.add(field, "Missing data for required field.");
    }
    value
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add("email", "Not a valid email address.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(username: Option<&str>, password: Option<&str>, email: Option<&str>) -> CreateUser {
        CreateUser {
            username: username.map(Into::into),
            password: password.map(Into::into),
            email: email.map(Into::into),
        }
    }

    #[test]
    fn accepts_minimal_registration() {
        let user = create(Some("juan"), Some("1234"), None).validate().unwrap();
        assert_eq!(user.username, "juan");
        assert!(user.email.is_none());
    }

    #[test]
    fn reports_every_bad_field() {
        let errors = create(Some("ab"), None, Some("not-an-email"))
            .validate()
            .unwrap_err();

        assert!(errors.get("username").is_some());
        assert_eq!(
            errors.get("password").unwrap(),
            ["Missing data for required field."]
        );
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn email_shape() {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, "a@b.co");
        check_email(&mut errors, "a@b@c.co");
        check_email(&mut errors, "@b.co");
        check_email(&mut errors, "a@bco");
        assert_eq!(errors.get("email").unwrap().len(), 3);
    }

    #[test]
    fn password_never_serialized() {
        let user = User {
            id: 1,
            username: "juan".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            created_at: chrono::NaiveDateTime::default(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"user\""));
    }
}
