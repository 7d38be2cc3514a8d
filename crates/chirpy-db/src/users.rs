use tracing::info;

use chirpy_types::models::{User, UserId};
use chirpy_types::{Error, Result};

use crate::Database;

impl Database {
    /// Register a new account. The password is hashed before the writer lock
    /// is taken; the duplicate-email check and the insert share one critical
    /// section.
    pub fn create_user(&self, email: &str, password: &str) -> Result<User> {
        if email.is_empty() {
            return Err(Error::validation("email required"));
        }
        if password.is_empty() {
            return Err(Error::validation("password required"));
        }

        let password_hash = chirpy_crypto::hash_password(password)?;

        let user = self.with_doc_mut(|doc| {
            if doc.users.values().any(|u| u.email == email) {
                return Err(Error::validation("email already exists"));
            }

            let user = User {
                id: doc.next_user_id(),
                email: email.to_string(),
                password_hash,
                is_premium: false,
            };
            doc.users.insert(user.id, user.clone());
            Ok(user)
        })?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.with_doc(|doc| {
            doc.users
                .values()
                .find(|u| u.email == email)
                .cloned()
                .ok_or_else(|| Error::not_found("user"))
        })
    }

    pub fn get_user_by_id(&self, id: UserId) -> Result<User> {
        self.with_doc(|doc| {
            doc.users
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::not_found("user"))
        })
    }

    /// Overwrite the record at `user.id`. Last writer wins; there is no
    /// version check. Taking an email that belongs to another user is
    /// rejected.
    pub fn update_user(&self, user: &User) -> Result<()> {
        self.with_doc_mut(|doc| {
            if doc
                .users
                .values()
                .any(|u| u.id != user.id && u.email == user.email)
            {
                return Err(Error::validation("email already exists"));
            }

            doc.users.insert(user.id, user.clone());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn open() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("database.json")).unwrap();
        (dir, db)
    }

    #[test]
    fn create_then_lookup_by_email() {
        let (_dir, db) = open();

        let created = db.create_user("walt@example.com", "04234").unwrap();
        assert_eq!(created.id, 1);
        assert!(!created.is_premium);

        let found = db.get_user_by_email("walt@example.com").unwrap();
        assert_eq!(found, created);
        chirpy_crypto::verify_password(&found.password_hash, "04234").unwrap();
    }

    #[test]
    fn plaintext_never_reaches_disk() {
        let (_dir, db) = open();
        db.create_user("walt@example.com", "very-distinctive-secret").unwrap();

        let raw = fs::read_to_string(db.path()).unwrap();
        assert!(!raw.contains("very-distinctive-secret"));
    }

    #[test]
    fn ids_are_sequential() {
        let (_dir, db) = open();
        let a = db.create_user("a@example.com", "pw").unwrap();
        let b = db.create_user("b@example.com", "pw").unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(db.get_user_by_id(2).unwrap().email, "b@example.com");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, db) = open();
        db.create_user("dup@example.com", "pw1").unwrap();

        let err = db.create_user("dup@example.com", "pw2").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let doc = db.load().unwrap();
        let count = doc
            .users
            .values()
            .filter(|u| u.email == "dup@example.com")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_email_or_password_is_rejected() {
        let (_dir, db) = open();
        assert!(matches!(db.create_user("", "pw"), Err(Error::Validation(_))));
        assert!(matches!(
            db.create_user("a@example.com", ""),
            Err(Error::Validation(_))
        ));
        assert!(db.load().unwrap().users.is_empty());
    }

    #[test]
    fn missing_user_is_not_found() {
        let (_dir, db) = open();
        assert!(matches!(db.get_user_by_id(9), Err(Error::NotFound(_))));
        assert!(matches!(
            db.get_user_by_email("ghost@example.com"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn update_overwrites_record() {
        let (_dir, db) = open();
        let mut user = db.create_user("old@example.com", "pw").unwrap();

        user.email = "new@example.com".into();
        user.is_premium = true;
        db.update_user(&user).unwrap();

        let stored = db.get_user_by_id(user.id).unwrap();
        assert_eq!(stored.email, "new@example.com");
        assert!(stored.is_premium);
        assert!(db.get_user_by_email("old@example.com").is_err());
    }

    #[test]
    fn update_is_last_writer_wins() {
        let (_dir, db) = open();
        let user = db.create_user("a@example.com", "pw").unwrap();

        let mut first = user.clone();
        first.is_premium = true;
        let mut second = user.clone();
        second.email = "b@example.com".into();

        db.update_user(&first).unwrap();
        db.update_user(&second).unwrap();

        let stored = db.get_user_by_id(user.id).unwrap();
        assert_eq!(stored.email, "b@example.com");
        assert!(!stored.is_premium);
    }

    #[test]
    fn update_cannot_steal_another_users_email() {
        let (_dir, db) = open();
        db.create_user("taken@example.com", "pw").unwrap();
        let mut other = db.create_user("other@example.com", "pw").unwrap();

        other.email = "taken@example.com".into();
        let err = db.update_user(&other).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
