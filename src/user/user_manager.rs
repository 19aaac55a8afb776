use super::{
    auth::MoodifyHasher, AuthToken, AuthTokenValue, UserAuthCredentials, UserStore,
    UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

pub struct UserManager {
    user_store: Arc<Mutex<Box<dyn UserStore>>>,
}

impl UserManager {
    pub fn new(user_store: Box<dyn UserStore>) -> Self {
        Self {
            user_store: Arc::new(Mutex::new(user_store)),
        }
    }

    /// Creates a user together with its password credentials.
    pub fn register(&self, user_handle: &str, password: &str) -> Result<usize> {
        let user_store = self.user_store.lock().unwrap();

        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.");
        }
        if user_store.get_user_id(user_handle)?.is_some() {
            bail!("Username already exists.");
        }

        let user_id = user_store.create_user(user_handle)?;
        let credentials = UserAuthCredentials {
            user_id,
            username_password: Some(Self::create_hashed_password(user_id, password)?),
        };
        user_store.update_user_auth_credentials(credentials)?;

        Ok(user_id)
    }

    /// Verifies the password and, on success, mints a new auth token.
    /// Returns Ok(None) when the user does not exist, has no password
    /// credentials, or the password does not match.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let user_store = self.user_store.lock().unwrap();

        let credentials = match user_store.get_user_auth_credentials(user_handle)? {
            Some(credentials) => credentials,
            None => return Ok(None),
        };
        let password_credentials = match credentials.username_password {
            Some(password_credentials) => password_credentials,
            None => return Ok(None),
        };

        let verified = password_credentials.hasher.verify(
            password,
            password_credentials.hash.as_str(),
            password_credentials.salt.as_str(),
        )?;
        if !verified {
            return Ok(None);
        }

        let token = AuthToken {
            user_id: credentials.user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        user_store.add_user_auth_token(token.clone())?;
        Ok(Some(token))
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let user_store = self.user_store.lock().unwrap();
        let token = user_store.get_user_auth_token(value)?;
        if token.is_some() {
            user_store.update_user_auth_token_last_used_timestamp(value)?;
        }
        Ok(token)
    }

    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        match user_store.delete_user_auth_token(token_value)? {
            Some(removed) => {
                if removed.user_id == user_id {
                    Ok(())
                } else {
                    user_store.add_user_auth_token(removed.clone())?;
                    bail!(
                        "Tried to delete auth token of user {}, but the authenticated user {} was not the owner.",
                        removed.user_id,
                        user_id
                    )
                }
            }
            None => bail!("Auth token not found"),
        }
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<String> {
        self.user_store
            .lock()
            .unwrap()
            .get_user_handle(user_id)?
            .with_context(|| format!("User {} not found.", user_id))
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.lock().unwrap().get_all_user_handles()
    }

    fn create_hashed_password(
        user_id: usize,
        password: &str,
    ) -> Result<UsernamePasswordCredentials> {
        let hasher = MoodifyHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::super::sqlite_user_store::SqliteUserStore;
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_manager() -> (UserManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(temp_dir.path().join("test.db")).unwrap();
        (UserManager::new(Box::new(store)), temp_dir)
    }

    #[test]
    fn register_rejects_duplicate_handles() {
        let (manager, _temp_dir) = create_tmp_manager();

        manager.register("alice", "pw1").unwrap();
        let err = manager.register("alice", "pw2").unwrap_err();
        assert_eq!(err.to_string(), "Username already exists.");
    }

    #[test]
    fn login_mints_a_token_on_the_right_password() {
        let (manager, _temp_dir) = create_tmp_manager();
        let user_id = manager.register("alice", "correct horse").unwrap();

        assert!(manager.login("alice", "wrong").unwrap().is_none());
        assert!(manager.login("bob", "correct horse").unwrap().is_none());

        let token = manager.login("alice", "correct horse").unwrap().unwrap();
        assert_eq!(token.user_id, user_id);

        let fetched = manager.get_auth_token(&token.value).unwrap().unwrap();
        assert_eq!(fetched.user_id, user_id);
    }

    #[test]
    fn only_the_owner_can_delete_a_token() {
        let (manager, _temp_dir) = create_tmp_manager();
        let alice_id = manager.register("alice", "pw").unwrap();
        let bob_id = manager.register("bob", "pw").unwrap();

        let token = manager.login("alice", "pw").unwrap().unwrap();

        assert!(manager.delete_auth_token(bob_id, &token.value).is_err());
        // The token survives the rejected deletion.
        assert!(manager.get_auth_token(&token.value).unwrap().is_some());

        manager.delete_auth_token(alice_id, &token.value).unwrap();
        assert!(manager.get_auth_token(&token.value).unwrap().is_none());
    }

    #[test]
    fn resolves_user_handles() {
        let (manager, _temp_dir) = create_tmp_manager();
        let user_id = manager.register("alice", "pw").unwrap();

        assert_eq!(manager.get_user_handle(user_id).unwrap(), "alice");
        assert!(manager.get_user_handle(999).is_err());
        assert_eq!(manager.get_all_user_handles().unwrap(), vec!["alice"]);
    }
}
