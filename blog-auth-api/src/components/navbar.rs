//! Session-aware navigation bar.

use std::sync::{Arc, Mutex, PoisonError};

use super::LOGIN_ROUTE;
use crate::client::{AuthClient, ClientError};
use crate::responses::UserResponse;
use crate::session_store::{SessionState, SessionStore, Subscription};

pub const AVATAR_BASE_URL: &str = "https://api.dicebear.com/9.x/adventurer/svg";

/// Identity shown for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBadge {
    pub avatar_url: String,
    pub fallback: String,
    pub label: String,
}

impl UserBadge {
    pub fn for_user(user: &UserResponse) -> Self {
        let seed = avatar_seed(user);
        let avatar_url = match user.image.as_deref() {
            Some(image) if !image.is_empty() => image.to_string(),
            _ => avatar_url(&seed),
        };

        Self {
            avatar_url,
            fallback: initials(user),
            label: seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavbarView {
    /// Session not read yet.
    Pending,
    Authenticated(UserBadge),
    Anonymous { login_href: &'static str },
}

impl NavbarView {
    pub fn from_state(state: &SessionState) -> Self {
        if state.is_pending {
            return Self::Pending;
        }
        match state.user() {
            Some(user) => Self::Authenticated(UserBadge::for_user(user)),
            None => Self::Anonymous {
                login_href: LOGIN_ROUTE,
            },
        }
    }

    pub fn can_sign_out(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Placeholder avatar for `seed`, percent-encoded into the query string.
pub fn avatar_url(seed: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("seed", seed)
        .finish();
    format!("{AVATAR_BASE_URL}?{query}")
}

/// First word of the name, else the local part of the email.
pub fn avatar_seed(user: &UserResponse) -> String {
    let first_name = user.name.split(' ').next().unwrap_or_default();
    if first_name.is_empty() {
        user.email.split('@').next().unwrap_or_default().to_string()
    } else {
        first_name.to_string()
    }
}

pub fn initials(user: &UserResponse) -> String {
    let from_name: String = user
        .name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if from_name.is_empty() {
        user.email
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    } else {
        from_name
    }
}

/// Mounted navigation bar. Re-renders on every session store change until
/// unmounted.
pub struct Navbar {
    view: Arc<Mutex<NavbarView>>,
    subscription: Subscription,
}

impl Navbar {
    pub fn mount(store: &Arc<SessionStore>) -> Self {
        Self::mount_with(store, |_| {})
    }

    /// Like [`Navbar::mount`], calling `render` with each new view.
    pub fn mount_with<R>(store: &Arc<SessionStore>, render: R) -> Self
    where
        R: Fn(&NavbarView) + Send + Sync + 'static,
    {
        let view = Arc::new(Mutex::new(NavbarView::Pending));
        let sink = Arc::clone(&view);

        let subscription = store.subscribe(move |state| {
            let next = NavbarView::from_state(state);
            render(&next);
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = next;
        });

        Self { view, subscription }
    }

    pub fn view(&self) -> NavbarView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Signs out through the client. The view changes only when the client
    /// publishes the new session state.
    pub async fn sign_out<C: AuthClient>(&self, client: &C) -> Result<(), ClientError> {
        client
            .sign_out()
            .await
            .map(|_| ())
            .inspect_err(|e| tracing::error!(error = %e, "sign out failed"))
    }

    pub fn unmount(self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{SignInEmailRequest, SignUpEmailRequest};
    use crate::responses::{AuthResponse, SessionData, SessionResponse, SignOutResponse};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn user(name: &str, email: &str) -> UserResponse {
        let now = Utc::now();
        UserResponse {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn signed_in(user: UserResponse) -> SessionState {
        let now = Utc::now();
        SessionState::authenticated(SessionData {
            session: SessionResponse {
                id: Uuid::new_v4(),
                user_id: user.id,
                expires_at: now + chrono::Duration::days(7),
                ip_address: Some("127.0.0.1".to_string()),
                user_agent: None,
                created_at: now,
                updated_at: now,
            },
            user,
        })
    }

    /// Publishes anonymous state on sign-out, like the HTTP client does.
    struct StoreBackedClient {
        store: Arc<SessionStore>,
        sign_outs: AtomicUsize,
    }

    impl AuthClient for StoreBackedClient {
        async fn sign_in_email(
            &self,
            _request: SignInEmailRequest,
        ) -> Result<AuthResponse, ClientError> {
            Err(ClientError::Decode("unused".to_string()))
        }

        async fn sign_up_email(
            &self,
            _request: SignUpEmailRequest,
        ) -> Result<AuthResponse, ClientError> {
            Err(ClientError::Decode("unused".to_string()))
        }

        async fn sign_out(&self) -> Result<SignOutResponse, ClientError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            self.store.set(SessionState::anonymous());
            Ok(SignOutResponse { success: true })
        }

        async fn get_session(&self) -> Result<Option<SessionData>, ClientError> {
            Ok(self.store.current().data)
        }
    }

    #[test]
    fn pending_state_renders_placeholder() {
        assert_eq!(
            NavbarView::from_state(&SessionState::pending()),
            NavbarView::Pending
        );
        assert!(!NavbarView::Pending.can_sign_out());
    }

    #[test]
    fn anonymous_state_renders_login_link() {
        assert_eq!(
            NavbarView::from_state(&SessionState::anonymous()),
            NavbarView::Anonymous {
                login_href: "/login"
            }
        );
    }

    #[test]
    fn authenticated_state_renders_seeded_avatar() {
        let view = NavbarView::from_state(&signed_in(user("Ada Lovelace", "ada@x.com")));
        let NavbarView::Authenticated(badge) = view else {
            panic!("expected authenticated view");
        };
        assert_eq!(
            badge.avatar_url,
            "https://api.dicebear.com/9.x/adventurer/svg?seed=Ada"
        );
        assert_eq!(badge.fallback, "AL");
        assert_eq!(badge.label, "Ada");
    }

    #[test]
    fn avatar_seed_is_percent_encoded() {
        let badge = UserBadge::for_user(&user("A&B Studio", "ab@x.com"));

        assert_eq!(badge.label, "A&B");
        assert_eq!(
            badge.avatar_url,
            "https://api.dicebear.com/9.x/adventurer/svg?seed=A%26B"
        );
        assert_eq!(
            avatar_url("o'neil#1"),
            "https://api.dicebear.com/9.x/adventurer/svg?seed=o%27neil%231"
        );
    }

    #[test]
    fn seed_falls_back_to_email_local_part() {
        let u = user("", "grace@x.com");
        assert_eq!(avatar_seed(&u), "grace");
        assert_eq!(initials(&u), "G");
    }

    #[test]
    fn profile_image_wins_over_placeholder() {
        let mut u = user("Ada", "ada@x.com");
        u.image = Some("https://cdn.example.com/ada.png".to_string());
        assert_eq!(
            UserBadge::for_user(&u).avatar_url,
            "https://cdn.example.com/ada.png"
        );
    }

    #[test]
    fn seed_is_deterministic() {
        let a = UserBadge::for_user(&user("Ada Lovelace", "ada@x.com"));
        let b = UserBadge::for_user(&user("Ada Byron", "other@x.com"));
        assert_eq!(a.avatar_url, b.avatar_url);
    }

    #[test]
    fn mounted_navbar_follows_store() {
        let store = Arc::new(SessionStore::new());
        let renders = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&renders);
        let navbar = Navbar::mount_with(&store, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(navbar.view(), NavbarView::Pending);

        store.set(signed_in(user("Ada", "ada@x.com")));
        assert!(navbar.view().can_sign_out());

        store.set(SessionState::anonymous());
        assert!(matches!(navbar.view(), NavbarView::Anonymous { .. }));
        assert_eq!(renders.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn sign_out_rerenders_through_store() {
        let store = Arc::new(SessionStore::new());
        store.set(signed_in(user("Ada", "ada@x.com")));
        let navbar = Navbar::mount(&store);
        assert!(navbar.view().can_sign_out());

        let client = StoreBackedClient {
            store: Arc::clone(&store),
            sign_outs: AtomicUsize::new(0),
        };
        navbar.sign_out(&client).await.expect("sign out");

        assert_eq!(client.sign_outs.load(Ordering::SeqCst), 1);
        assert!(matches!(navbar.view(), NavbarView::Anonymous { .. }));
    }

    #[test]
    fn unmount_deregisters() {
        let store = Arc::new(SessionStore::new());
        let navbar = Navbar::mount(&store);
        assert_eq!(store.subscriber_count(), 1);

        navbar.unmount();
        assert_eq!(store.subscriber_count(), 0);
    }
}
