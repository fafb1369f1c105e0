use crate::models::user::{User, UserPresenceResponse};
use crate::utils::text::safe_name;

/// Immutable per-connection identity. Built once when the connection is
/// accepted and passed explicitly to every handler invocation.
///
/// The presence identifier hashes the transport-level connection id, not
/// the user id: the same user reconnecting gets a fresh handle.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub conn_id: String,
    pub user: User,
    pub presence_id: String,
    pub avatar: String,
    pub safe_name: String,
}

impl ConnectionContext {
    pub fn new(conn_id: String, user: User) -> Self {
        let presence_id = format!("{:x}", md5::compute(conn_id.as_bytes()));
        let avatar = format!(
            "{:x}",
            md5::compute(user.email.trim().to_lowercase().as_bytes())
        );
        let safe_name = safe_name(&user.name);

        ConnectionContext {
            conn_id,
            user,
            presence_id,
            avatar,
            safe_name,
        }
    }

    /// Presence entry for this connection, scoped to a room.
    pub fn presence(&self, room: &str) -> UserPresenceResponse {
        UserPresenceResponse {
            id: self.presence_id.clone(),
            name: self.user.name.clone(),
            safe_name: self.safe_name.clone(),
            avatar: self.avatar.clone(),
            room: room.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::current_timestamp_millis;

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            name: "Ada Lovelace".to_string(),
            email: " Ada@Example.com ".to_string(),
            created_at: current_timestamp_millis(),
        }
    }

    #[test]
    fn test_presence_id_is_connection_scoped() {
        let a = ConnectionContext::new("conn-a".to_string(), user());
        let b = ConnectionContext::new("conn-b".to_string(), user());
        assert_ne!(a.presence_id, b.presence_id);
        assert_ne!(a.presence_id, a.user.id);
    }

    #[test]
    fn test_avatar_normalizes_email() {
        let ctx = ConnectionContext::new("conn-a".to_string(), user());
        let expected = format!("{:x}", md5::compute(b"ada@example.com"));
        assert_eq!(ctx.avatar, expected);
    }

    #[test]
    fn test_safe_name_derived() {
        let ctx = ConnectionContext::new("conn-a".to_string(), user());
        assert_eq!(ctx.safe_name, "AdaLovelace");
    }
}
