//! Session manager: orchestrates creation, rotation, validation, listing,
//! and invalidation of sessions for one principal kind.
//!
//! Staff and student managers share the same machinery and differ in two
//! injected facts: the kind-scoped token codec (distinct signing secret and
//! access TTL) and the device policy. Student sessions are single-device --
//! every new login unconditionally invalidates all of the student's prior
//! sessions first. Staff may hold any number of concurrent sessions, each
//! individually listable and revocable.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use campus_core::device::{classify_user_agent, DeviceInfo};
use campus_core::principal::{Principal, PrincipalKind};
use campus_core::types::{DbId, Timestamp};

use crate::directory::PrincipalDirectory;
use crate::error::{SessionError, SessionResult};
use crate::jwt::{hash_token, TokenCodec, TokenKind};
use crate::revocation::{RevocationRegistry, RevokeReason};
use crate::store::{SessionRecord, SessionStore};

/// Request-derived context captured at session creation.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Token pair and metadata returned by `create_session` and `refresh`.
#[derive(Debug, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub session_id: Uuid,
    pub device_info: DeviceInfo,
}

/// Result of validating an access token against its session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub principal_id: DbId,
    pub college_id: DbId,
    pub session_id: Uuid,
    pub device_info: DeviceInfo,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    pub expires_at: Timestamp,
}

/// One entry in a principal's device listing. Never carries token material.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub device_info: DeviceInfo,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Session manager for one principal kind.
pub struct SessionManager {
    kind: PrincipalKind,
    /// When set, `create_session` first force-closes every prior session of
    /// the principal. Hard policy for students; never set for staff.
    single_device: bool,
    codec: TokenCodec,
    store: Arc<dyn SessionStore>,
    revocations: Arc<dyn RevocationRegistry>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl SessionManager {
    /// Multi-device manager for staff principals.
    pub fn staff(
        codec: TokenCodec,
        store: Arc<dyn SessionStore>,
        revocations: Arc<dyn RevocationRegistry>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        debug_assert_eq!(codec.kind(), PrincipalKind::Staff);
        Self {
            kind: PrincipalKind::Staff,
            single_device: false,
            codec,
            store,
            revocations,
            directory,
        }
    }

    /// Single-device manager for student principals.
    pub fn student(
        codec: TokenCodec,
        store: Arc<dyn SessionStore>,
        revocations: Arc<dyn RevocationRegistry>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        debug_assert_eq!(codec.kind(), PrincipalKind::Student);
        Self {
            kind: PrincipalKind::Student,
            single_device: true,
            codec,
            store,
            revocations,
            directory,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Create a new session for an already-authenticated principal.
    ///
    /// The caller has verified credentials/OTP; this mints the token pair,
    /// classifies the device, and persists the session. Nothing is returned
    /// unless the durable write succeeded, so no token the client holds can
    /// reference a session that was never recorded.
    pub async fn create_session(
        &self,
        principal: &Principal,
        ctx: &DeviceContext,
    ) -> SessionResult<SessionTokens> {
        if self.single_device {
            // Unconditional, even when the principal has zero sessions.
            self.invalidate_all(principal.id, None, RevokeReason::SingleDeviceEnforcement)
                .await?;
        }

        let session_id = Uuid::new_v4();
        let access_token = self.codec.issue(principal, TokenKind::Access, session_id)?;
        let refresh_token = self.codec.issue(principal, TokenKind::Refresh, session_id)?;

        let device = classify_user_agent(ctx.user_agent.as_deref());
        let now = Utc::now();
        let record = SessionRecord {
            session_id,
            principal_id: principal.id,
            principal_kind: self.kind,
            refresh_token_hash: hash_token(&refresh_token),
            device: device.clone(),
            ip_address: ctx.ip_address.clone(),
            created_at: now,
            last_used_at: now,
            expires_at: now + self.codec.session_lifetime(),
            is_active: true,
        };

        self.store.put(&record).await?;
        self.store
            .index_add(self.kind, principal.id, session_id)
            .await?;

        tracing::info!(
            principal_id = principal.id,
            kind = %self.kind,
            %session_id,
            device = %device.device_type,
            "Session created"
        );

        Ok(SessionTokens {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.codec.access_expires_in(),
            session_id,
            device_info: device,
        })
    }

    /// Exchange a valid refresh token for a new token pair.
    ///
    /// Rotation is mandatory: the presented token is single-use, its hash is
    /// revoked, and the session's credential swings to the new token via a
    /// compare-and-swap. Of two concurrent refreshes with the same token,
    /// exactly one wins the swap; the loser fails as `InvalidToken` and the
    /// client must retry with the winner's token or re-authenticate. Steps
    /// before the swap mutate no state.
    pub async fn refresh(
        &self,
        session_id: Uuid,
        refresh_token: &str,
    ) -> SessionResult<SessionTokens> {
        let now = Utc::now();

        // 1. Session must exist and be inside its lifetime.
        let record = self
            .store
            .lookup(self.kind, session_id)
            .await?
            .ok_or(SessionError::InvalidSession)?;
        if record.is_expired(now) {
            self.remove_expired(&record).await;
            return Err(SessionError::InvalidSession);
        }

        // 2. The token itself must verify and be a refresh token bound to
        //    this session.
        let claims = self.codec.decode(refresh_token)?;
        self.codec.validate_type(&claims, TokenKind::Refresh)?;
        if claims.sid != session_id {
            return Err(SessionError::InvalidToken);
        }

        // 3. It must be the session's CURRENT credential. A replayed
        //    pre-rotation token fails here because the hash moved on.
        let presented_hash = hash_token(refresh_token);
        if presented_hash != record.refresh_token_hash {
            return Err(SessionError::InvalidToken);
        }

        // 4. Defense in depth against cross-session reuse of a retired hash.
        if self.revocations.is_revoked(&presented_hash).await? {
            return Err(SessionError::TokenRevoked);
        }

        // 5. The owner must still be allowed to authenticate.
        let principal = self
            .directory
            .find(self.kind, record.principal_id)
            .await?
            .ok_or(SessionError::PrincipalNotFound)?;

        // 6. Mint the replacement pair.
        let access_token = self.codec.issue(&principal, TokenKind::Access, session_id)?;
        let new_refresh = self.codec.issue(&principal, TokenKind::Refresh, session_id)?;
        let new_hash = hash_token(&new_refresh);

        // 7. Retire the presented token before the swap lands. The expiry
        //    for the registry entry comes from the token's own (unverified)
        //    exp claim -- safe only because the hash match above already
        //    authenticated the token.
        let ttl = self.codec.remaining_lifetime(refresh_token);
        self.revocations
            .revoke(&presented_hash, RevokeReason::Rotated, ttl)
            .await?;

        // 8. Compare-and-swap to the new credential.
        let swapped = self
            .store
            .update_refresh_hash(self.kind, session_id, &presented_hash, &new_hash, now)
            .await?;
        if !swapped {
            // A concurrent refresh won; this caller loses.
            return Err(SessionError::InvalidToken);
        }

        tracing::debug!(principal_id = principal.id, kind = %self.kind, %session_id, "Refresh token rotated");

        Ok(SessionTokens {
            access_token,
            refresh_token: new_refresh,
            token_type: "bearer",
            expires_in: self.codec.access_expires_in(),
            session_id,
            device_info: record.device,
        })
    }

    /// Validate an access token and return its session context.
    ///
    /// Side-effect-free on failure. On success the session's `last_used_at`
    /// is updated best-effort: a store hiccup on that bookkeeping write is
    /// logged, not surfaced.
    pub async fn validate(&self, access_token: &str) -> SessionResult<SessionInfo> {
        let claims = self.codec.decode(access_token)?;
        self.codec.validate_type(&claims, TokenKind::Access)?;

        let now = Utc::now();
        let record = self
            .store
            .lookup(self.kind, claims.sid)
            .await?
            .ok_or(SessionError::InvalidSession)?;
        if record.is_expired(now) {
            return Err(SessionError::InvalidSession);
        }

        if let Err(e) = self
            .store
            .update_last_used(self.kind, record.session_id, now)
            .await
        {
            tracing::warn!(error = ?e, session_id = %record.session_id, "Failed to update session activity");
        }

        Ok(SessionInfo {
            principal_id: record.principal_id,
            college_id: claims.cid,
            session_id: record.session_id,
            device_info: record.device,
            created_at: record.created_at,
            last_used_at: now,
            expires_at: record.expires_at,
        })
    }

    /// Invalidate one session owned by `principal_id`.
    ///
    /// Idempotent: unknown, already-invalidated, or foreign session ids are
    /// a no-op success (nothing is leaked about other principals' sessions).
    pub async fn invalidate_session(
        &self,
        session_id: Uuid,
        principal_id: DbId,
    ) -> SessionResult<()> {
        let Some(record) = self.store.lookup(self.kind, session_id).await? else {
            return Ok(());
        };
        if record.principal_id != principal_id {
            return Ok(());
        }
        self.invalidate_record(&record, RevokeReason::ManualLogout)
            .await
    }

    /// Invalidate every session of a principal, optionally sparing one
    /// (logout-everywhere-else).
    pub async fn invalidate_all_sessions(
        &self,
        principal_id: DbId,
        except_session_id: Option<Uuid>,
    ) -> SessionResult<()> {
        self.invalidate_all(principal_id, except_session_id, RevokeReason::LogoutAll)
            .await
    }

    /// List a principal's live sessions. Expired entries discovered along
    /// the way are cleaned up and skipped. Refresh-token material is never
    /// included.
    pub async fn list_sessions(&self, principal_id: DbId) -> SessionResult<Vec<SessionSummary>> {
        let now = Utc::now();
        let mut summaries = Vec::new();
        for session_id in self.store.index_members(self.kind, principal_id).await? {
            let Some(record) = self.store.lookup(self.kind, session_id).await? else {
                continue;
            };
            if record.is_expired(now) {
                self.remove_expired(&record).await;
                continue;
            }
            summaries.push(SessionSummary {
                session_id: record.session_id,
                device_info: record.device,
                ip_address: record.ip_address,
                created_at: record.created_at,
                last_used_at: record.last_used_at,
                expires_at: record.expires_at,
            });
        }
        Ok(summaries)
    }

    async fn invalidate_all(
        &self,
        principal_id: DbId,
        except_session_id: Option<Uuid>,
        reason: RevokeReason,
    ) -> SessionResult<()> {
        for session_id in self.store.index_members(self.kind, principal_id).await? {
            if Some(session_id) == except_session_id {
                continue;
            }
            let Some(record) = self.store.lookup(self.kind, session_id).await? else {
                // Nothing live behind this index entry; drop it.
                self.store
                    .index_remove(self.kind, principal_id, session_id)
                    .await?;
                continue;
            };
            self.invalidate_record(&record, reason).await?;
        }
        Ok(())
    }

    /// Revoke the current credential and tear the session down.
    async fn invalidate_record(
        &self,
        record: &SessionRecord,
        reason: RevokeReason,
    ) -> SessionResult<()> {
        // Only the hash is at hand (never the token), so its exp claim is
        // unreadable; use the conservative maximum refresh lifetime.
        self.revocations
            .revoke(
                &record.refresh_token_hash,
                reason,
                self.codec.max_refresh_ttl_secs(),
            )
            .await?;
        self.store.deactivate(self.kind, record.session_id).await?;
        self.store
            .index_remove(self.kind, record.principal_id, record.session_id)
            .await?;
        tracing::info!(
            principal_id = record.principal_id,
            kind = %self.kind,
            session_id = %record.session_id,
            ?reason,
            "Session invalidated"
        );
        Ok(())
    }

    /// Lazy cleanup of a session found past its expiry. Best-effort: the
    /// session is already unusable either way. No revocation entry is
    /// written -- the refresh token is past its own exp too.
    async fn remove_expired(&self, record: &SessionRecord) {
        if let Err(e) = self.store.deactivate(self.kind, record.session_id).await {
            tracing::warn!(error = ?e, session_id = %record.session_id, "Failed to deactivate expired session");
        }
        if let Err(e) = self
            .store
            .index_remove(self.kind, record.principal_id, record.session_id)
            .await
        {
            tracing::warn!(error = ?e, session_id = %record.session_id, "Failed to de-index expired session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    // -----------------------------------------------------------------------
    // In-memory collaborators
    // -----------------------------------------------------------------------

    /// In-memory store mirroring the Pg/Redis semantics, including the
    /// hash compare-and-swap.
    #[derive(Default)]
    struct MemStore {
        sessions: Mutex<HashMap<Uuid, SessionRecord>>,
        index: Mutex<HashMap<(PrincipalKind, DbId), HashSet<Uuid>>>,
    }

    impl MemStore {
        fn active_count(&self, kind: PrincipalKind, principal_id: DbId) -> usize {
            self.sessions
                .lock()
                .unwrap()
                .values()
                .filter(|r| {
                    r.principal_kind == kind && r.principal_id == principal_id && r.is_active
                })
                .count()
        }

        fn expire(&self, session_id: Uuid) {
            let mut sessions = self.sessions.lock().unwrap();
            let record = sessions.get_mut(&session_id).expect("session must exist");
            record.expires_at = Utc::now() - chrono::Duration::hours(1);
        }
    }

    #[async_trait]
    impl SessionStore for MemStore {
        async fn put(&self, record: &SessionRecord) -> SessionResult<()> {
            self.sessions
                .lock()
                .unwrap()
                .insert(record.session_id, record.clone());
            Ok(())
        }

        async fn lookup(
            &self,
            kind: PrincipalKind,
            session_id: Uuid,
        ) -> SessionResult<Option<SessionRecord>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .get(&session_id)
                .filter(|r| r.principal_kind == kind && r.is_active)
                .cloned())
        }

        async fn update_refresh_hash(
            &self,
            _kind: PrincipalKind,
            session_id: Uuid,
            expected_hash: &str,
            new_hash: &str,
            now: Timestamp,
        ) -> SessionResult<bool> {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get_mut(&session_id) {
                Some(r) if r.is_active && r.refresh_token_hash == expected_hash => {
                    r.refresh_token_hash = new_hash.to_string();
                    r.last_used_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn update_last_used(
            &self,
            _kind: PrincipalKind,
            session_id: Uuid,
            now: Timestamp,
        ) -> SessionResult<()> {
            if let Some(r) = self.sessions.lock().unwrap().get_mut(&session_id) {
                r.last_used_at = now;
            }
            Ok(())
        }

        async fn deactivate(&self, _kind: PrincipalKind, session_id: Uuid) -> SessionResult<()> {
            if let Some(r) = self.sessions.lock().unwrap().get_mut(&session_id) {
                r.is_active = false;
            }
            Ok(())
        }

        async fn index_add(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
            session_id: Uuid,
        ) -> SessionResult<()> {
            self.index
                .lock()
                .unwrap()
                .entry((kind, principal_id))
                .or_default()
                .insert(session_id);
            Ok(())
        }

        async fn index_remove(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
            session_id: Uuid,
        ) -> SessionResult<()> {
            if let Some(set) = self.index.lock().unwrap().get_mut(&(kind, principal_id)) {
                set.remove(&session_id);
            }
            Ok(())
        }

        async fn index_members(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
        ) -> SessionResult<Vec<Uuid>> {
            Ok(self
                .index
                .lock()
                .unwrap()
                .get(&(kind, principal_id))
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default())
        }
    }

    /// Store whose individual writes can be switched to fail, for exercising
    /// the split between required and best-effort persistence.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemStore,
        fail_put: AtomicBool,
        fail_last_used: AtomicBool,
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn put(&self, record: &SessionRecord) -> SessionResult<()> {
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(SessionError::Persistence("put refused".to_string()));
            }
            self.inner.put(record).await
        }

        async fn lookup(
            &self,
            kind: PrincipalKind,
            session_id: Uuid,
        ) -> SessionResult<Option<SessionRecord>> {
            self.inner.lookup(kind, session_id).await
        }

        async fn update_refresh_hash(
            &self,
            kind: PrincipalKind,
            session_id: Uuid,
            expected_hash: &str,
            new_hash: &str,
            now: Timestamp,
        ) -> SessionResult<bool> {
            self.inner
                .update_refresh_hash(kind, session_id, expected_hash, new_hash, now)
                .await
        }

        async fn update_last_used(
            &self,
            kind: PrincipalKind,
            session_id: Uuid,
            now: Timestamp,
        ) -> SessionResult<()> {
            if self.fail_last_used.load(Ordering::SeqCst) {
                return Err(SessionError::Persistence(
                    "last_used write refused".to_string(),
                ));
            }
            self.inner.update_last_used(kind, session_id, now).await
        }

        async fn deactivate(&self, kind: PrincipalKind, session_id: Uuid) -> SessionResult<()> {
            self.inner.deactivate(kind, session_id).await
        }

        async fn index_add(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
            session_id: Uuid,
        ) -> SessionResult<()> {
            self.inner.index_add(kind, principal_id, session_id).await
        }

        async fn index_remove(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
            session_id: Uuid,
        ) -> SessionResult<()> {
            self.inner
                .index_remove(kind, principal_id, session_id)
                .await
        }

        async fn index_members(
            &self,
            kind: PrincipalKind,
            principal_id: DbId,
        ) -> SessionResult<Vec<Uuid>> {
            self.inner.index_members(kind, principal_id).await
        }
    }

    #[derive(Default)]
    struct MemRegistry {
        revoked: Mutex<HashMap<String, RevokeReason>>,
    }

    impl MemRegistry {
        fn reason_of(&self, token_hash: &str) -> Option<RevokeReason> {
            self.revoked.lock().unwrap().get(token_hash).copied()
        }
    }

    #[async_trait]
    impl RevocationRegistry for MemRegistry {
        async fn revoke(
            &self,
            token_hash: &str,
            reason: RevokeReason,
            _ttl_seconds: u64,
        ) -> SessionResult<()> {
            self.revoked
                .lock()
                .unwrap()
                .insert(token_hash.to_string(), reason);
            Ok(())
        }

        async fn is_revoked(&self, token_hash: &str) -> SessionResult<bool> {
            Ok(self.revoked.lock().unwrap().contains_key(token_hash))
        }
    }

    #[derive(Default)]
    struct MemDirectory {
        gone: Mutex<HashSet<(PrincipalKind, DbId)>>,
    }

    impl MemDirectory {
        fn remove(&self, kind: PrincipalKind, id: DbId) {
            self.gone.lock().unwrap().insert((kind, id));
        }
    }

    #[async_trait]
    impl PrincipalDirectory for MemDirectory {
        async fn find(&self, kind: PrincipalKind, id: DbId) -> SessionResult<Option<Principal>> {
            if self.gone.lock().unwrap().contains(&(kind, id)) {
                return Ok(None);
            }
            Ok(Some(Principal {
                id,
                kind,
                college_id: 1,
            }))
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        store: Arc<MemStore>,
        registry: Arc<MemRegistry>,
        directory: Arc<MemDirectory>,
        staff: SessionManager,
        student: SessionManager,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemStore::default());
        let registry = Arc::new(MemRegistry::default());
        let directory = Arc::new(MemDirectory::default());

        let staff_codec = TokenCodec::new(
            PrincipalKind::Staff,
            "staff-secret-long-enough-for-hmac".to_string(),
            15,
            30,
        );
        let student_codec = TokenCodec::new(
            PrincipalKind::Student,
            "student-secret-also-long-enough".to_string(),
            30,
            30,
        );

        let staff = SessionManager::staff(
            staff_codec,
            store.clone(),
            registry.clone(),
            directory.clone(),
        );
        let student = SessionManager::student(
            student_codec,
            store.clone(),
            registry.clone(),
            directory.clone(),
        );

        Harness {
            store,
            registry,
            directory,
            staff,
            student,
        }
    }

    fn staff_principal(id: DbId) -> Principal {
        Principal {
            id,
            kind: PrincipalKind::Staff,
            college_id: 1,
        }
    }

    fn student_principal(id: DbId) -> Principal {
        Principal {
            id,
            kind: PrincipalKind::Student,
            college_id: 1,
        }
    }

    fn iphone_ctx() -> DeviceContext {
        DeviceContext {
            user_agent: Some(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
                    .to_string(),
            ),
            ip_address: Some("203.0.113.7".to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Property tests
    // -----------------------------------------------------------------------

    /// Property 1: after a successful refresh, the pre-rotation refresh
    /// token is dead.
    #[tokio::test]
    async fn test_rotation_invalidates_old_token() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(1), &DeviceContext::default())
            .await
            .expect("create should succeed");

        let rotated = h
            .staff
            .refresh(tokens.session_id, &tokens.refresh_token)
            .await
            .expect("first refresh should succeed");
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        // The original token's hash no longer matches the session credential.
        let replay = h.staff.refresh(tokens.session_id, &tokens.refresh_token).await;
        assert_matches!(
            replay,
            Err(SessionError::InvalidToken) | Err(SessionError::TokenRevoked)
        );

        // And it is on record as rotated.
        assert_eq!(
            h.registry.reason_of(&hash_token(&tokens.refresh_token)),
            Some(RevokeReason::Rotated)
        );

        // The rotated token still works.
        h.staff
            .refresh(rotated.session_id, &rotated.refresh_token)
            .await
            .expect("rotated token must be usable");
    }

    /// Property 2: a student can never hold two concurrently valid sessions.
    #[tokio::test]
    async fn test_student_single_device_enforcement() {
        let h = harness();
        let principal = student_principal(10);

        let first = h
            .student
            .create_session(&principal, &DeviceContext::default())
            .await
            .expect("first login should succeed");
        let second = h
            .student
            .create_session(&principal, &iphone_ctx())
            .await
            .expect("second login should succeed");

        assert_eq!(h.store.active_count(PrincipalKind::Student, 10), 1);

        // The first session's access token no longer validates.
        assert_matches!(
            h.student.validate(&first.access_token).await,
            Err(SessionError::InvalidSession)
        );
        h.student
            .validate(&second.access_token)
            .await
            .expect("second session must be valid");

        // The superseded refresh credential carries the enforcement reason.
        assert_eq!(
            h.registry.reason_of(&hash_token(&first.refresh_token)),
            Some(RevokeReason::SingleDeviceEnforcement)
        );
    }

    /// Single-device enforcement with zero prior sessions is a no-op.
    #[tokio::test]
    async fn test_student_first_login_no_prior_sessions() {
        let h = harness();
        let tokens = h
            .student
            .create_session(&student_principal(11), &DeviceContext::default())
            .await
            .expect("login with no prior sessions should succeed");
        h.student
            .validate(&tokens.access_token)
            .await
            .expect("session must be valid");
    }

    /// Property 3: staff sessions are independent; revoking one leaves the
    /// others intact.
    #[tokio::test]
    async fn test_staff_multi_device_independent_revocation() {
        let h = harness();
        let principal = staff_principal(2);

        let a = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();
        let b = h.staff.create_session(&principal, &iphone_ctx()).await.unwrap();
        let c = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();

        assert_eq!(h.store.active_count(PrincipalKind::Staff, 2), 3);
        assert_eq!(h.staff.list_sessions(2).await.unwrap().len(), 3);

        h.staff
            .invalidate_session(b.session_id, 2)
            .await
            .expect("invalidate should succeed");

        assert_matches!(
            h.staff.validate(&b.access_token).await,
            Err(SessionError::InvalidSession)
        );
        h.staff.validate(&a.access_token).await.expect("a still valid");
        h.staff.validate(&c.access_token).await.expect("c still valid");
        assert_eq!(h.staff.list_sessions(2).await.unwrap().len(), 2);
    }

    /// Property 4: an expired session is treated as absent everywhere,
    /// regardless of `is_active`.
    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(3), &DeviceContext::default())
            .await
            .unwrap();

        h.store.expire(tokens.session_id);

        assert_matches!(
            h.staff.validate(&tokens.access_token).await,
            Err(SessionError::InvalidSession)
        );
        assert_matches!(
            h.staff.refresh(tokens.session_id, &tokens.refresh_token).await,
            Err(SessionError::InvalidSession)
        );
        // Listing skips (and cleans up) the expired entry.
        assert!(h.staff.list_sessions(3).await.unwrap().is_empty());
    }

    /// Property 5: logout is idempotent.
    #[tokio::test]
    async fn test_idempotent_logout() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(4), &DeviceContext::default())
            .await
            .unwrap();

        h.staff.invalidate_session(tokens.session_id, 4).await.expect("first logout");
        h.staff.invalidate_session(tokens.session_id, 4).await.expect("second logout");
        // Unknown ids are a no-op success too.
        h.staff.invalidate_session(Uuid::new_v4(), 4).await.expect("unknown id");
        assert_eq!(
            h.registry.reason_of(&hash_token(&tokens.refresh_token)),
            Some(RevokeReason::ManualLogout)
        );
    }

    /// Property 6: device classification flows into the session and tolerates
    /// absent user agents.
    #[tokio::test]
    async fn test_device_classification_in_session() {
        let h = harness();

        let mobile = h
            .staff
            .create_session(&staff_principal(5), &iphone_ctx())
            .await
            .unwrap();
        assert_eq!(mobile.device_info.device_type, "Mobile");
        assert_eq!(mobile.device_info.os, "iOS");

        let unknown = h
            .staff
            .create_session(&staff_principal(5), &DeviceContext::default())
            .await
            .unwrap();
        assert_eq!(unknown.device_info.browser, "Unknown");
        assert_eq!(unknown.device_info.os, "Unknown");
        assert_eq!(unknown.device_info.device_type, "Unknown");

        let listed = h.staff.list_sessions(5).await.unwrap();
        assert!(listed.iter().any(|s| s.device_info.os == "iOS"));
    }

    /// Property 7: two concurrent refreshes with the same token -- exactly
    /// one wins, and exactly one valid credential remains.
    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(6), &DeviceContext::default())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            h.staff.refresh(tokens.session_id, &tokens.refresh_token),
            h.staff.refresh(tokens.session_id, &tokens.refresh_token),
        );

        let winners: Vec<_> = [a, b].into_iter().filter_map(Result::ok).collect();
        assert_eq!(winners.len(), 1, "exactly one refresh may win");

        // The surviving credential is the winner's.
        let winner = &winners[0];
        let current_hash = h
            .store
            .lookup(PrincipalKind::Staff, tokens.session_id)
            .await
            .unwrap()
            .unwrap()
            .refresh_token_hash;
        assert_eq!(current_hash, hash_token(&winner.refresh_token));
        h.staff
            .refresh(winner.session_id, &winner.refresh_token)
            .await
            .expect("winner's token must refresh");
    }

    /// Property 8: tokens never cross the staff/student boundary.
    #[tokio::test]
    async fn test_cross_kind_isolation() {
        let h = harness();
        let staff_tokens = h
            .staff
            .create_session(&staff_principal(7), &DeviceContext::default())
            .await
            .unwrap();
        let student_tokens = h
            .student
            .create_session(&student_principal(7), &DeviceContext::default())
            .await
            .unwrap();

        assert_matches!(
            h.staff.validate(&student_tokens.access_token).await,
            Err(SessionError::InvalidToken)
        );
        assert_matches!(
            h.student.validate(&staff_tokens.access_token).await,
            Err(SessionError::InvalidToken)
        );
        assert_matches!(
            h.staff
                .refresh(student_tokens.session_id, &student_tokens.refresh_token)
                .await,
            // The student session id is invisible to the staff manager.
            Err(SessionError::InvalidSession) | Err(SessionError::InvalidToken)
        );
    }

    // -----------------------------------------------------------------------
    // Edge cases beyond the core properties
    // -----------------------------------------------------------------------

    /// An access token cannot stand in for a refresh token.
    #[tokio::test]
    async fn test_access_token_rejected_on_refresh() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(8), &DeviceContext::default())
            .await
            .unwrap();
        assert_matches!(
            h.staff.refresh(tokens.session_id, &tokens.access_token).await,
            Err(SessionError::InvalidToken)
        );
    }

    /// A refresh token bound to one session cannot move another session.
    #[tokio::test]
    async fn test_refresh_session_mismatch() {
        let h = harness();
        let principal = staff_principal(9);
        let a = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();
        let b = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();

        assert_matches!(
            h.staff.refresh(a.session_id, &b.refresh_token).await,
            Err(SessionError::InvalidToken)
        );
        // Neither session was disturbed.
        h.staff.validate(&a.access_token).await.expect("a intact");
        h.staff.validate(&b.access_token).await.expect("b intact");
    }

    /// Refresh fails closed when the principal vanished after login.
    #[tokio::test]
    async fn test_refresh_principal_gone() {
        let h = harness();
        let tokens = h
            .student
            .create_session(&student_principal(20), &DeviceContext::default())
            .await
            .unwrap();

        h.directory.remove(PrincipalKind::Student, 20);

        assert_matches!(
            h.student.refresh(tokens.session_id, &tokens.refresh_token).await,
            Err(SessionError::PrincipalNotFound)
        );
        // No rotation happened: the presented token's hash is still current.
        let record = h
            .store
            .lookup(PrincipalKind::Student, tokens.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.refresh_token_hash, hash_token(&tokens.refresh_token));
    }

    /// A hash already present in the registry is rejected even if it somehow
    /// still matched a session credential.
    #[tokio::test]
    async fn test_revoked_hash_defense_in_depth() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(12), &DeviceContext::default())
            .await
            .unwrap();

        h.registry
            .revoke(&hash_token(&tokens.refresh_token), RevokeReason::LogoutAll, 60)
            .await
            .unwrap();

        assert_matches!(
            h.staff.refresh(tokens.session_id, &tokens.refresh_token).await,
            Err(SessionError::TokenRevoked)
        );
    }

    /// logout-all spares the excluded session and closes the rest.
    #[tokio::test]
    async fn test_invalidate_all_except_current() {
        let h = harness();
        let principal = staff_principal(13);
        let keep = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();
        let drop_a = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();
        let drop_b = h.staff.create_session(&principal, &DeviceContext::default()).await.unwrap();

        h.staff
            .invalidate_all_sessions(13, Some(keep.session_id))
            .await
            .expect("logout-all should succeed");

        h.staff.validate(&keep.access_token).await.expect("kept session valid");
        assert_matches!(
            h.staff.validate(&drop_a.access_token).await,
            Err(SessionError::InvalidSession)
        );
        assert_matches!(
            h.staff.validate(&drop_b.access_token).await,
            Err(SessionError::InvalidSession)
        );
        assert_eq!(
            h.registry.reason_of(&hash_token(&drop_a.refresh_token)),
            Some(RevokeReason::LogoutAll)
        );
    }

    /// Validation updates `last_used_at`.
    #[tokio::test]
    async fn test_validate_touches_activity() {
        let h = harness();
        let tokens = h
            .staff
            .create_session(&staff_principal(14), &DeviceContext::default())
            .await
            .unwrap();
        let before = h
            .store
            .lookup(PrincipalKind::Staff, tokens.session_id)
            .await
            .unwrap()
            .unwrap()
            .last_used_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        h.staff.validate(&tokens.access_token).await.unwrap();

        let after = h
            .store
            .lookup(PrincipalKind::Staff, tokens.session_id)
            .await
            .unwrap()
            .unwrap()
            .last_used_at;
        assert!(after > before, "last_used_at must advance on validation");
    }

    /// Garbage tokens fail cleanly without touching any state.
    #[tokio::test]
    async fn test_garbage_tokens_rejected() {
        let h = harness();
        assert_matches!(
            h.staff.validate("not-a-token").await,
            Err(SessionError::InvalidToken)
        );
        assert_matches!(
            h.staff.refresh(Uuid::new_v4(), "not-a-token").await,
            Err(SessionError::InvalidSession)
        );
    }

    fn flaky_staff_manager() -> (SessionManager, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::default());
        let codec = TokenCodec::new(
            PrincipalKind::Staff,
            "staff-secret-long-enough-for-hmac".to_string(),
            15,
            30,
        );
        let manager = SessionManager::staff(
            codec,
            store.clone(),
            Arc::new(MemRegistry::default()),
            Arc::new(MemDirectory::default()),
        );
        (manager, store)
    }

    /// The activity timestamp is a best-effort write: a store that cannot
    /// record it must not turn a valid access token into a 401.
    #[tokio::test]
    async fn test_validate_survives_activity_write_failure() {
        let (manager, store) = flaky_staff_manager();
        let tokens = manager
            .create_session(&staff_principal(1), &DeviceContext::default())
            .await
            .unwrap();

        store.fail_last_used.store(true, Ordering::SeqCst);

        let info = manager.validate(&tokens.access_token).await.unwrap();
        assert_eq!(info.session_id, tokens.session_id);
        assert_eq!(info.principal_id, 1);
    }

    /// Writing the session record is a required write: if it fails, login
    /// fails and no credentials exist anywhere.
    #[tokio::test]
    async fn test_create_session_fails_closed_on_put_failure() {
        let (manager, store) = flaky_staff_manager();
        store.fail_put.store(true, Ordering::SeqCst);

        let result = manager
            .create_session(&staff_principal(1), &DeviceContext::default())
            .await;
        assert_matches!(result, Err(SessionError::Persistence(_)));

        assert!(store.inner.sessions.lock().unwrap().is_empty());
        assert_eq!(store.inner.active_count(PrincipalKind::Staff, 1), 0);
    }
}
