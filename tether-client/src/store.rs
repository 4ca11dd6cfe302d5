//! Client-side cache of sent invitations, received invitations and partners.
//!
//! Every operation runs the same way: mark itself in flight and clear the
//! previous error, call the remote, then reconcile the cache (or record the
//! error) before dropping out of flight. The lock is never held across an
//! await, so several operations may be in flight at once; patches therefore
//! filter by identity and never assume the entry they target is still there.
//!
//! Accepts are confirmed before they touch the cache: a partner synthesised
//! from an unconfirmed accept would miss its server-assigned fields.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tether_common::deep_link::{InviteUrls, LinkConfig, ShareRequest};
use tether_common::error::TokenError;
use tether_common::non_api_structs::{Invitation, Partner, ReceivedInvite, SentInvite};
use tether_common::token::InvitationToken;
use tether_common::{AcceptByCodeRequest, AcceptRecord, CreateInvitationRequest, SendByEmailRequest};

use crate::error::{ConnectionError, RemoteError};
use crate::remote::Remote;

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Everything a caller can observe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub sent_invitations: Vec<SentInvite>,
    pub received_invitations: Vec<ReceivedInvite>,
    pub connected_partners: Vec<Partner>,
    /// The invitation a deep link resolved to, awaiting accept or decline.
    pub processing_invitation: Option<Invitation>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ConnectionState {
    fn settle_accept(&mut self, record: AcceptRecord, hash: Option<&str>) -> Partner {
        let partner = Partner::from_accept(record);
        let consumed = |id: &str, entry_hash: &str| id == partner.id || hash == Some(entry_hash);
        self.received_invitations
            .retain(|invite| !consumed(&invite.id, &invite.hash));
        if self
            .processing_invitation
            .as_ref()
            .is_some_and(|inv| consumed(&inv.id, inv.hash.as_str()))
        {
            self.processing_invitation = None;
        }
        match self.connected_partners.iter().find(|p| p.id == partner.id) {
            Some(existing) => existing.clone(),
            None => {
                self.connected_partners.push(partner.clone());
                partner
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: ConnectionState,
    in_flight: usize,
}

/// Leaves the in-flight set when dropped, including when the owning future
/// is dropped before it resolves.
pub(crate) struct InFlight {
    inner: Arc<Mutex<Inner>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        inner.state.loading = inner.in_flight > 0;
    }
}

/// Process-wide handle; clones share the same cache.
#[derive(Clone)]
pub struct ConnectionStore {
    remote: Arc<dyn Remote>,
    links: LinkConfig,
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionStore {
    pub fn new(remote: impl Remote + 'static, links: LinkConfig) -> Self {
        Self::with_remote(Arc::new(remote), links)
    }

    pub fn with_remote(remote: Arc<dyn Remote>, links: LinkConfig) -> Self {
        Self {
            remote,
            links,
            inner: Default::default(),
        }
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.inner.lock().state.clone()
    }
    pub fn loading(&self) -> bool {
        self.inner.lock().state.loading
    }
    pub fn error(&self) -> Option<String> {
        self.inner.lock().state.error.clone()
    }
    pub fn links(&self) -> &LinkConfig {
        &self.links
    }

    pub(crate) fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut ConnectionState) -> T) -> T {
        f(&mut self.inner.lock().state)
    }

    /// Enters flight and clears the last error before anything is awaited.
    pub(crate) fn begin(&self, operation: &'static str) -> InFlight {
        debug!(operation, "connection store operation started");
        let mut inner = self.inner.lock();
        inner.in_flight += 1;
        inner.state.loading = true;
        inner.state.error = None;
        InFlight {
            inner: self.inner.clone(),
        }
    }

    /// Records a failure on the `error` field and hands the result back.
    pub(crate) fn settle<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(operation, error = %err, "connection store operation failed");
            self.inner.lock().state.error = Some(err.to_string());
        }
        result
    }

    /// Refreshes all three collections together or not at all.
    pub async fn load_all(&self) -> Result<()> {
        let _in_flight = self.begin("load_all");
        let result = self.try_load_all().await;
        self.settle("load_all", result)
    }

    async fn try_load_all(&self) -> Result<()> {
        let (sent, received, partners) = futures::try_join!(
            self.remote.sent_invites(),
            self.remote.received_invites(),
            self.remote.partners(),
        )?;
        self.with_state(|state| {
            state.sent_invitations = sent.into_iter().map(SentInvite::from).collect();
            state.received_invitations = received.into_iter().map(ReceivedInvite::from).collect();
            state.connected_partners = partners.into_iter().map(Partner::from).collect();
            debug!(
                sent = state.sent_invitations.len(),
                received = state.received_invitations.len(),
                partners = state.connected_partners.len(),
                "connections refreshed"
            );
        });
        Ok(())
    }

    /// Registers an invitation with the server. The sent list is left alone;
    /// follow with [`ConnectionStore::load_all`] for a consistent view.
    pub async fn create_invitation(&self, hash: Option<&str>) -> Result<Invitation> {
        let _in_flight = self.begin("create_invitation");
        let result = self.try_create_invitation(hash).await;
        self.settle("create_invitation", result)
    }

    async fn try_create_invitation(&self, hash: Option<&str>) -> Result<Invitation> {
        let hash = hash.map(InvitationToken::parse).transpose()?;
        let request = CreateInvitationRequest {
            hash: hash.map(String::from),
            ..Default::default()
        };
        let record = self
            .remote
            .create_invitation(request)
            .await
            .map_err(|err| match err {
                RemoteError::Status { status: 409, .. } => ConnectionError::DuplicateHash,
                err => err.into(),
            })?;
        let invitation = Invitation::try_from(record)?;
        info!(hash = %invitation.hash, "invitation created");
        Ok(invitation)
    }

    pub async fn accept_by_hash(&self, hash: &str) -> Result<Partner> {
        let _in_flight = self.begin("accept_by_hash");
        let result = self.try_accept_by_hash(hash).await;
        self.settle("accept_by_hash", result)
    }

    async fn try_accept_by_hash(&self, hash: &str) -> Result<Partner> {
        let token = InvitationToken::parse(hash)?;
        let record = self.remote.accept_by_hash(token.as_str()).await?;
        let partner = self.with_state(|state| state.settle_accept(record, Some(token.as_str())));
        info!(hash = %token, partner = %partner.id, "invitation accepted");
        Ok(partner)
    }

    pub async fn accept_by_code(&self, code: &str) -> Result<Partner> {
        let _in_flight = self.begin("accept_by_code");
        let result = self.try_accept_by_code(code).await;
        self.settle("accept_by_code", result)
    }

    async fn try_accept_by_code(&self, code: &str) -> Result<Partner> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ConnectionError::InvalidInput(String::from(
                "enter the invitation code",
            )));
        }
        let request = AcceptByCodeRequest {
            code: code.to_ascii_uppercase(),
        };
        let record = self.remote.accept_by_code(request).await?;
        let partner = self.with_state(|state| state.settle_accept(record, None));
        info!(partner = %partner.id, "invitation accepted by code");
        Ok(partner)
    }

    /// Accepts whatever [`ConnectionStore::process_deep_link`] last resolved.
    pub async fn accept_processing(&self) -> Result<Partner> {
        let hash = self.with_state(|state| {
            state
                .processing_invitation
                .as_ref()
                .map(|inv| inv.hash.to_string())
        });
        match hash {
            Some(hash) => self.accept_by_hash(&hash).await,
            None => {
                let _in_flight = self.begin("accept_processing");
                self.settle(
                    "accept_processing",
                    Err(ConnectionError::InvalidInput(String::from(
                        "no invitation is being processed",
                    ))),
                )
            }
        }
    }

    /// Withdraws a pending invitation. Only the inviter may, and only before
    /// it was used.
    pub async fn revoke(&self, invitation_id: &str) -> Result<()> {
        let _in_flight = self.begin("revoke");
        let result = self.try_revoke(invitation_id).await;
        self.settle("revoke", result)
    }

    async fn try_revoke(&self, invitation_id: &str) -> Result<()> {
        self.with_state(|state| {
            match state.sent_invitations.iter().find(|s| s.id == invitation_id) {
                Some(sent) => sent.check_revocable(),
                None => Ok(()),
            }
        })?;
        self.remote.revoke(invitation_id).await?;
        self.with_state(|state| state.sent_invitations.retain(|s| s.id != invitation_id));
        info!(invitation = invitation_id, "invitation revoked");
        Ok(())
    }

    /// Asks the server to mail the link. Collections are not touched.
    pub async fn send_by_email(&self, emails: &[String], hash: Option<&str>) -> Result<()> {
        let _in_flight = self.begin("send_by_email");
        let result = self.try_send_by_email(emails, hash).await;
        self.settle("send_by_email", result)
    }

    async fn try_send_by_email(&self, emails: &[String], hash: Option<&str>) -> Result<()> {
        let hash = hash.map(InvitationToken::parse).transpose()?;
        let emails = emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        if emails.is_empty() {
            return Err(ConnectionError::InvalidInput(String::from(
                "add at least one email address",
            )));
        }
        if let Some(bad) = emails.iter().find(|e| !looks_like_email(e)) {
            return Err(ConnectionError::InvalidInput(format!(
                "{bad} is not a valid email address"
            )));
        }
        let count = emails.len();
        self.remote
            .send_by_email(SendByEmailRequest {
                emails,
                hash: hash.map(String::from),
            })
            .await?;
        info!(recipients = count, "invitation emails requested");
        Ok(())
    }

    /// Looks the hash up and exposes it as the processing invitation if it
    /// can still be accepted. Expired and used invitations fail with their
    /// own errors.
    pub async fn process_deep_link(&self, hash: &str) -> Result<Invitation> {
        let _in_flight = self.begin("process_deep_link");
        let result = self.try_process_deep_link(hash).await;
        self.settle("process_deep_link", result)
    }

    /// Same as [`ConnectionStore::process_deep_link`], starting from a URL in
    /// either link shape.
    pub async fn process_deep_link_url(&self, url: &str) -> Result<Invitation> {
        let _in_flight = self.begin("process_deep_link");
        let result = match self.links.from_url(url) {
            Some(hash) => self.try_process_deep_link(&hash).await,
            None => Err(TokenError::NoTokenInUrl.into()),
        };
        self.settle("process_deep_link", result)
    }

    async fn try_process_deep_link(&self, hash: &str) -> Result<Invitation> {
        let token = InvitationToken::parse(hash)?;
        self.with_state(|state| state.processing_invitation = None);
        let record = self.remote.invitation(token.as_str()).await?;
        let invitation = Invitation::try_from(record)?;
        invitation.check_redeemable(Utc::now())?;
        debug!(hash = %token, "deep link resolved");
        self.with_state(|state| state.processing_invitation = Some(invitation.clone()));
        Ok(invitation)
    }

    /// Local dismissal only; the server has no notion of declining.
    pub fn decline_processing(&self) -> Option<Invitation> {
        self.with_state(|state| state.processing_invitation.take())
    }

    /// Drops a partner from the cache without telling the server.
    pub fn remove_partner_locally(&self, partner_user_id: &str) -> bool {
        self.with_state(|state| {
            let before = state.connected_partners.len();
            state
                .connected_partners
                .retain(|p| p.partner_user_id() != Some(partner_user_id));
            before != state.connected_partners.len()
        })
    }

    pub fn invite_urls(&self, hash: &InvitationToken) -> InviteUrls {
        self.links.to_urls(hash)
    }

    /// Builds what the share sheet needs for `hash`.
    pub fn share_request(&self, hash: &str, inviter_name: Option<&str>) -> Result<ShareRequest> {
        let token = InvitationToken::parse(hash)?;
        debug!(hash = %token, "share requested");
        Ok(self.links.share_request(&token, inviter_name))
    }
}

fn looks_like_email(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !candidate.contains(' '),
        None => false,
    }
}
