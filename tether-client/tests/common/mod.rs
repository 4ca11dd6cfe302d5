//! Shared fixtures. Not every test file uses every helper.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::{Barrier, Notify};

use tether_client::client;
use tether_client::remote::RemoteResult;
use tether_client::{ClientConfig, ConnectionStore, HttpRemote, Remote, RemoteError};
use tether_common::deep_link::LinkConfig;
use tether_common::lifecycle::InvitationStatus;
use tether_common::{
    AcceptByCodeRequest, AcceptRecord, CreateInvitationRequest, InvitationRecord,
    PartnerPhoneRecord, PartnerRecord, PhoneUpdateRequest, ReceivedInviteRecord,
    SendByEmailRequest, SentInviteRecord, UserRecord,
};

pub const HASH: &str = "ph_deadbeefxyz123";
pub const OTHER_HASH: &str = "ph_0c0ffee9876q";

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        first_name: Some(id.to_uppercase()),
        last_name: None,
        username: Some(id.to_string()),
    }
}

pub fn invitation(id: &str, hash: &str, inviter: &str) -> InvitationRecord {
    let created_at = Utc::now() - Duration::hours(1);
    InvitationRecord {
        id: id.to_string(),
        hash: hash.to_string(),
        code: Some(format!("CODE{}", id.to_uppercase())),
        inviter_user_id: inviter.to_string(),
        inviter_name: Some(inviter.to_uppercase()),
        inviter_email: Some(format!("{inviter}@example.com")),
        invitee_email: None,
        created_at,
        expires_at: created_at + Duration::days(7),
        status: InvitationStatus::Pending,
        used_at: None,
        metadata: Default::default(),
    }
}

pub fn received(id: &str, hash: &str, sender: &str) -> ReceivedInviteRecord {
    ReceivedInviteRecord {
        id: id.to_string(),
        hash: hash.to_string(),
        sender: Some(user(sender)),
        used_at: None,
        created_at: Utc::now(),
    }
}

pub fn sent(id: &str, hash: &str) -> SentInviteRecord {
    SentInviteRecord {
        id: id.to_string(),
        hash: hash.to_string(),
        invitee: None,
        invitee_email: None,
        used_at: None,
        created_at: Utc::now(),
    }
}

pub fn partner(id: &str, user_id: &str, is_inviter: bool) -> PartnerRecord {
    PartnerRecord {
        id: id.to_string(),
        since: Utc::now() - Duration::days(3),
        partner: Some(user(user_id)),
        phone_number: None,
        is_inviter,
    }
}

pub fn status(status: u16, message: &str) -> RemoteError {
    RemoteError::Status {
        status,
        message: Some(message.to_string()),
    }
}

/// In-memory remote. Only one accept per invitation can win, like the real
/// service.
#[derive(Default)]
pub struct FakeState {
    pub sent: Vec<SentInviteRecord>,
    pub received: Vec<ReceivedInviteRecord>,
    pub partners: Vec<PartnerRecord>,
    pub invitations: HashMap<String, InvitationRecord>,
    pub used: HashSet<String>,
    pub revoked: HashSet<String>,
    pub phones: HashMap<String, Option<String>>,
    pub failing: HashSet<&'static str>,
    pub calls: Vec<String>,
    pub created: Vec<CreateInvitationRequest>,
    pub emailed: Vec<SendByEmailRequest>,
    pub phone_updates: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeRemote {
    pub state: Mutex<FakeState>,
    /// Accepts wait here so racing calls are all in flight before any wins.
    pub accept_barrier: Option<Arc<Barrier>>,
    /// `sent_invites` parks here until notified.
    pub hold_sent: Option<Arc<Notify>>,
}

impl FakeRemote {
    pub fn with(f: impl FnOnce(&mut FakeState)) -> Self {
        let remote = FakeRemote::default();
        f(&mut remote.state.lock());
        remote
    }

    fn enter(&self, operation: &'static str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(RemoteError::Status {
                status: 500,
                message: None,
            });
        }
        Ok(())
    }

    fn accept(&self, hash: &str) -> RemoteResult<AcceptRecord> {
        let mut state = self.state.lock();
        let invitation = state
            .invitations
            .get(hash)
            .cloned()
            .ok_or_else(|| status(404, "invitation not found"))?;
        if state.revoked.contains(&invitation.id) || !state.used.insert(hash.to_string()) {
            return Err(status(409, "this invitation is no longer valid"));
        }
        let used_at = Utc::now();
        if let Some(row) = state.invitations.get_mut(hash) {
            row.used_at = Some(used_at);
            row.status = InvitationStatus::Accepted;
        }
        Ok(AcceptRecord {
            id: invitation.id,
            used_at,
            sender: Some(user(&invitation.inviter_user_id)),
        })
    }
}

pub fn store(remote: FakeRemote) -> (ConnectionStore, Arc<FakeRemote>) {
    let remote = Arc::new(remote);
    let store = ConnectionStore::with_remote(remote.clone(), LinkConfig::default());
    (store, remote)
}

#[async_trait]
impl Remote for FakeRemote {
    async fn sent_invites(&self) -> RemoteResult<Vec<SentInviteRecord>> {
        if let Some(hold) = &self.hold_sent {
            hold.notified().await;
        }
        self.enter("sent_invites")?;
        Ok(self.state.lock().sent.clone())
    }
    async fn received_invites(&self) -> RemoteResult<Vec<ReceivedInviteRecord>> {
        self.enter("received_invites")?;
        Ok(self.state.lock().received.clone())
    }
    async fn partners(&self) -> RemoteResult<Vec<PartnerRecord>> {
        self.enter("partners")?;
        Ok(self.state.lock().partners.clone())
    }
    async fn create_invitation(&self, request: CreateInvitationRequest) -> RemoteResult<InvitationRecord> {
        self.enter("create_invitation")?;
        let mut state = self.state.lock();
        let hash = request.hash.clone().unwrap_or_else(|| String::from(OTHER_HASH));
        if state.invitations.contains_key(&hash) {
            return Err(status(409, "invitation hash already in use"));
        }
        let record = invitation(&format!("inv-{}", state.invitations.len() + 1), &hash, "me");
        state.invitations.insert(hash, record.clone());
        state.created.push(request);
        Ok(record)
    }
    async fn invitation(&self, hash: &str) -> RemoteResult<InvitationRecord> {
        self.enter("invitation")?;
        self.state
            .lock()
            .invitations
            .get(hash)
            .cloned()
            .ok_or_else(|| status(404, "invitation not found"))
    }
    async fn accept_by_hash(&self, hash: &str) -> RemoteResult<AcceptRecord> {
        self.enter("accept_by_hash")?;
        if let Some(barrier) = &self.accept_barrier {
            barrier.wait().await;
        }
        self.accept(hash)
    }
    async fn accept_by_code(&self, request: AcceptByCodeRequest) -> RemoteResult<AcceptRecord> {
        self.enter("accept_by_code")?;
        let hash = self
            .state
            .lock()
            .invitations
            .values()
            .find(|inv| inv.code.as_deref() == Some(request.code.as_str()))
            .map(|inv| inv.hash.clone())
            .ok_or_else(|| status(404, "invitation not found"))?;
        self.accept(&hash)
    }
    async fn revoke(&self, invitation_id: &str) -> RemoteResult<()> {
        self.enter("revoke")?;
        let mut state = self.state.lock();
        let hash = state
            .invitations
            .values()
            .find(|inv| inv.id == invitation_id)
            .map(|inv| inv.hash.clone());
        match hash {
            Some(hash) if state.used.contains(&hash) => Err(status(409, "this invitation is no longer valid")),
            Some(_) => {
                state.revoked.insert(invitation_id.to_string());
                Ok(())
            }
            None => Err(status(404, "invitation not found")),
        }
    }
    async fn send_by_email(&self, request: SendByEmailRequest) -> RemoteResult<()> {
        self.enter("send_by_email")?;
        self.state.lock().emailed.push(request);
        Ok(())
    }
    async fn update_phone(&self, partner_id: &str, request: PhoneUpdateRequest) -> RemoteResult<PartnerPhoneRecord> {
        self.enter("update_phone")?;
        let mut state = self.state.lock();
        state
            .phone_updates
            .push((partner_id.to_string(), request.phone_number.clone()));
        let stored = Some(request.phone_number).filter(|n| !n.is_empty());
        state.phones.insert(partner_id.to_string(), stored.clone());
        Ok(PartnerPhoneRecord {
            id: partner_id.to_string(),
            phone_number: stored,
        })
    }
    async fn phone(&self, partner_id: &str) -> RemoteResult<PartnerPhoneRecord> {
        self.enter("phone")?;
        let state = self.state.lock();
        let phone_number = state
            .phones
            .get(partner_id)
            .cloned()
            .ok_or_else(|| status(404, "partner not found"))?;
        Ok(PartnerPhoneRecord {
            id: partner_id.to_string(),
            phone_number,
        })
    }
}

/// Boots the stub service on an ephemeral port and returns its base URL.
pub fn spawn_server() -> anyhow::Result<String> {
    let state = tether_server::State::temporary(Default::default())?;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = tether_server::serve(listener, state).await {
            eprintln!("stub server stopped: {err}");
        }
    });
    Ok(format!("http://{addr}"))
}

/// Registers `user` with the server and returns a store acting as them.
pub async fn sign_in(base_url: &str, user: &UserRecord) -> anyhow::Result<ConnectionStore> {
    let config = ClientConfig {
        api_base_url: base_url.to_string(),
        auth_token: Some(user.id.clone()),
        ..Default::default()
    };
    let remote = HttpRemote::new(&config)?;
    client::register_user(&reqwest::Client::new(), remote.session(), user).await?;
    Ok(ConnectionStore::new(remote, config.links))
}
