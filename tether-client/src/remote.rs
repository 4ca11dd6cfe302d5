//! The network boundary the store talks through.

use async_trait::async_trait;
use reqwest::Client;
use tether_common::{
    AcceptByCodeRequest, AcceptRecord, CreateInvitationRequest, InvitationRecord,
    PartnerPhoneRecord, PartnerRecord, PhoneUpdateRequest, ReceivedInviteRecord,
    SendByEmailRequest, SentInviteRecord,
};

use crate::client::{self, Session};
use crate::config::ClientConfig;
use crate::error::RemoteError;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait Remote: Send + Sync {
    async fn sent_invites(&self) -> RemoteResult<Vec<SentInviteRecord>>;
    async fn received_invites(&self) -> RemoteResult<Vec<ReceivedInviteRecord>>;
    async fn partners(&self) -> RemoteResult<Vec<PartnerRecord>>;
    async fn create_invitation(&self, request: CreateInvitationRequest) -> RemoteResult<InvitationRecord>;
    async fn invitation(&self, hash: &str) -> RemoteResult<InvitationRecord>;
    async fn accept_by_hash(&self, hash: &str) -> RemoteResult<AcceptRecord>;
    async fn accept_by_code(&self, request: AcceptByCodeRequest) -> RemoteResult<AcceptRecord>;
    async fn revoke(&self, invitation_id: &str) -> RemoteResult<()>;
    async fn send_by_email(&self, request: SendByEmailRequest) -> RemoteResult<()>;
    async fn update_phone(&self, partner_id: &str, request: PhoneUpdateRequest) -> RemoteResult<PartnerPhoneRecord>;
    async fn phone(&self, partner_id: &str) -> RemoteResult<PartnerPhoneRecord>;
}

/// [`Remote`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: Client,
    session: Session,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> RemoteResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(
            client,
            Session::new(config.api_base_url.clone(), config.auth_token.clone()),
        ))
    }

    pub fn with_client(client: Client, session: Session) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn sent_invites(&self) -> RemoteResult<Vec<SentInviteRecord>> {
        client::get_sent_invites(&self.client, &self.session).await
    }
    async fn received_invites(&self) -> RemoteResult<Vec<ReceivedInviteRecord>> {
        client::get_received_invites(&self.client, &self.session).await
    }
    async fn partners(&self) -> RemoteResult<Vec<PartnerRecord>> {
        client::get_partners(&self.client, &self.session).await
    }
    async fn create_invitation(&self, request: CreateInvitationRequest) -> RemoteResult<InvitationRecord> {
        client::create_invitation(&self.client, &self.session, &request).await
    }
    async fn invitation(&self, hash: &str) -> RemoteResult<InvitationRecord> {
        client::get_invitation(&self.client, &self.session, hash).await
    }
    async fn accept_by_hash(&self, hash: &str) -> RemoteResult<AcceptRecord> {
        client::accept_invitation(&self.client, &self.session, hash).await
    }
    async fn accept_by_code(&self, request: AcceptByCodeRequest) -> RemoteResult<AcceptRecord> {
        client::accept_by_code(&self.client, &self.session, &request).await
    }
    async fn revoke(&self, invitation_id: &str) -> RemoteResult<()> {
        client::revoke_invitation(&self.client, &self.session, invitation_id).await
    }
    async fn send_by_email(&self, request: SendByEmailRequest) -> RemoteResult<()> {
        client::send_by_email(&self.client, &self.session, &request).await
    }
    async fn update_phone(&self, partner_id: &str, request: PhoneUpdateRequest) -> RemoteResult<PartnerPhoneRecord> {
        client::update_partner_phone(&self.client, &self.session, partner_id, &request).await
    }
    async fn phone(&self, partner_id: &str) -> RemoteResult<PartnerPhoneRecord> {
        client::get_partner_phone(&self.client, &self.session, partner_id).await
    }
}
