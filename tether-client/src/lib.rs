pub mod config;
pub mod error;
pub mod partner_sync;
pub mod remote;
pub mod store;

pub use config::{ClientConfig, ConfigError};
pub use error::{ConnectionError, RemoteError};
pub use remote::{HttpRemote, Remote};
pub use store::{ConnectionState, ConnectionStore};

/// One function per endpoint of the invitation service.
pub mod client {
    use reqwest::{Client, RequestBuilder, Response};
    use serde::de::DeserializeOwned;
    use tether_common::{
        AcceptByCodeRequest, AcceptRecord, CreateInvitationRequest, ErrorBody, InvitationRecord,
        PartnerPhoneRecord, PartnerRecord, PhoneUpdateRequest, ReceivedInviteRecord,
        SendByEmailRequest, SentInviteRecord, UserRecord,
    };

    use crate::error::RemoteError;

    pub type Result<T> = std::result::Result<T, RemoteError>;

    /// Where requests go and who they are made as.
    #[derive(Clone, Debug, Default)]
    pub struct Session {
        pub base_url: String,
        pub auth_token: Option<String>,
    }

    impl Session {
        pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
            Self {
                base_url: base_url.into(),
                auth_token,
            }
        }
        fn url(&self, path: &str) -> String {
            self.base_url.trim_end_matches('/').to_string() + path
        }
        fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
            match &self.auth_token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        }
    }

    async fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.json::<ErrorBody>().await.ok().and_then(|body| body.message);
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        Ok(expect_success(response).await?.json::<T>().await?)
    }

    pub async fn register_user(client: &Client, session: &Session, user: &UserRecord) -> Result<UserRecord> {
        expect_json(session.authorize(client.post(session.url("/users")))
            .json(user)
            .send()
            .await?)
        .await
    }
    pub async fn get_sent_invites(client: &Client, session: &Session) -> Result<Vec<SentInviteRecord>> {
        expect_json(session.authorize(client.get(session.url("/invites/sent")))
            .send()
            .await?)
        .await
    }
    pub async fn get_received_invites(client: &Client, session: &Session) -> Result<Vec<ReceivedInviteRecord>> {
        expect_json(session.authorize(client.get(session.url("/invites/received")))
            .send()
            .await?)
        .await
    }
    pub async fn get_partners(client: &Client, session: &Session) -> Result<Vec<PartnerRecord>> {
        expect_json(session.authorize(client.get(session.url("/partners")))
            .send()
            .await?)
        .await
    }
    pub async fn create_invitation(client: &Client, session: &Session, request: &CreateInvitationRequest) -> Result<InvitationRecord> {
        expect_json(session.authorize(client.post(session.url("/invites/invitations")))
            .json(request)
            .send()
            .await?)
        .await
    }
    pub async fn get_invitation(client: &Client, session: &Session, hash: &str) -> Result<InvitationRecord> {
        expect_json(session.authorize(client.get(session.url(&format!("/invites/invitations/{hash}"))))
            .send()
            .await?)
        .await
    }
    pub async fn accept_invitation(client: &Client, session: &Session, hash: &str) -> Result<AcceptRecord> {
        expect_json(session.authorize(client.post(session.url(&format!("/invites/invitations/{hash}/accept"))))
            .send()
            .await?)
        .await
    }
    pub async fn accept_by_code(client: &Client, session: &Session, request: &AcceptByCodeRequest) -> Result<AcceptRecord> {
        expect_json(session.authorize(client.post(session.url("/invites/accept-by-code")))
            .json(request)
            .send()
            .await?)
        .await
    }
    pub async fn revoke_invitation(client: &Client, session: &Session, invitation_id: &str) -> Result<()> {
        expect_success(session.authorize(client.post(session.url(&format!("/invites/invitations/{invitation_id}/revoke"))))
            .send()
            .await?)
        .await?;
        Ok(())
    }
    pub async fn send_by_email(client: &Client, session: &Session, request: &SendByEmailRequest) -> Result<()> {
        expect_success(session.authorize(client.post(session.url("/invites/send-by-email")))
            .json(request)
            .send()
            .await?)
        .await?;
        Ok(())
    }
    pub async fn update_partner_phone(client: &Client, session: &Session, partner_id: &str, request: &PhoneUpdateRequest) -> Result<PartnerPhoneRecord> {
        expect_json(session.authorize(client.patch(session.url(&format!("/partners/{partner_id}/phone"))))
            .json(request)
            .send()
            .await?)
        .await
    }
    pub async fn get_partner_phone(client: &Client, session: &Session, partner_id: &str) -> Result<PartnerPhoneRecord> {
        expect_json(session.authorize(client.get(session.url(&format!("/partners/{partner_id}/phone"))))
            .send()
            .await?)
        .await
    }
}
