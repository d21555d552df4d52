use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{entities::DispatchResult, error::DispatchError};
use crate::account::database::AccountDatabase;
use crate::notifications::{entities::PushPayload, gateway::NotificationGateway};

/// Resolves user emails to device tokens and hands them to the push transport in one call.
///
/// Holds no state of its own; concurrent calls share nothing but the injected clients.
/// Failures are reported, never retried.
pub struct DispatchService<D, G>
where
    D: AccountDatabase + ?Sized,
    G: NotificationGateway + ?Sized,
{
    account_db: Arc<D>,
    notification_gateway: Arc<G>,
}

impl<D, G> DispatchService<D, G>
where
    D: AccountDatabase + ?Sized,
    G: NotificationGateway + ?Sized,
{
    pub fn new(account_db: Arc<D>, notification_gateway: Arc<G>) -> Self {
        Self {
            account_db,
            notification_gateway,
        }
    }

    #[instrument(skip(self, emails, title, body), fields(recipients = emails.len()))]
    pub async fn send(
        &self,
        emails: Vec<String>,
        title: String,
        body: String,
    ) -> Result<DispatchResult, DispatchError> {
        if emails.is_empty() {
            return Err(DispatchError::InvalidArgument(
                "No target emails provided.".to_string(),
            ));
        }
        let emails = unique_in_order(emails);

        let accounts = self.account_db.find_accounts_by_emails(&emails).await?;
        debug!(matched = accounts.len(), "Resolved recipients");

        let tokens = unique_in_order(
            accounts
                .into_iter()
                .flat_map(|account| account.push_tokens),
        );
        if tokens.is_empty() {
            info!("No device tokens registered for recipients");
            return Ok(DispatchResult::no_recipients());
        }

        let payload = PushPayload::custom(title, body);
        let response = self
            .notification_gateway
            .send_to_tokens(&tokens, &payload)
            .await?;

        info!(tokens = tokens.len(), "Notification dispatched");
        Ok(DispatchResult::delivered(tokens.len(), response))
    }
}

/// Drops repeated values, keeping the first occurrence of each
fn unique_in_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
