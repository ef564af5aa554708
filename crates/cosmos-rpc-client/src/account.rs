use cosmrs::proto::cosmos::auth::v1beta1::{BaseAccount, QueryAccountRequest, QueryAccountResponse};
use prost::Message;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::rpc::TendermintRpc;

pub const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";
const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";

/// Signing state of an account, fetched fresh before every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub number: u64,
    pub sequence: u64,
}

impl From<BaseAccount> for Account {
    fn from(account: BaseAccount) -> Self {
        Self {
            number: account.account_number,
            sequence: account.sequence,
        }
    }
}

fn lookup_error(address: &str, reason: impl ToString) -> ClientError {
    ClientError::AccountLookup {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

/// Queries the auth module for the account number and sequence of `address` at the latest height.
pub async fn query_account<R: TendermintRpc + ?Sized>(rpc: &R, address: &str) -> Result<Account> {
    let request = QueryAccountRequest {
        address: address.to_string(),
    };

    let response = rpc
        .abci_query(ACCOUNT_QUERY_PATH, request.encode_to_vec(), 0, false)
        .await
        .map_err(|e| lookup_error(address, e))?;

    if response.code != 0 {
        return Err(lookup_error(
            address,
            format!("query failed with code {}: {}", response.code, response.log),
        ));
    }

    let account = QueryAccountResponse::decode(response.value.as_slice())
        .map_err(|e| lookup_error(address, format!("malformed QueryAccountResponse: {e}")))?
        .account
        .ok_or_else(|| lookup_error(address, "account not found"))?;

    if account.type_url != BASE_ACCOUNT_TYPE_URL {
        return Err(lookup_error(
            address,
            format!("unsupported account type {}", account.type_url),
        ));
    }

    let account: Account = BaseAccount::decode(account.value.as_slice())
        .map_err(|e| lookup_error(address, format!("malformed BaseAccount: {e}")))?
        .into();

    debug!(
        address,
        number = account.number,
        sequence = account.sequence,
        "retrieved account"
    );

    Ok(account)
}
