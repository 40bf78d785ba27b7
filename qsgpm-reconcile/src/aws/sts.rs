//! STS lookups.

use aws_sdk_sts::Client as StsClient;

use super::quicksight_client::sdk_error;
use crate::error::{QsgpmError, QsgpmResult};

/// Account id of the credentials in use. Every QuickSight call is scoped to it.
pub(crate) async fn caller_account_id(client: &StsClient) -> QsgpmResult<String> {
    let output = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| sdk_error("GetCallerIdentity", e))?;
    output
        .account()
        .map(str::to_string)
        .ok_or_else(|| QsgpmError::aws("GetCallerIdentity", "response carried no account id"))
}
