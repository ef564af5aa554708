use cosmrs::Any;
use cosmrs::proto::cosmos::crypto::secp256k1::PubKey;
use cosmrs::proto::cosmos::tx::signing::v1beta1::SignMode;
use cosmrs::proto::cosmos::tx::v1beta1::mode_info::{Single, Sum};
use cosmrs::proto::cosmos::tx::v1beta1::{
    AuthInfo, Fee, ModeInfo, SignerInfo, SimulateRequest, SimulateResponse, TxBody, TxRaw,
};
use prost::Message;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::rpc::TendermintRpc;
use crate::types::Decimal;

pub const SIMULATE_PATH: &str = "/cosmos.tx.v1beta1.Service/Simulate";
const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// Gas to request for a simulated usage, rounded up and capped at `u64::MAX`.
pub fn adjusted_gas(gas_used: u64, gas_adjustment: &Decimal) -> u64 {
    u64::try_from(gas_adjustment.mul_ceil(gas_used)).unwrap_or(u64::MAX)
}

/// Encodes an unsigned transaction with a placeholder signature so its size matches the signed one.
pub fn simulation_tx_bytes(messages: &[Any], memo: &str, sequence: u64) -> Vec<u8> {
    let body = TxBody {
        messages: messages.to_vec(),
        memo: memo.to_string(),
        ..Default::default()
    };

    let public_key = Any {
        type_url: SECP256K1_PUBKEY_TYPE_URL.to_string(),
        value: PubKey { key: vec![] }.encode_to_vec(),
    };

    let signer_info = SignerInfo {
        public_key: Some(public_key),
        mode_info: Some(ModeInfo {
            sum: Some(Sum::Single(Single {
                mode: SignMode::Direct as i32,
            })),
        }),
        sequence,
    };

    let auth_info = AuthInfo {
        signer_infos: vec![signer_info],
        fee: Some(Fee::default()),
        ..Default::default()
    };

    TxRaw {
        body_bytes: body.encode_to_vec(),
        auth_info_bytes: auth_info.encode_to_vec(),
        signatures: vec![vec![]],
    }
    .encode_to_vec()
}

/// Simulates `messages` on the submission chain and returns the adjusted gas they need.
pub async fn simulate_gas<R: TendermintRpc + ?Sized>(
    rpc: &R,
    messages: &[Any],
    memo: &str,
    sequence: u64,
    gas_adjustment: &Decimal,
) -> Result<u64> {
    let request = SimulateRequest {
        tx_bytes: simulation_tx_bytes(messages, memo, sequence),
        ..Default::default()
    };

    let response = rpc
        .abci_query(SIMULATE_PATH, request.encode_to_vec(), 0, false)
        .await
        .map_err(|e| ClientError::Simulation(e.to_string()))?;

    if response.code != 0 {
        return Err(ClientError::Simulation(format!(
            "code {}: {}",
            response.code, response.log
        )));
    }

    let gas_info = SimulateResponse::decode(response.value.as_slice())
        .map_err(|e| ClientError::Simulation(format!("malformed SimulateResponse: {e}")))?
        .gas_info
        .ok_or_else(|| ClientError::Simulation("response carries no gas info".to_string()))?;

    let gas = adjusted_gas(gas_info.gas_used, gas_adjustment);
    debug!(gas_used = gas_info.gas_used, gas, "simulated transaction");

    Ok(gas)
}

#[cfg(test)]
mod tests {
    use cosmrs::proto::cosmos::base::abci::v1beta1::GasInfo;

    use super::*;
    use crate::mock::MockRpc;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_adjusted_gas_rounds_up() {
        assert_eq!(adjusted_gas(100_000, &decimal("1.5")), 150_000);
        assert_eq!(adjusted_gas(100_001, &decimal("1.5")), 150_002);
        assert_eq!(adjusted_gas(3, &decimal("1.1")), 4);
        assert_eq!(adjusted_gas(0, &decimal("1.5")), 0);
        assert_eq!(adjusted_gas(u64::MAX, &decimal("2")), u64::MAX);
    }

    #[test]
    fn test_exact_products_keep_their_value() {
        assert_eq!(adjusted_gas(100_000, &decimal("1.1")), 110_000);
        assert_eq!(adjusted_gas(100_000, &Decimal::from_f64(1.1).unwrap()), 110_000);
        assert_eq!(adjusted_gas(30, &decimal("1.3")), 39);
        assert_eq!(adjusted_gas(77_777, &decimal("1.3")), adjusted_gas(77_777, &decimal("1.3")));
    }

    #[test]
    fn test_simulation_tx_has_placeholder_signature() {
        let messages = vec![Any {
            type_url: "/neutron.interchainqueries.MsgSubmitQueryResult".to_string(),
            value: vec![1, 2, 3],
        }];
        let raw = TxRaw::decode(simulation_tx_bytes(&messages, "relayer", 9).as_slice()).unwrap();

        assert_eq!(raw.signatures, vec![Vec::<u8>::new()]);

        let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.messages, messages);
        assert_eq!(body.memo, "relayer");

        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        let signer = &auth_info.signer_infos[0];
        assert_eq!(signer.sequence, 9);
        assert_eq!(
            signer.public_key.as_ref().unwrap().type_url,
            SECP256K1_PUBKEY_TYPE_URL
        );
    }

    #[tokio::test]
    async fn test_simulate_gas() {
        let rpc = MockRpc::new().with_simulated_gas(Some(GasInfo {
            gas_wanted: 0,
            gas_used: 80_000,
        }));
        let gas = simulate_gas(&rpc, &[], "", 1, &decimal("1.5")).await.unwrap();

        assert_eq!(gas, 120_000);
    }

    #[tokio::test]
    async fn test_simulation_without_gas_info() {
        let rpc = MockRpc::new().with_simulated_gas(None);

        assert!(matches!(
            simulate_gas(&rpc, &[], "", 1, &decimal("1.5")).await,
            Err(ClientError::Simulation(_))
        ));

        let rpc = MockRpc::new().with_query_failure(SIMULATE_PATH, 4, "signature verification failed");
        match simulate_gas(&rpc, &[], "", 1, &decimal("1.5")).await {
            Err(ClientError::Simulation(reason)) => assert!(reason.contains("signature verification failed")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
