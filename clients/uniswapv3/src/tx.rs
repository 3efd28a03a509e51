use alloy::network::{Ethereum, ReceiptResponse};
use alloy::providers::PendingTransactionBuilder;
use alloy::rpc::types::TransactionReceipt;
use tracing::debug;

use crate::error::{Result, UniswapV3Error};

/// Waits for the transaction to be mined and rejects receipts whose status is not success.
pub(crate) async fn confirm(
    action: &'static str,
    pending: PendingTransactionBuilder<Ethereum>,
) -> Result<TransactionReceipt> {
    let receipt = pending.get_receipt().await?;
    if !ReceiptResponse::status(&receipt) {
        return Err(UniswapV3Error::Reverted {
            action,
            tx: receipt.transaction_hash,
        });
    }
    debug!(
        action,
        tx = %receipt.transaction_hash,
        block = ?receipt.block_number,
        gas_used = receipt.gas_used,
        "transaction confirmed"
    );
    Ok(receipt)
}
