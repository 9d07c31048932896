//! Registry entries for the swap operations.

use super::SwapCoordinator;
use crate::registry::{ArgKind, Args, OperationRegistryBuilder};
use crate::{HandlerError, TxContext};
use serde::{Deserialize, Serialize};
use swapledger_types::{Address, AssetAmount, SwapAssets, SwapKind, TxId};

/// JSON argument of `multiSwapBegin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSwapAssets {
    pub assets: Vec<AssetAmount>,
}

fn require_sender(sender: Option<&Address>) -> Result<&Address, HandlerError> {
    sender.ok_or_else(|| HandlerError::failed("sender required"))
}

fn swap_id(args: &Args, index: usize) -> Result<TxId, HandlerError> {
    Ok(TxId(args.hash(index)?))
}

fn get_swap(
    coordinator: &SwapCoordinator,
    ctx: &mut TxContext<'_>,
    args: &Args,
) -> Result<Option<Vec<u8>>, HandlerError> {
    let swap = coordinator.get(ctx.state(), &swap_id(args, 0)?)?;
    let json = serde_json::to_vec(&swap).map_err(|e| HandlerError::failed(e.to_string()))?;
    Ok(Some(json))
}

/// Register begin/cancel/get for one swap variant.
pub(crate) fn swap_operations(
    builder: OperationRegistryBuilder,
    coordinator: SwapCoordinator,
) -> OperationRegistryBuilder {
    let (begin, cancel, get) = match coordinator.kind() {
        SwapKind::Single => ("swapBegin", "swapCancel", "swapGet"),
        SwapKind::Multi => ("multiSwapBegin", "multiSwapCancel", "multiSwapGet"),
    };

    let begin_args: &[ArgKind] = match coordinator.kind() {
        // token, contract to, amount, hash
        SwapKind::Single => &[ArgKind::String, ArgKind::String, ArgKind::Amount, ArgKind::Hex],
        // token, assets, contract to, hash
        SwapKind::Multi => &[ArgKind::String, ArgKind::Json, ArgKind::String, ArgKind::Hex],
    };

    let opener = coordinator.clone();
    let canceller = coordinator.clone();
    let getter = coordinator;

    builder
        .tx(begin, begin_args, move |ctx, sender, args| {
            let owner = *require_sender(sender)?;
            let token = args.string(0)?;
            let (assets, to) = match opener.kind() {
                SwapKind::Single => (SwapAssets::Single(args.amount(2)?), args.string(1)?),
                SwapKind::Multi => {
                    let list: MultiSwapAssets = args.json(1)?;
                    (SwapAssets::Multi(list.assets), args.string(2)?)
                }
            };
            let id = opener.open(ctx, &owner, token, assets, to, args.hash(3)?)?;
            Ok(Some(id.to_hex().into_bytes()))
        })
        .tx(cancel, &[ArgKind::Hex], move |ctx, sender, args| {
            let sender = *require_sender(sender)?;
            canceller.cancel(ctx, &sender, &swap_id(args, 0)?)?;
            Ok(None)
        })
        .query(get, &[ArgKind::Hex], move |ctx, _, args| {
            get_swap(&getter, ctx, args)
        })
}
