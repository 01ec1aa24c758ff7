use alloy::primitives::Address;
use alloy::sol;
use alloy::sol_types::eip712_domain;
pub use alloy::sol_types::Eip712Domain;

sol! {
    #[derive(Debug)]
    struct Authorization {
        bytes32 taskId;
        address worker;
        uint256 expiresAt;
        uint256 nonce;
    }
}

pub use Authorization as AuthorizationStruct;

/// Builds the domain separator binding a signature to this deployment:
/// `(name="Econos Master Agent", version="1", chainId, verifyingContract)`.
/// Domain separation is what makes a signature produced for one chain or
/// one escrow contract fail verification under another.
pub fn authorization_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: "Econos Master Agent",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}
