use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IEscrow {
        event TaskCreated(bytes32 indexed taskId, address master, address worker, uint256 amount);
        event TaskCompleted(bytes32 indexed taskId, bytes result);
        event TaskRefunded(bytes32 indexed taskId);

        struct TaskRecord {
            address master;
            address worker;
            uint256 amount;
            uint256 deadline;
            uint8 status;
        }

        function tasks(bytes32 taskId) external view returns (TaskRecord memory);
        function depositTask(bytes32 taskId, address worker, uint256 duration) external payable;
        function submitWork(bytes32 taskId, bytes calldata resultHash) external;
        function refundAndSlash(bytes32 taskId) external;
    }

    #[sol(rpc)]
    interface IRegistry {
        function isWorkerActive(address worker) external view returns (bool);
        function slashReputation(address worker, address reporter) external;
    }
}

/// On-chain task status, as returned by `tasks(bytes32).status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChainStatus {
    Created,
    Completed,
    Failed,
    Refunded,
}

impl TryFrom<u8> for OnChainStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OnChainStatus::Created),
            1 => Ok(OnChainStatus::Completed),
            2 => Ok(OnChainStatus::Failed),
            3 => Ok(OnChainStatus::Refunded),
            other => Err(other),
        }
    }
}
