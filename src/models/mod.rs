pub mod deposit;
pub mod identity;
pub mod stage;

pub use deposit::{
    CurationStatus, DepositFile, DepositId, DepositSummary, DepositorName, DepositorRecord,
};
pub use identity::FolderIdentity;
pub use stage::{Direction, Stage, StageTransitionResult};
