use solana_program_error::ProgramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("Invalid instruction")]
    InvalidInstruction,

    #[error("Unlock time must be in the future")]
    InvalidUnlockTime,

    #[error("Caller is not the escrow owner")]
    NotOwner,

    #[error("Operation not allowed in the current lock phase")]
    NotUnlocked,

    #[error("Insufficient escrowed funds")]
    InsufficientFunds,

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Escrow address does not match its seeds")]
    InvalidEscrowAddress,

    #[error("Escrow already exists")]
    EscrowAlreadyExists,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
