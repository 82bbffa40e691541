use solana_program_entrypoint::ProgramResult;
use solana_program_error::ProgramError;
use solana_pubkey::Pubkey;

use crate::{
    error::EscrowError,
    ledger::AssetLedger,
    state::{Escrow, EscrowId},
};

/// Lifecycle operations over [`Escrow`] records.
///
/// Caller identity and the current time (milliseconds since the Unix epoch)
/// are passed into every call. Preconditions are checked before the ledger
/// is touched, and record fields are only updated once the ledger call has
/// succeeded, so a failed operation moves no funds and leaves the record as
/// it was.
pub struct EscrowManager<L> {
    ledger: L,
}

impl<L: AssetLedger> EscrowManager<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Opens a record holding `initial_funds` taken from `depositor`.
    pub fn create(
        &mut self,
        depositor: &Pubkey,
        owner: Pubkey,
        id: EscrowId,
        unlock_time: i64,
        initial_funds: u64,
        current_time: i64,
    ) -> Result<Escrow, ProgramError> {
        if unlock_time <= current_time {
            return Err(EscrowError::InvalidUnlockTime.into());
        }

        self.ledger.collect(depositor, initial_funds)?;
        Ok(Escrow::new(id, owner, unlock_time, initial_funds))
    }

    /// Tops up the record. Allowed in either phase.
    pub fn deposit(&mut self, escrow: &mut Escrow, amount: u64, caller: &Pubkey) -> ProgramResult {
        ensure_owner(escrow, caller)?;
        let funds = escrow
            .balance()
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;

        self.ledger.collect(caller, amount)?;
        escrow.set_funds(funds);
        Ok(())
    }

    /// Pays the whole balance to the owner and consumes the record.
    pub fn withdraw_full(
        &mut self,
        escrow: Escrow,
        caller: &Pubkey,
        current_time: i64,
    ) -> Result<u64, ProgramError> {
        ensure_owner(&escrow, caller)?;
        if !escrow.is_unlocked(current_time) {
            return Err(EscrowError::NotUnlocked.into());
        }

        self.release_all(escrow)
    }

    /// Pays `amount` to the owner; the record stays live.
    pub fn withdraw_partial(
        &mut self,
        escrow: &mut Escrow,
        amount: u64,
        caller: &Pubkey,
        current_time: i64,
    ) -> Result<u64, ProgramError> {
        ensure_owner(escrow, caller)?;
        if !escrow.is_unlocked(current_time) {
            return Err(EscrowError::NotUnlocked.into());
        }
        let funds = escrow
            .balance()
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFunds)?;

        self.ledger.disburse(escrow.owner(), amount)?;
        escrow.set_funds(funds);
        Ok(amount)
    }

    /// Returns the whole balance to the owner before unlock and consumes the record.
    pub fn cancel(
        &mut self,
        escrow: Escrow,
        caller: &Pubkey,
        current_time: i64,
    ) -> Result<u64, ProgramError> {
        ensure_owner(&escrow, caller)?;
        if escrow.is_unlocked(current_time) {
            return Err(EscrowError::NotUnlocked.into());
        }

        self.release_all(escrow)
    }

    fn release_all(&mut self, escrow: Escrow) -> Result<u64, ProgramError> {
        let amount = escrow.balance();
        self.ledger.disburse(escrow.owner(), amount)?;
        Ok(amount)
    }
}

fn ensure_owner(escrow: &Escrow, caller: &Pubkey) -> ProgramResult {
    if escrow.owner() != caller {
        return Err(EscrowError::NotOwner.into());
    }
    Ok(())
}
